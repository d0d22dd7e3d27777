use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::error::ConfigError;

pub const API_KEY_VAR: &str = "API_KEY";
pub const DB_CONNECTION_VAR: &str = "DB_CONNECTION_STRING";

pub const DEFAULT_API_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_CITIES: &[&str] = &["London", "New York", "Tokyo", "Sydney", "Berlin"];

/// Optional settings stored on disk.
///
/// Example TOML:
/// cities = ["London", "Berlin"]
/// api_base_url = "https://api.openweathermap.org/data/2.5"
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cities: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

impl FileConfig {
    /// Load from the platform config dir, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_owned(), e))?;

        toml::from_str(&contents).map_err(|e| ConfigError::FileParse(path.to_owned(), e))
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write the file, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::FileWrite(parent.to_owned(), e))?;
        }

        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml).map_err(|e| ConfigError::FileWrite(path.to_owned(), e))
    }

    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let dirs =
            ProjectDirs::from("dev", "weatherlog", "weatherlog").ok_or(ConfigError::NoConfigDir)?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Fully resolved runtime configuration.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub database_path: PathBuf,
    pub api_base_url: String,
    pub cities: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("database_path", &self.database_path)
            .field("api_base_url", &self.api_base_url)
            .field("cities", &self.cities)
            .finish()
    }
}

impl Config {
    /// Resolve from the process environment and the on-disk config file.
    pub fn load() -> Result<Self, ConfigError> {
        let file = FileConfig::load()?;
        Self::from_lookup(|name| std::env::var(name).ok(), file)
    }

    pub fn from_lookup<F>(lookup: F, file: FileConfig) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(&lookup, API_KEY_VAR)?;
        let database_path = parse_connection_string(&required(&lookup, DB_CONNECTION_VAR)?)?;

        let cities = match file.cities {
            Some(cities) => {
                let cities: Vec<String> = cities
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                if cities.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        name: "cities",
                        reason: "city list is empty".to_string(),
                    });
                }
                cities
            }
            None => DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
        };

        let api_base_url = file
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self { api_key, database_path, api_base_url, cities })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

/// Accepts a plain SQLite path, optionally prefixed with `sqlite://`.
fn parse_connection_string(raw: &str) -> Result<PathBuf, ConfigError> {
    let path = raw.strip_prefix("sqlite://").unwrap_or(raw);

    if path.is_empty() || path == ":memory:" {
        return Err(ConfigError::InvalidValue {
            name: DB_CONNECTION_VAR,
            reason: format!("'{raw}' is not a database file path"),
        });
    }

    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = Config::from_lookup(env(&[(DB_CONNECTION_VAR, "w.db")]), FileConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("API_KEY")));
    }

    #[test]
    fn missing_connection_string_is_fatal() {
        let err = Config::from_lookup(env(&[(API_KEY_VAR, "KEY")]), FileConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("DB_CONNECTION_STRING")));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = Config::from_lookup(
            env(&[(API_KEY_VAR, "   "), (DB_CONNECTION_VAR, "w.db")]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("API_KEY")));
    }

    #[test]
    fn defaults_apply_without_config_file() {
        let cfg = Config::from_lookup(
            env(&[(API_KEY_VAR, "KEY"), (DB_CONNECTION_VAR, "sqlite:///tmp/weather.db")]),
            FileConfig::default(),
        )
        .expect("config should resolve");

        assert_eq!(cfg.api_key, "KEY");
        assert_eq!(cfg.database_path, PathBuf::from("/tmp/weather.db"));
        assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(cfg.cities, DEFAULT_CITIES);
    }

    #[test]
    fn in_memory_database_is_rejected() {
        let err = Config::from_lookup(
            env(&[(API_KEY_VAR, "KEY"), (DB_CONNECTION_VAR, ":memory:")]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "DB_CONNECTION_STRING", .. }));
    }

    #[test]
    fn file_overrides_cities_and_base_url() {
        let file = FileConfig {
            cities: Some(vec![" Oslo ".into(), "".into(), "Lima".into()]),
            api_base_url: Some("http://localhost:9999/".into()),
        };
        let cfg =
            Config::from_lookup(env(&[(API_KEY_VAR, "KEY"), (DB_CONNECTION_VAR, "w.db")]), file)
                .expect("config should resolve");

        assert_eq!(cfg.cities, vec!["Oslo", "Lima"]);
        assert_eq!(cfg.api_base_url, "http://localhost:9999");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let cfg = Config::from_lookup(
            env(&[(API_KEY_VAR, "SECRET"), (DB_CONNECTION_VAR, "w.db")]),
            FileConfig::default(),
        )
        .unwrap();
        assert!(!format!("{cfg:?}").contains("SECRET"));
    }

    #[test]
    fn file_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert_eq!(FileConfig::load_from(&path).unwrap(), FileConfig::default());

        let file = FileConfig { cities: Some(vec!["Tokyo".into()]), api_base_url: None };
        file.save_to(&path).unwrap();

        assert_eq!(FileConfig::load_from(&path).unwrap(), file);
    }
}
