use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single upstream weather request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to weather API failed for '{city}'")]
    Network {
        city: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Weather API returned status {status} for '{city}': {body}")]
    Status {
        city: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Malformed weather API payload for '{city}': {reason}")]
    MalformedPayload { city: String, reason: String },
}

impl FetchError {
    /// Upstream HTTP status, if the request got that far.
    pub fn status_code(&self) -> Option<reqwest::StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn city(&self) -> &str {
        match self {
            FetchError::Network { city, .. }
            | FetchError::Status { city, .. }
            | FetchError::MalformedPayload { city, .. } => city,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open database '{0}'")]
    Open(PathBuf, #[source] rusqlite::Error),

    #[error("Database operation '{operation}' failed")]
    Sql {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Refusing to store invalid reading: {0}")]
    InvalidReading(String),

    #[error("Database task did not complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl StorageError {
    pub(crate) fn sql(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| StorageError::Sql { operation, source }
    }
}

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Could not determine platform config directory")]
    NoConfigDir,

    #[error("Failed to read config file: {0}")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    FileParse(PathBuf, #[source] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    FileWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to serialize configuration to TOML")]
    Serialize(#[from] toml::ser::Error),
}
