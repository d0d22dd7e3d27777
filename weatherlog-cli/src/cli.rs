use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use weatherlog_core::{
    CityReport, Config, FetchDate, FileConfig, IngestionRunner, ReadingStore, WeatherProvider,
    past_days,
    provider::provider_from_config,
    service::{self, AppState},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherlog", version, about = "Weather observation logger")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch readings for the configured cities, store them, then print the report.
    Ingest {
        /// Backfill this many calendar days ending today instead of fetching current conditions.
        #[arg(long)]
        days: Option<u32>,

        /// Restrict to these cities (repeatable); defaults to the configured list.
        #[arg(long = "city")]
        cities: Vec<String>,
    },

    /// Print min/max, averages and comfortable-day counts from stored readings.
    Report {
        #[arg(long = "city")]
        cities: Vec<String>,
    },

    /// Run the HTTP query API.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: String,
    },

    /// Fetch and print one city's current reading without storing it.
    Show {
        /// City name as understood by the weather API.
        city: String,
    },

    /// Interactively edit the configured city list.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Ingest { days, cities } => {
                let config = Config::load()?;
                let store = ReadingStore::open(&config.database_path);
                store.ensure_schema()?;

                let cities = pick_cities(cities, &config);
                let dates = match days {
                    Some(n) => past_days(chrono::Utc::now().date_naive(), n),
                    None => vec![FetchDate::Now],
                };

                let provider = provider_from_config(&config);
                let summary = IngestionRunner::new(&provider, &store).run(&cities, &dates).await;

                if summary.failures() > 0 {
                    tracing::warn!(
                        failures = summary.failures(),
                        fetch_failures = summary.fetch_failures,
                        storage_failures = summary.storage_failures,
                        "some readings were not stored"
                    );
                }
                println!(
                    "Ingestion finished: {} of {} readings stored, {} failed.\n",
                    summary.inserted,
                    summary.attempted,
                    summary.failures()
                );
                print_reports(&store, &cities)?;
            }
            Command::Report { cities } => {
                let config = Config::load()?;
                let store = ReadingStore::open(&config.database_path);
                store.ensure_schema()?;

                print_reports(&store, &pick_cities(cities, &config))?;
            }
            Command::Serve { bind } => {
                let config = Config::load()?;
                let store = ReadingStore::open(&config.database_path);
                store.ensure_schema()?;

                let provider = provider_from_config(&config).pressure_optional();
                let state = AppState { provider: Arc::new(provider), store };

                let listener = tokio::net::TcpListener::bind(&bind)
                    .await
                    .with_context(|| format!("Failed to bind {bind}"))?;
                service::serve(listener, state).await.context("Query API stopped")?;
            }
            Command::Show { city } => {
                let config = Config::load()?;
                let provider = provider_from_config(&config);
                let reading = provider.fetch(&city, FetchDate::Now).await?;

                let pressure = reading
                    .pressure_hpa
                    .map_or_else(|| "n/a".to_string(), |p| format!("{p:.0} hPa"));
                println!(
                    "{}: {:.2} °C, {:.0} % humidity, {}",
                    reading.city, reading.temperature_c, reading.humidity_pct, pressure
                );
            }
            Command::Configure => configure()?,
        }

        Ok(())
    }
}

fn pick_cities(requested: Vec<String>, config: &Config) -> Vec<String> {
    if requested.is_empty() { config.cities.clone() } else { requested }
}

fn print_reports(store: &ReadingStore, cities: &[String]) -> anyhow::Result<()> {
    for city in cities {
        let report = CityReport::build(store, city)
            .with_context(|| format!("Failed to build report for {city}"))?;
        if !report.has_data() {
            tracing::warn!(city = %city, "no stored readings for city");
        }
        println!("{report}\n");
    }
    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut file = FileConfig::load()?;
    let current = file
        .cities
        .clone()
        .unwrap_or_else(|| {
            weatherlog_core::config::DEFAULT_CITIES.iter().map(|c| c.to_string()).collect()
        })
        .join(", ");

    let answer = inquire::Text::new("Cities (comma separated):")
        .with_default(&current)
        .prompt()
        .context("Failed to read city list")?;

    let cities: Vec<String> = answer
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    anyhow::ensure!(!cities.is_empty(), "City list must not be empty");

    file.cities = Some(cities);
    let path = file.save()?;
    tracing::info!(path = %path.display(), "configuration saved");
    println!("Saved configuration to {}", path.display());

    Ok(())
}
