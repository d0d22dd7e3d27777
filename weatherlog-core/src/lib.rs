//! Core library for the `weatherlog` tool.
//!
//! This crate defines:
//! - Configuration loading (environment plus optional config file)
//! - The upstream weather client and its normalization to Celsius readings
//! - The append-only SQLite reading store and its aggregate queries
//! - The sequential ingestion runner, batch reports and the HTTP query API
//!
//! It is used by `weatherlog-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod provider;
pub mod report;
pub mod service;
pub mod store;

pub use config::{Config, FileConfig};
pub use error::{ConfigError, FetchError, StorageError};
pub use ingest::{IngestionRunner, RunSummary, past_days};
pub use model::{Averages, CityStats, FetchDate, GlobalStats, MinMax, ObservationDate, Reading};
pub use provider::{OpenWeatherClient, WeatherProvider};
pub use report::CityReport;
pub use store::ReadingStore;
