use rusqlite::{Connection, params};
use std::path::PathBuf;

use crate::{
    error::StorageError,
    model::{Averages, CityStats, GlobalStats, MinMax, Reading},
};

pub const TABLE: &str = "weather_data";

/// Comfortable day: temperature in [15, 25] °C inclusive and humidity below 70 %.
pub const COMFORT_MIN_TEMP_C: f64 = 15.0;
pub const COMFORT_MAX_TEMP_C: f64 = 25.0;
pub const COMFORT_MAX_HUMIDITY_PCT: f64 = 70.0;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS weather_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        city TEXT NOT NULL CHECK (city <> ''),
        date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        temperature REAL NOT NULL,
        humidity REAL NOT NULL CHECK (humidity >= 0 AND humidity <= 100),
        pressure REAL
    );

    CREATE INDEX IF NOT EXISTS idx_weather_data_city ON weather_data(city);";

/// Append-only SQLite log of readings.
///
/// Holds only the database location. Every operation opens its own connection, which is
/// closed when it goes out of scope, on success and on error alike.
#[derive(Debug, Clone)]
pub struct ReadingStore {
    path: PathBuf,
}

impl ReadingStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn connect(&self) -> Result<Connection, StorageError> {
        Connection::open(&self.path).map_err(|e| StorageError::Open(self.path.clone(), e))
    }

    /// Create the readings table if it is absent. Returns `true` if it was created.
    pub fn ensure_schema(&self) -> Result<bool, StorageError> {
        let conn = self.connect()?;

        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![TABLE],
                |row| row.get::<_, i64>(0),
            )
            .map_err(StorageError::sql("check schema"))?
            > 0;

        if exists {
            tracing::debug!(path = %self.path.display(), "schema already present");
            return Ok(false);
        }

        conn.execute_batch(SCHEMA).map_err(StorageError::sql("create schema"))?;
        tracing::info!(path = %self.path.display(), table = TABLE, "created table");
        Ok(true)
    }

    /// Append one reading. Never updates an existing row. Returns the new row id.
    pub fn insert(&self, reading: &Reading) -> Result<i64, StorageError> {
        validate(reading)?;

        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(StorageError::sql("begin insert"))?;

        tx.execute(
            "INSERT INTO weather_data (city, date, temperature, humidity, pressure)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                reading.city,
                reading.date.to_sql_text(),
                reading.temperature_c,
                reading.humidity_pct,
                reading.pressure_hpa,
            ],
        )
        .map_err(StorageError::sql("insert reading"))?;

        let id = tx.last_insert_rowid();
        tx.commit().map_err(StorageError::sql("commit insert"))?;

        tracing::debug!(city = %reading.city, date = %reading.date, id, "reading stored");
        Ok(id)
    }

    /// `None` when the city has no rows.
    pub fn min_max(&self, city: &str) -> Result<Option<MinMax>, StorageError> {
        let conn = self.connect()?;

        let row = conn
            .query_row(
                "SELECT MIN(temperature), MAX(temperature),
                        MIN(humidity), MAX(humidity),
                        MIN(pressure), MAX(pressure)
                 FROM weather_data WHERE city = ?1",
                params![city],
                |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                        row.get::<_, Option<f64>>(5)?,
                    ))
                },
            )
            .map_err(StorageError::sql("min/max"))?;

        Ok(match row {
            (Some(min_temp), Some(max_temp), Some(min_humidity), Some(max_humidity), min_p, max_p) => {
                Some(MinMax {
                    min_temp,
                    max_temp,
                    min_humidity,
                    max_humidity,
                    min_pressure: min_p,
                    max_pressure: max_p,
                })
            }
            _ => None,
        })
    }

    /// `None` when the city has no rows.
    pub fn average(&self, city: &str) -> Result<Option<Averages>, StorageError> {
        let conn = self.connect()?;

        let row = conn
            .query_row(
                "SELECT AVG(temperature), AVG(humidity), AVG(pressure)
                 FROM weather_data WHERE city = ?1",
                params![city],
                |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                    ))
                },
            )
            .map_err(StorageError::sql("average"))?;

        Ok(match row {
            (Some(avg_temp), Some(avg_humidity), avg_pressure) => {
                Some(Averages { avg_temp, avg_humidity, avg_pressure })
            }
            _ => None,
        })
    }

    pub fn comfortable_day_count(&self, city: &str) -> Result<u64, StorageError> {
        let conn = self.connect()?;

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM weather_data
                 WHERE city = ?1
                   AND temperature >= ?2 AND temperature <= ?3
                   AND humidity < ?4",
                params![city, COMFORT_MIN_TEMP_C, COMFORT_MAX_TEMP_C, COMFORT_MAX_HUMIDITY_PCT],
                |row| row.get(0),
            )
            .map_err(StorageError::sql("comfortable day count"))?;

        Ok(count.max(0) as u64)
    }

    /// Temperature aggregates over every stored row, `None` when the table is empty.
    pub fn global_stats(&self) -> Result<Option<GlobalStats>, StorageError> {
        let conn = self.connect()?;

        let row = conn
            .query_row(
                "SELECT MIN(temperature), MAX(temperature), AVG(temperature) FROM weather_data",
                [],
                |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                    ))
                },
            )
            .map_err(StorageError::sql("global stats"))?;

        Ok(match row {
            (Some(min_temp), Some(max_temp), Some(avg_temp)) => {
                Some(GlobalStats { min_temp, max_temp, avg_temp })
            }
            _ => None,
        })
    }

    /// Temperature and humidity aggregates for one city, `None` when it has no rows.
    pub fn city_stats(&self, city: &str) -> Result<Option<CityStats>, StorageError> {
        let (min_max, average) = match (self.min_max(city)?, self.average(city)?) {
            (Some(mm), Some(avg)) => (mm, avg),
            _ => return Ok(None),
        };

        Ok(Some(CityStats {
            city: city.to_string(),
            min_temp: min_max.min_temp,
            max_temp: min_max.max_temp,
            avg_temp: average.avg_temp,
            min_humidity: min_max.min_humidity,
            max_humidity: min_max.max_humidity,
            avg_humidity: average.avg_humidity,
        }))
    }

    pub fn count(&self, city: &str) -> Result<u64, StorageError> {
        let conn = self.connect()?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM weather_data WHERE city = ?1", params![city], |row| {
                row.get(0)
            })
            .map_err(StorageError::sql("count"))?;

        Ok(count.max(0) as u64)
    }
}

fn validate(reading: &Reading) -> Result<(), StorageError> {
    if reading.city.trim().is_empty() {
        return Err(StorageError::InvalidReading("city is empty".to_string()));
    }

    let finite = reading.temperature_c.is_finite()
        && reading.humidity_pct.is_finite()
        && reading.pressure_hpa.is_none_or(f64::is_finite);

    if !finite {
        return Err(StorageError::InvalidReading(format!(
            "non-finite measurement for '{}'",
            reading.city
        )));
    }

    Ok(())
}
