use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// What an ingestion step asks the upstream API for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDate {
    /// Current conditions; the reading is dated by its insertion time.
    Now,
    /// A calendar day passed to the upstream historical parameter.
    Day(NaiveDate),
}

impl fmt::Display for FetchDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchDate::Now => f.write_str("now"),
            FetchDate::Day(day) => write!(f, "{}", day.format("%Y-%m-%d")),
        }
    }
}

/// The `date` column of a stored reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationDate {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl ObservationDate {
    pub fn for_fetch(date: FetchDate, now: DateTime<Utc>) -> Self {
        match date {
            FetchDate::Now => ObservationDate::Instant(now),
            FetchDate::Day(day) => ObservationDate::Day(day),
        }
    }

    /// Text form written to the database.
    pub fn to_sql_text(&self) -> String {
        match self {
            ObservationDate::Day(day) => day.format("%Y-%m-%d").to_string(),
            ObservationDate::Instant(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl fmt::Display for ObservationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_text())
    }
}

/// One normalized observation. Temperature is always Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub city: String,
    pub date: ObservationDate,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinMax {
    pub min_temp: f64,
    pub max_temp: f64,
    pub min_humidity: f64,
    pub max_humidity: f64,
    /// `None` when no stored row for the city carries a pressure value.
    pub min_pressure: Option<f64>,
    pub max_pressure: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Averages {
    pub avg_temp: f64,
    pub avg_humidity: f64,
    pub avg_pressure: Option<f64>,
}

/// Temperature aggregates across every city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalStats {
    pub min_temp: f64,
    pub max_temp: f64,
    pub avg_temp: f64,
}

/// Temperature and humidity aggregates for one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityStats {
    pub city: String,
    pub min_temp: f64,
    pub max_temp: f64,
    pub avg_temp: f64,
    pub min_humidity: f64,
    pub max_humidity: f64,
    pub avg_humidity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn observation_date_text_forms() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(ObservationDate::Day(day).to_sql_text(), "2024-03-09");

        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(ObservationDate::Instant(ts).to_sql_text(), "2024-03-09T14:05:00Z");
    }

    #[test]
    fn now_is_dated_by_insertion_time() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(ObservationDate::for_fetch(FetchDate::Now, ts), ObservationDate::Instant(ts));

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            ObservationDate::for_fetch(FetchDate::Day(day), ts),
            ObservationDate::Day(day)
        );
    }
}
