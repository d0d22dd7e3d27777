use chrono::{Days, NaiveDate};

use crate::{model::FetchDate, provider::WeatherProvider, store::ReadingStore};

/// Outcome counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub inserted: usize,
    pub fetch_failures: usize,
    pub storage_failures: usize,
}

impl RunSummary {
    pub fn failures(&self) -> usize {
        self.fetch_failures + self.storage_failures
    }
}

/// Drives provider → store for every (city, date) pair, one request at a time.
#[derive(Debug)]
pub struct IngestionRunner<'a> {
    provider: &'a dyn WeatherProvider,
    store: &'a ReadingStore,
}

impl<'a> IngestionRunner<'a> {
    pub fn new(provider: &'a dyn WeatherProvider, store: &'a ReadingStore) -> Self {
        Self { provider, store }
    }

    /// Failures are logged and counted; they never stop the remaining pairs.
    pub async fn run(&self, cities: &[String], dates: &[FetchDate]) -> RunSummary {
        let mut summary = RunSummary::default();

        for city in cities {
            for &date in dates {
                summary.attempted += 1;
                tracing::info!(city = %city, %date, "processing");

                let reading = match self.provider.fetch(city, date).await {
                    Ok(reading) => reading,
                    Err(e) => {
                        summary.fetch_failures += 1;
                        tracing::warn!(
                            city = %city,
                            %date,
                            operation = "fetch",
                            error = %e,
                            "skipping after fetch failure"
                        );
                        continue;
                    }
                };

                match self.store.insert(&reading) {
                    Ok(id) => {
                        summary.inserted += 1;
                        tracing::info!(
                            city = %city,
                            %date,
                            id,
                            temperature_c = reading.temperature_c,
                            "reading inserted"
                        );
                    }
                    Err(e) => {
                        summary.storage_failures += 1;
                        tracing::error!(
                            city = %city,
                            %date,
                            operation = "insert",
                            error = %e,
                            "failed to store reading"
                        );
                    }
                }
            }
        }

        tracing::info!(
            attempted = summary.attempted,
            inserted = summary.inserted,
            failures = summary.failures(),
            "ingestion run complete"
        );
        summary
    }
}

/// The `n` calendar days ending at `today`, oldest first.
pub fn past_days(today: NaiveDate, n: u32) -> Vec<FetchDate> {
    (0..n)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(u64::from(back))))
        .map(FetchDate::Day)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::FetchError,
        model::{ObservationDate, Reading},
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails for configured cities, otherwise returns a fixed reading.
    #[derive(Debug, Default)]
    struct FakeProvider {
        failing: Vec<&'static str>,
        malformed: Vec<&'static str>,
        calls: Mutex<Vec<(String, FetchDate)>>,
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn fetch(&self, city: &str, date: FetchDate) -> Result<Reading, FetchError> {
            self.calls.lock().unwrap().push((city.to_string(), date));

            if self.failing.iter().any(|f| *f == city) {
                return Err(FetchError::Status {
                    city: city.to_string(),
                    status: reqwest::StatusCode::NOT_FOUND,
                    body: "city not found".into(),
                });
            }

            if self.malformed.iter().any(|f| *f == city) {
                return Err(FetchError::MalformedPayload {
                    city: city.to_string(),
                    reason: "missing `main` object".into(),
                });
            }

            let date = match date {
                FetchDate::Day(day) => ObservationDate::Day(day),
                FetchDate::Now => ObservationDate::Day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            };

            Ok(Reading {
                city: city.to_string(),
                date,
                temperature_c: 20.0,
                humidity_pct: 50.0,
                pressure_hpa: Some(1012.0),
            })
        }
    }

    fn store() -> (tempfile::TempDir, ReadingStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ReadingStore::open(dir.path().join("weather.db"));
        store.ensure_schema().unwrap();
        (dir, store)
    }

    fn cities(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn past_days_are_oldest_first_and_end_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let days = past_days(today, 3);

        assert_eq!(
            days,
            vec![
                FetchDate::Day(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
                FetchDate::Day(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
                FetchDate::Day(today),
            ]
        );
        assert!(past_days(today, 0).is_empty());
    }

    #[tokio::test]
    async fn failure_for_one_city_does_not_stop_the_run() {
        let (_dir, store) = store();
        let provider = FakeProvider { failing: vec!["Atlantis"], ..Default::default() };
        let runner = IngestionRunner::new(&provider, &store);

        let summary = runner
            .run(&cities(&["London", "Atlantis", "Berlin"]), &[FetchDate::Now])
            .await;

        assert_eq!(
            summary,
            RunSummary { attempted: 3, inserted: 2, fetch_failures: 1, storage_failures: 0 }
        );
        assert_eq!(store.count("London").unwrap(), 1);
        assert_eq!(store.count("Atlantis").unwrap(), 0);
        assert_eq!(store.count("Berlin").unwrap(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_mid_run_does_not_stop_later_pairs() {
        let (_dir, store) = store();
        let provider = FakeProvider { malformed: vec!["Tokyo"], ..Default::default() };
        let runner = IngestionRunner::new(&provider, &store);
        let dates = past_days(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(), 2);

        let summary = runner.run(&cities(&["London", "Tokyo", "Sydney"]), &dates).await;

        assert_eq!(
            summary,
            RunSummary { attempted: 6, inserted: 4, fetch_failures: 2, storage_failures: 0 }
        );
        assert_eq!(provider.calls.lock().unwrap().len(), 6);
        assert_eq!(store.count("London").unwrap(), 2);
        assert_eq!(store.count("Tokyo").unwrap(), 0);
        assert_eq!(store.count("Sydney").unwrap(), 2);
    }

    #[tokio::test]
    async fn pairs_are_visited_in_order() {
        let (_dir, store) = store();
        let provider = FakeProvider::default();
        let runner = IngestionRunner::new(&provider, &store);
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let dates = past_days(today, 2);

        runner.run(&cities(&["Tokyo", "Sydney"]), &dates).await;

        let calls = provider.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                ("Tokyo".to_string(), dates[0]),
                ("Tokyo".to_string(), dates[1]),
                ("Sydney".to_string(), dates[0]),
                ("Sydney".to_string(), dates[1]),
            ]
        );
        assert_eq!(store.count("Tokyo").unwrap(), 2);
    }

    #[tokio::test]
    async fn storage_failure_is_counted_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        // Schema never created, so every insert fails.
        let store = ReadingStore::open(dir.path().join("weather.db"));
        let provider = FakeProvider::default();
        let runner = IngestionRunner::new(&provider, &store);

        let summary = runner.run(&cities(&["London", "Berlin"]), &[FetchDate::Now]).await;

        assert_eq!(summary.storage_failures, 2);
        assert_eq!(summary.inserted, 0);
        assert_eq!(provider.calls.lock().unwrap().len(), 2);
    }
}
