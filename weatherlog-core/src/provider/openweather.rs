use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::FetchError,
    model::{FetchDate, ObservationDate, Reading},
};

use super::{WeatherProvider, kelvin_to_celsius};

/// Client for the OpenWeather current-weather endpoint.
///
/// Requests are sent without a `units` parameter, so upstream answers in Kelvin and
/// the reading is converted to Celsius here and nowhere else.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    api_key: String,
    require_pressure: bool,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            require_pressure: true,
            http: Client::new(),
        }
    }

    /// Accept payloads without `main.pressure`; such readings are stored with no pressure.
    pub fn pressure_optional(mut self) -> Self {
        self.require_pressure = false;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/weather", self.base_url)
    }

    fn normalize(
        &self,
        city: &str,
        date: FetchDate,
        parsed: OwCurrentResponse,
    ) -> Result<Reading, FetchError> {
        let malformed = |reason: &str| FetchError::MalformedPayload {
            city: city.to_string(),
            reason: reason.to_string(),
        };

        let main = parsed.main.ok_or_else(|| malformed("missing `main` object"))?;
        let temp_k = main.temp.ok_or_else(|| malformed("missing `main.temp`"))?;
        let humidity = main.humidity.ok_or_else(|| malformed("missing `main.humidity`"))?;

        if self.require_pressure && main.pressure.is_none() {
            return Err(malformed("missing `main.pressure`"));
        }

        Ok(Reading {
            city: city.to_string(),
            date: ObservationDate::for_fetch(date, Utc::now()),
            temperature_c: kelvin_to_celsius(temp_k),
            humidity_pct: humidity,
            pressure_hpa: main.pressure,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: Option<OwMain>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch(&self, city: &str, date: FetchDate) -> Result<Reading, FetchError> {
        let mut query: Vec<(&str, String)> =
            vec![("q", city.to_string()), ("appid", self.api_key.clone())];

        // The current-weather endpoint gives no guarantee that `dt` is honoured.
        if let FetchDate::Day(_) = date {
            query.push(("dt", date.to_string()));
        }

        tracing::debug!(city, %date, "requesting current weather");

        let res = self
            .http
            .get(self.endpoint())
            .query(&query)
            .send()
            .await
            .map_err(|source| FetchError::Network { city: city.to_string(), source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| FetchError::Network { city: city.to_string(), source })?;

        tracing::debug!(city, %date, status = status.as_u16(), "weather API responded");

        if !status.is_success() {
            return Err(FetchError::Status {
                city: city.to_string(),
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::MalformedPayload {
                city: city.to_string(),
                reason: e.to_string(),
            })?;

        self.normalize(city, date, parsed)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
