use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    config::Config,
    error::FetchError,
    model::{FetchDate, Reading},
};

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// A source of normalized readings, one outbound request per call.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, city: &str, date: FetchDate) -> Result<Reading, FetchError>;
}

/// Construct the upstream client from resolved config.
pub fn provider_from_config(config: &Config) -> OpenWeatherClient {
    OpenWeatherClient::new(config.api_base_url.clone(), config.api_key.clone())
}

/// Upstream default units are Kelvin; everything stored is Celsius, rounded to 2 decimals.
///
/// OpenWeather reports Kelvin with two decimals, so the rounding only removes float noise
/// from the subtraction. A finer input such as 298.1549 K would round to 25.00 °C and fall
/// inside the comfortable range.
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    ((kelvin - 273.15) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;

    #[test]
    fn kelvin_conversion_is_rounded() {
        assert_eq!(kelvin_to_celsius(293.15), 20.0);
        assert_eq!(kelvin_to_celsius(273.15), 0.0);
        assert_eq!(kelvin_to_celsius(300.0), 26.85);
        assert_eq!(kelvin_to_celsius(288.654), 15.5);
    }

    #[test]
    fn two_decimal_kelvin_keeps_comfort_boundary() {
        assert_eq!(kelvin_to_celsius(298.15), 25.0);
        assert_eq!(kelvin_to_celsius(298.16), 25.01);
        assert_eq!(kelvin_to_celsius(288.15), 15.0);
        assert_eq!(kelvin_to_celsius(288.14), 14.99);
    }

    #[test]
    fn provider_from_config_uses_configured_base() {
        let file = FileConfig { cities: None, api_base_url: Some("http://localhost:1".into()) };
        let cfg = Config::from_lookup(
            |name| match name {
                "API_KEY" => Some("KEY".into()),
                "DB_CONNECTION_STRING" => Some("w.db".into()),
                _ => None,
            },
            file,
        )
        .unwrap();

        let client = provider_from_config(&cfg);
        assert_eq!(client.endpoint(), "http://localhost:1/weather");
    }
}
