//! HTTP query API.
//!
//! Serves stored aggregates as JSON and an on-demand fetch-and-store endpoint for a
//! single city. Store calls run on the blocking pool, each with its own connection.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::{
    error::{FetchError, StorageError},
    model::{CityStats, FetchDate, GlobalStats},
    provider::WeatherProvider,
    store::ReadingStore,
};

/// Shared state for HTTP handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub provider: Arc<dyn WeatherProvider>,
    pub store: ReadingStore,
}

/// JSON response for an on-demand fetch
#[derive(Debug, Serialize)]
pub struct CurrentWeatherResponse {
    pub city: String,
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StatsResponse<T> {
    Found(T),
    NoData { status: &'static str },
}

impl<T> StatsResponse<T> {
    fn from_option(value: Option<T>) -> Self {
        value.map_or(StatsResponse::NoData { status: "no data" }, StatsResponse::Found)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Fetch(FetchError),
    Storage { city: Option<String>, source: StorageError },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, ErrorBody { error: message, city: None })
            }
            ApiError::Fetch(e) => {
                let status = match e.status_code() {
                    Some(s) if s == reqwest::StatusCode::NOT_FOUND => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_GATEWAY,
                };
                tracing::warn!(city = e.city(), operation = "fetch", error = %e, "request failed");
                (status, ErrorBody { error: e.to_string(), city: Some(e.city().to_string()) })
            }
            ApiError::Storage { city, source } => {
                tracing::error!(city = ?city, error = %source, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody { error: format!("Storage error: {source}"), city },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

async fn with_store<T, F>(store: &ReadingStore, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&ReadingStore) -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(&store)).await?
}

/// GET /weather/{city} - Fetch current conditions, store them, return them
async fn fetch_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<CurrentWeatherResponse>, ApiError> {
    if city.trim().is_empty() {
        return Err(ApiError::BadRequest("City name must not be empty".to_string()));
    }

    let reading = state.provider.fetch(&city, FetchDate::Now).await.map_err(ApiError::Fetch)?;

    let stored = reading.clone();
    with_store(&state.store, move |store| store.insert(&stored))
        .await
        .map_err(|source| ApiError::Storage { city: Some(city.clone()), source })?;

    Ok(Json(CurrentWeatherResponse {
        city: reading.city,
        temperature: reading.temperature_c,
        humidity: reading.humidity_pct,
    }))
}

/// GET /weather/stats - Temperature aggregates across all cities
async fn global_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse<GlobalStats>>, ApiError> {
    let stats = with_store(&state.store, |store| store.global_stats())
        .await
        .map_err(|source| ApiError::Storage { city: None, source })?;

    Ok(Json(StatsResponse::from_option(stats)))
}

/// GET /weather/{city}/stats - Temperature and humidity aggregates for one city
async fn city_stats(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<StatsResponse<CityStats>>, ApiError> {
    let lookup = city.clone();
    let stats = with_store(&state.store, move |store| store.city_stats(&lookup))
        .await
        .map_err(|source| ApiError::Storage { city: Some(city), source })?;

    Ok(Json(StatsResponse::from_option(stats)))
}

/// GET /health - Liveness probe
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}

/// Create the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/weather/stats", get(global_stats))
        .route("/weather/{city}", get(fetch_city))
        .route("/weather/{city}/stats", get(city_stats))
        .with_state(state)
}

/// Serve until the process is terminated.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "query API listening");
    }
    axum::serve(listener, router(state)).await
}
