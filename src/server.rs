//! HTTP surface over the cache.
//!
//! Endpoints:
//!   GET  /api/prediction             current prediction snapshot
//!   GET  /api/detail/{date}          detail document for YYYY-MM-DD
//!   GET|POST /api/tasks/refresh-cache  start a refresh (X-Cron-Secret)
//!   GET  /api/status                 what the cache currently holds
//!   GET  /healthz                    liveness probe

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::parse_date;
use forecast_cache::{Refresher, SharedCacheStore};
use tracing::{info, warn};
use upstream_client::ForecastUpstream;

pub const REFRESH_SECRET_HEADER: &str = "x-cron-secret";

/// State shared by every handler.
pub struct AppState<U> {
    pub store: SharedCacheStore,
    pub refresher: Refresher<U>,
    /// Empty disables the refresh endpoint.
    pub refresh_secret: Arc<str>,
}

impl<U> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            refresher: self.refresher.clone(),
            refresh_secret: Arc::clone(&self.refresh_secret),
        }
    }
}

pub fn router<U: ForecastUpstream>(state: AppState<U>) -> Router {
    Router::new()
        .route("/api/prediction", get(prediction_handler::<U>))
        .route("/api/detail/{date}", get(detail_handler::<U>))
        .route(
            "/api/tasks/refresh-cache",
            get(refresh_handler::<U>).post(refresh_handler::<U>),
        )
        .route("/api/status", get(status_handler::<U>))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}

/// Serve the API on `addr` until the listener fails.
pub async fn serve<U: ForecastUpstream>(addr: &str, state: AppState<U>) -> common::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn json_response(body: impl IntoResponse) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn prediction_handler<U: ForecastUpstream>(State(state): State<AppState<U>>) -> Response {
    match state.store.get_prediction().await {
        Some(body) => json_response(body),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "prediction data is not available yet",
        )
            .into_response(),
    }
}

async fn detail_handler<U: ForecastUpstream>(
    State(state): State<AppState<U>>,
    Path(raw_date): Path<String>,
) -> Response {
    let Some(date) = parse_date(&raw_date) else {
        return (StatusCode::BAD_REQUEST, "date must be YYYY-MM-DD").into_response();
    };
    match state.store.get_detail(date).await {
        Some(body) => json_response(body),
        None => (StatusCode::NOT_FOUND, "no data for the requested date").into_response(),
    }
}

async fn refresh_handler<U: ForecastUpstream>(
    State(state): State<AppState<U>>,
    headers: HeaderMap,
) -> Response {
    let provided = headers
        .get(REFRESH_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if state.refresh_secret.is_empty() || !secrets_match(provided, &state.refresh_secret) {
        warn!("Rejected refresh request with missing or wrong secret");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    // Fire and forget: the refresh outlives this request.
    drop(state.refresher.trigger());
    (StatusCode::OK, "Cache refresh triggered.").into_response()
}

/// Compare without short-circuiting on the first differing byte.
fn secrets_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

async fn status_handler<U: ForecastUpstream>(State(state): State<AppState<U>>) -> Response {
    Json(state.store.status().await).into_response()
}

async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
