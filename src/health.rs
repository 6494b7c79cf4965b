//! Liveness and readiness endpoints.
//!
//! - `/health` pings the database and reports overall status
//! - `/health/live` only says the process is serving requests

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::time::{Duration, SystemTime};
use tracing::{debug, error};

use crate::AppState;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub database: HealthStatus,
}

fn uptime(started_at: SystemTime) -> u64 {
    SystemTime::now()
        .duration_since(started_at)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

/// Health check with a database round trip
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match crate::db::check_connection(&state.db).await {
        Ok(()) => HealthStatus::Up,
        Err(e) => {
            error!("Database health check failed: {}", e);
            HealthStatus::Down
        }
    };

    let info = HealthInfo {
        status: database,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        uptime_seconds: uptime(state.started_at),
        database,
    };
    debug!(status = ?info.status, "health check");

    let status_code = match info.status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(info))
}

pub async fn liveness_check() -> impl IntoResponse {
    Json(json!({
        "alive": true,
        "timestamp": Utc::now(),
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
}
