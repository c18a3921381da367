//! Health check, API info and metrics endpoints.
//!
//! - `/` - API info
//! - `/health` - Basic liveness check
//! - `/health/ready` - Readiness with job and session counts
//! - `/metrics` - Prometheus metrics in text format

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

use qrmock_catalog::DeviceCatalog;

use crate::metrics::Metrics;
use crate::server::SessionRegistry;

/// Runtime API version reported by the info and health endpoints.
pub const API_VERSION: &str = "2025-05-01";

/// Server uptime tracker.
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

/// Initialize the start time (call once at server startup).
pub fn init_start_time() {
    START_TIME.get_or_init(SystemTime::now);
}

fn get_uptime_seconds() -> u64 {
    START_TIME
        .get()
        .and_then(|start| SystemTime::now().duration_since(*start).ok())
        .map_or(0, |d| d.as_secs())
}

/// Shared state for health check handlers.
#[derive(Clone)]
pub struct HealthState {
    pub catalog: Arc<DeviceCatalog>,
    pub sessions: Arc<SessionRegistry>,
    pub metrics: Metrics,
}

impl HealthState {
    pub fn new(catalog: Arc<DeviceCatalog>, sessions: Arc<SessionRegistry>, metrics: Metrics) -> Self {
        Self {
            catalog,
            sessions,
            metrics,
        }
    }
}

/// Response for `/`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub server_version: String,
    pub endpoints: Vec<String>,
}

/// Response for `/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Response for `/health/ready`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub backends: usize,
    pub active_sessions: usize,
    pub active_jobs: u64,
    pub queued_jobs: u64,
}

async fn info_handler() -> impl IntoResponse {
    Json(ApiInfo {
        name: "Qiskit Runtime mock server".to_string(),
        version: API_VERSION.to_string(),
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: [
            "/health",
            "/metrics",
            "/v1/backends",
            "/v1/jobs",
            "/v1/sessions",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    })
}

/// Always 200 while the process is serving.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: API_VERSION.to_string(),
        uptime_seconds: get_uptime_seconds(),
    })
}

/// Ready once the catalog has at least one device.
async fn readiness_handler(State(state): State<HealthState>) -> Response {
    let snapshot = state.metrics.snapshot();
    let ready = !state.catalog.is_empty();

    let response = ReadinessResponse {
        ready,
        backends: state.catalog.len(),
        active_sessions: state.sessions.active_count(),
        active_jobs: snapshot.active_jobs,
        queued_jobs: snapshot.queued_jobs,
    };

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response)).into_response()
}

async fn metrics_handler(State(state): State<HealthState>) -> Response {
    match state.metrics.export() {
        Ok(metrics) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics,
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to export metrics".to_string(),
        )
            .into_response(),
    }
}

/// Router for the unauthenticated endpoints.
pub fn create_health_router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(info_handler))
        .route("/health", get(health_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
