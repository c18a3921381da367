//! `/v1/backends` handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use qrmock_catalog::{DeviceConfiguration, DeviceDefaults, DeviceProperties, DeviceStatus};

use super::AppState;
use super::error::ApiError;
use super::types::{BackendsQuery, BackendsResponse};

const WAIT_TIME_FIELD: &str = "wait_time_seconds";

pub(super) async fn list_backends(
    State(state): State<AppState>,
    query: Result<Query<BackendsQuery>, QueryRejection>,
) -> Result<Json<BackendsResponse>, ApiError> {
    let Query(query) = query?;
    let devices = state
        .catalog
        .summaries(|name| state.jobs.pending_jobs(name), query.wants(WAIT_TIME_FIELD));
    Ok(Json(BackendsResponse { devices }))
}

pub(super) async fn get_configuration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeviceConfiguration>, ApiError> {
    state
        .catalog
        .configuration(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Backend not found: {id}")))
}

/// Pulse defaults exist only for open-pulse devices.
pub(super) async fn get_defaults(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeviceDefaults>, ApiError> {
    state
        .catalog
        .defaults(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Backend defaults not available for: {id}")))
}

pub(super) async fn get_properties(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeviceProperties>, ApiError> {
    state
        .catalog
        .properties(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Backend properties not available for: {id}")))
}

pub(super) async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeviceStatus>, ApiError> {
    let pending = state.jobs.pending_jobs(&id);
    state
        .catalog
        .status(&id, pending)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Backend not found: {id}")))
}
