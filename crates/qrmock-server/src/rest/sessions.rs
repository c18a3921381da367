//! `/v1/sessions` handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use super::AppState;
use super::error::ApiError;
use super::types::{SessionCreateRequest, SessionResponse, SessionUpdateRequest};
use crate::error::Error;

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Session not found: {id}"))
}

pub(super) async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<SessionCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;

    if !state.catalog.contains(&request.backend) {
        return Err(Error::UnknownDevice(request.backend).into());
    }

    let session_id = state.sessions.create_session(
        &request.mode,
        &request.backend,
        request.instance,
        request.max_ttl,
    )?;
    let session = state
        .sessions
        .get_session(&session_id)
        .ok_or_else(|| ApiError::Internal("Failed to create session".to_string()))?;

    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

pub(super) async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    state
        .sessions
        .get_session(&id)
        .map(|session| Json(SessionResponse::from(session)))
        .ok_or_else(|| not_found(&id))
}

pub(super) async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SessionUpdateRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Json(request) = body?;

    if !state.sessions.close_session(&id, request.accepting_jobs) {
        return Err(not_found(&id));
    }
    state
        .sessions
        .get_session(&id)
        .map(|session| Json(SessionResponse::from(session)))
        .ok_or_else(|| not_found(&id))
}

/// Cancels the session and its unfinished jobs.
pub(super) async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.jobs.cancel_session(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&id))
    }
}
