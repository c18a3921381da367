//! `/v1/jobs` handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use qrmock_engine::{PrimitiveResult, ProgramId};

use super::AppState;
use super::error::ApiError;
use super::types::{JobCreateRequest, JobListQuery, JobListResponse, JobResponse};
use crate::server::{JobFilter, JobStatus, NewJob};

const MAX_PAGE_SIZE: usize = 100;

pub(super) async fn create_job(
    State(state): State<AppState>,
    body: Result<Json<JobCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;

    let mut job = NewJob::new(request.program_id, request.backend, request.params)
        .with_options(request.options);
    job.session_id = request.session_id;

    let job_id = state.jobs.create_job(job)?;
    let snapshot = state
        .jobs
        .get_job_status(&job_id)
        .ok_or_else(|| ApiError::Internal(format!("Job {job_id} missing after creation")))?;

    Ok((StatusCode::CREATED, Json(JobResponse::from(snapshot))))
}

pub(super) async fn list_jobs(
    State(state): State<AppState>,
    query: Result<Query<JobListQuery>, QueryRejection>,
) -> Result<Json<JobListResponse>, ApiError> {
    let Query(query) = query?;

    let limit = query.limit.unwrap_or(10);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let program = query
        .program
        .as_deref()
        .map(str::parse::<ProgramId>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let state_filter = query
        .state
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let page = state.jobs.list_jobs(&JobFilter {
        limit,
        skip: query.skip.unwrap_or(0),
        device_name: query.backend,
        program,
        state: state_filter,
    });

    Ok(Json(JobListResponse {
        jobs: page.jobs.into_iter().map(JobResponse::from).collect(),
        count: page.count,
    }))
}

pub(super) async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    state
        .jobs
        .get_job_status(&id)
        .map(|job| Json(JobResponse::from(job)))
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {id}")))
}

/// The result document is the primitive result itself, not wrapped.
pub(super) async fn get_job_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PrimitiveResult>, ApiError> {
    let result = state.jobs.get_job_result(&id)?;
    Ok(Json(PrimitiveResult::clone(&result)))
}

/// An already terminal job answers 409, not 404, so clients can tell it
/// apart from an unknown id.
pub(super) async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.jobs.cancel(&id)? {
        return Ok(StatusCode::NO_CONTENT);
    }
    let status = state
        .jobs
        .get_job_status(&id)
        .map_or_else(|| "unknown".to_string(), |job| job.status.to_string());
    Err(ApiError::Conflict(format!(
        "Job {id} is already in a terminal state: {status}"
    )))
}
