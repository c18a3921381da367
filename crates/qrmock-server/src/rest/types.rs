//! JSON request/response types for the runtime REST API.

use chrono::{DateTime, SecondsFormat, Utc};
use qrmock_catalog::DeviceSummary;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::server::{JobSnapshot, SessionSnapshot};

// ── Requests ──────────────────────────────────────────────────────────────

/// POST /v1/jobs
#[derive(Debug, Deserialize)]
pub struct JobCreateRequest {
    /// "sampler" or "estimator".
    pub program_id: String,
    /// Target backend name.
    pub backend: String,
    /// Primitive input, e.g. `{"pubs": [...], "version": 2}`.
    #[serde(default = "empty_object")]
    pub params: Value,
    #[serde(default = "empty_object")]
    pub options: Value,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// GET /v1/jobs query string.
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub backend: Option<String>,
    pub program: Option<String>,
    pub state: Option<String>,
}

/// POST /v1/sessions
#[derive(Debug, Deserialize)]
pub struct SessionCreateRequest {
    /// "dedicated" or "batch".
    pub mode: String,
    pub backend: String,
    #[serde(default)]
    pub instance: Option<String>,
    /// Seconds until the session stops accepting jobs.
    #[serde(default)]
    pub max_ttl: Option<u64>,
}

/// PATCH /v1/sessions/{id}
#[derive(Debug, Deserialize)]
pub struct SessionUpdateRequest {
    pub accepting_jobs: bool,
}

/// GET /v1/backends query string.
#[derive(Debug, Default, Deserialize)]
pub struct BackendsQuery {
    /// Comma-separated extra fields, e.g. `wait_time_seconds`.
    pub fields: Option<String>,
}

impl BackendsQuery {
    pub fn wants(&self, field: &str) -> bool {
        self.fields
            .as_deref()
            .is_some_and(|f| f.split(',').any(|x| x.trim() == field))
    }
}

// ── Responses ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct JobProgram {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobState {
    pub status: String,
    pub reason: Option<String>,
}

/// Job status document.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: String,
    pub program: JobProgram,
    pub backend: String,
    pub state: JobState,
    pub created: String,
    pub session_id: String,
}

impl From<JobSnapshot> for JobResponse {
    fn from(job: JobSnapshot) -> Self {
        Self {
            id: job.id,
            program: JobProgram {
                id: job.program.as_str().to_string(),
            },
            backend: job.device_name,
            state: JobState {
                status: job.status.as_str().to_string(),
                reason: job.reason,
            },
            created: timestamp(job.created_at),
            session_id: job.session_id,
        }
    }
}

/// GET /v1/jobs
#[derive(Debug, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
    pub count: usize,
}

/// Session document.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    pub mode: String,
    pub backend: String,
    pub instance: Option<String>,
    pub max_ttl: Option<u64>,
    pub created_at: String,
    pub accepting_jobs: bool,
    pub active: bool,
    pub elapsed_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<u64>,
    pub jobs: Vec<String>,
}

impl From<SessionSnapshot> for SessionResponse {
    fn from(session: SessionSnapshot) -> Self {
        Self {
            id: session.id,
            mode: session.mode.as_str().to_string(),
            backend: session.device_name,
            instance: session.instance,
            max_ttl: session.max_ttl,
            created_at: timestamp(session.created_at),
            accepting_jobs: session.accepting_jobs,
            active: session.active,
            elapsed_time: session.elapsed_time,
            remaining_time: session.remaining_time,
            jobs: session.job_ids,
        }
    }
}

/// GET /v1/backends
#[derive(Debug, Serialize)]
pub struct BackendsResponse {
    pub devices: Vec<DeviceSummary>,
}

/// One entry of an error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub code: Option<String>,
}

/// Error body returned by every failing request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
    pub trace: Option<String>,
    pub status_code: u16,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
