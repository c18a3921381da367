//! Job lifecycle types.
//!
//! The job state machine:
//!
//! ```text
//!   create_job() ──→ Queued ──→ Running ──→ Completed
//!                      │           │
//!                      │           ├──→ Failed
//!                      │           │
//!                      └───────────┴──→ Cancelled
//! ```
//!
//! **Invariants:**
//! - Transitions are monotonic: a job never moves backward.
//! - Terminal states (`Completed`, `Failed`, `Cancelled`) are permanent.
//! - A result exists only when the status is `Completed`; an error message
//!   exists only when it is `Failed`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use qrmock_engine::{PrimitiveResult, ProgramId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::AbortHandle;

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Waiting for its execution unit to start.
    Queued,
    /// Executing on the compute engine.
    Running,
    /// Finished with a result.
    Completed,
    /// Finished with an error message.
    Failed,
    /// Cancelled by a client.
    Cancelled,
}

impl JobStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Check if the job is still pending (queued or running).
    pub fn is_pending(self) -> bool {
        !self.is_terminal()
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running | JobStatus::Cancelled)
                | (
                    JobStatus::Running,
                    JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
                )
        )
    }

    /// Wire name, e.g. `QUEUED`.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    /// Case-insensitive; accepts the `CANCELED` spelling as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "QUEUED" => Ok(JobStatus::Queued),
            "RUNNING" => Ok(JobStatus::Running),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "CANCELLED" | "CANCELED" => Ok(JobStatus::Cancelled),
            _ => Err(format!("Invalid job state: {s}")),
        }
    }
}

/// Request to create a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub program_id: String,
    pub device_name: String,
    /// Opaque input payload, decoded by the execution unit.
    pub params: Value,
    pub options: Value,
    pub session_id: Option<String>,
}

impl NewJob {
    pub fn new(program_id: impl Into<String>, device_name: impl Into<String>, params: Value) -> Self {
        Self {
            program_id: program_id.into(),
            device_name: device_name.into(),
            params,
            options: Value::Object(serde_json::Map::new()),
            session_id: None,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// A job as stored by the engine. Only ever touched under the job table lock.
#[derive(Debug)]
pub(crate) struct JobRecord {
    pub id: String,
    pub program: ProgramId,
    pub device_name: String,
    pub session_id: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    /// Insertion order, breaks ties between equal `created_at` values.
    pub seq: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: Option<Arc<PrimitiveResult>>,
    pub error_message: Option<String>,
    pub execution_handle: Option<AbortHandle>,
}

impl JobRecord {
    /// Move to `next` if the state machine allows it.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        let now = Utc::now();
        match next {
            JobStatus::Running => self.started_at = Some(now),
            s if s.is_terminal() => self.finished_at = Some(now),
            _ => {}
        }
        self.status = next;
        true
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            program: self.program,
            device_name: self.device_name.clone(),
            status: self.status,
            reason: self.error_message.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            session_id: self
                .session_id
                .clone()
                .unwrap_or_else(|| self.id.clone()),
        }
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: String,
    pub program: ProgramId,
    pub device_name: String,
    pub status: JobStatus,
    /// Error message when the job failed.
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Session the job belongs to, or the job's own id when it has none.
    pub session_id: String,
}

/// Equality filters and pagination for [`list_jobs`](super::JobEngine::list_jobs).
#[derive(Debug, Clone)]
pub struct JobFilter {
    pub limit: usize,
    pub skip: usize,
    pub device_name: Option<String>,
    pub program: Option<ProgramId>,
    pub state: Option<JobStatus>,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            limit: 10,
            skip: 0,
            device_name: None,
            program: None,
            state: None,
        }
    }
}

impl JobFilter {
    pub fn matches(&self, job: &JobRecord) -> bool {
        self.device_name
            .as_deref()
            .is_none_or(|d| d == job.device_name)
            && self.program.is_none_or(|p| p == job.program)
            && self.state.is_none_or(|s| s == job.status)
    }
}

/// One page of `list_jobs` output, newest first.
#[derive(Debug, Clone)]
pub struct JobPage {
    pub jobs: Vec<JobSnapshot>,
    /// Number of jobs on this page.
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: JobStatus) -> JobRecord {
        JobRecord {
            id: "job-1".into(),
            program: ProgramId::Sampler,
            device_name: "fake_lima".into(),
            session_id: None,
            status,
            created_at: Utc::now(),
            seq: 0,
            started_at: None,
            finished_at: None,
            result: None,
            error_message: None,
            execution_handle: None,
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_transitions_are_monotonic() {
        use JobStatus::*;
        let all = [Queued, Running, Completed, Failed, Cancelled];
        for from in all {
            for to in all {
                let allowed = from.can_transition_to(to);
                if from.is_terminal() || from == to {
                    assert!(!allowed, "{from} -> {to}");
                }
            }
        }
        assert!(Queued.can_transition_to(Running));
        assert!(Queued.can_transition_to(Cancelled));
        assert!(!Queued.can_transition_to(Completed));
        assert!(!Running.can_transition_to(Queued));
    }

    #[test]
    fn test_record_transition_timestamps() {
        let mut job = record(JobStatus::Queued);
        assert!(job.transition(JobStatus::Running));
        assert!(job.started_at.is_some());
        assert!(job.finished_at.is_none());
        assert!(job.transition(JobStatus::Completed));
        assert!(job.finished_at.is_some());
        assert!(!job.transition(JobStatus::Cancelled));
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_snapshot_session_fallback() {
        let mut job = record(JobStatus::Queued);
        assert_eq!(job.snapshot().session_id, "job-1");
        job.session_id = Some("session-9".into());
        assert_eq!(job.snapshot().session_id, "session-9");
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("failed".parse::<JobStatus>().unwrap(), JobStatus::Failed);
        assert_eq!("CANCELED".parse::<JobStatus>().unwrap(), JobStatus::Cancelled);
        assert!("DONE".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_filter() {
        let job = record(JobStatus::Failed);
        assert!(JobFilter::default().matches(&job));
        let by_state = JobFilter {
            state: Some(JobStatus::Failed),
            ..JobFilter::default()
        };
        assert!(by_state.matches(&job));
        let by_device = JobFilter {
            device_name: Some("fake_manila".into()),
            ..JobFilter::default()
        };
        assert!(!by_device.matches(&job));
        let by_program = JobFilter {
            program: Some(ProgramId::Estimator),
            ..JobFilter::default()
        };
        assert!(!by_program.matches(&job));
    }
}
