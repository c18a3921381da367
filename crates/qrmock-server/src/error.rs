//! Error types for the runtime server.

use thiserror::Error;

use crate::server::JobStatus;

/// Result type for job and session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned synchronously by the job engine and session registry.
///
/// Execution failures never appear here: they are recorded on the job as
/// its `error_message` and the job moves to `FAILED`.
#[derive(Debug, Error)]
pub enum Error {
    /// Device name does not resolve in the catalog.
    #[error("Backend not found: {0}")]
    UnknownDevice(String),

    /// Program id is not a supported primitive.
    #[error("Invalid program_id: {0}")]
    UnsupportedProgram(String),

    /// Session id is unknown.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session exists but no longer accepts jobs.
    #[error("Session {0} is not accepting jobs")]
    SessionClosed(String),

    /// Job targets a different device than its session.
    #[error("Session {session_id} is bound to backend {session_device}, not {requested}")]
    DeviceMismatch {
        session_id: String,
        session_device: String,
        requested: String,
    },

    /// Session mode is not one of the supported modes.
    #[error("Invalid session mode: {0}. Must be 'dedicated' or 'batch'")]
    InvalidMode(String),

    /// Job id is unknown.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Result requested before the job completed.
    #[error("Job {job_id} is not completed. Current status: {status}")]
    JobNotCompleted { job_id: String, status: JobStatus },

    /// Execution capacity and backlog are both exhausted.
    #[error("Server is saturated ({limit} jobs in flight); retry later")]
    Saturated { limit: usize },

}

impl Error {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Saturated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::UnknownDevice("ghost".into()).to_string(),
            "Backend not found: ghost"
        );
        let err = Error::JobNotCompleted {
            job_id: "job-1".into(),
            status: JobStatus::Running,
        };
        assert_eq!(
            err.to_string(),
            "Job job-1 is not completed. Current status: RUNNING"
        );
    }

    #[test]
    fn test_classification() {
        assert!(Error::Saturated { limit: 4 }.is_retryable());
        assert!(!Error::SessionClosed("s".into()).is_retryable());
        assert!(!Error::JobNotFound("j".into()).is_retryable());
    }
}
