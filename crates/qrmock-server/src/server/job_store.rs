//! Job engine: job storage, dispatch and cancellation.
//!
//! `create_job` validates the request, stores a `QUEUED` record and spawns one
//! Tokio task per job; it returns without waiting for the task. The job table
//! lock is only held for map access, never across an await or an engine call.

use std::cmp::Reverse;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use qrmock_catalog::DeviceCatalog;
use qrmock_engine::{ComputeEngine, PrimitiveResult, ProgramId};
use rustc_hash::FxHashMap;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::job::{JobFilter, JobPage, JobRecord, JobSnapshot, JobStatus, NewJob};
use super::job_execution::ExecutionUnit;
use super::session_registry::SessionRegistry;
use crate::error::{Error, Result};
use crate::metrics::Metrics;

/// Optional bounds on job execution.
///
/// With both limits set, at most `max_concurrent_jobs` jobs run at once and
/// `create_job` fails with [`Error::Saturated`] once running plus waiting
/// jobs reach `max_concurrent_jobs + max_queued_jobs`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub max_concurrent_jobs: Option<usize>,
    pub max_queued_jobs: Option<usize>,
}

impl ExecutionLimits {
    /// No bounds: every job runs as soon as it is created.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Number of non-terminal jobs at which submissions are rejected.
    pub fn saturation_point(&self) -> Option<usize> {
        Some(self.max_concurrent_jobs? + self.max_queued_jobs?)
    }
}

#[derive(Debug, Default)]
struct JobTable {
    jobs: FxHashMap<String, JobRecord>,
    next_seq: u64,
}

struct Inner {
    jobs: Mutex<JobTable>,
    catalog: Arc<DeviceCatalog>,
    sessions: Arc<SessionRegistry>,
    compute: Arc<dyn ComputeEngine>,
    limits: ExecutionLimits,
    permits: Option<Arc<Semaphore>>,
    metrics: Metrics,
}

/// Shared job engine handle.
#[derive(Clone)]
pub struct JobEngine {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for JobEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobEngine")
            .field("compute", &self.inner.compute.name())
            .field("limits", &self.inner.limits)
            .field("jobs", &self.len())
            .finish()
    }
}

impl JobEngine {
    /// Create an engine with unbounded execution.
    pub fn new(
        catalog: Arc<DeviceCatalog>,
        sessions: Arc<SessionRegistry>,
        compute: Arc<dyn ComputeEngine>,
    ) -> Self {
        Self::with_limits(catalog, sessions, compute, ExecutionLimits::unbounded())
    }

    pub fn with_limits(
        catalog: Arc<DeviceCatalog>,
        sessions: Arc<SessionRegistry>,
        compute: Arc<dyn ComputeEngine>,
        limits: ExecutionLimits,
    ) -> Self {
        let permits = limits
            .max_concurrent_jobs
            .map(|n| Arc::new(Semaphore::new(n)));
        Self {
            inner: Arc::new(Inner {
                jobs: Mutex::new(JobTable::default()),
                catalog,
                sessions,
                compute,
                limits,
                permits,
                metrics: Metrics::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobTable> {
        self.inner
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn catalog(&self) -> &Arc<DeviceCatalog> {
        &self.inner.catalog
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.inner.sessions
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.inner.limits
    }

    pub(super) fn compute(&self) -> &dyn ComputeEngine {
        &*self.inner.compute
    }

    pub(super) fn permits(&self) -> Option<Arc<Semaphore>> {
        self.inner.permits.clone()
    }

    /// Validate and store a new job, then dispatch it in the background.
    ///
    /// Must be called from within a Tokio runtime. Returns the new job id
    /// as soon as the job is stored.
    #[instrument(skip(self, job), fields(program = %job.program_id, device = %job.device_name))]
    pub fn create_job(&self, job: NewJob) -> Result<String> {
        let device = self
            .inner
            .catalog
            .resolve(&job.device_name)
            .ok_or_else(|| Error::UnknownDevice(job.device_name.clone()))?;
        let program: ProgramId = job
            .program_id
            .parse()
            .map_err(|_| Error::UnsupportedProgram(job.program_id.clone()))?;

        let job_id = format!("job-{}", uuid::Uuid::new_v4());

        let mut table = self.lock();

        if let Some(limit) = self.inner.limits.saturation_point() {
            let in_flight = table
                .jobs
                .values()
                .filter(|j| j.status.is_pending())
                .count();
            if in_flight >= limit {
                warn!(in_flight, limit, "Rejecting job: execution capacity exhausted");
                return Err(Error::Saturated { limit });
            }
        }

        let lane = match job.session_id.as_deref() {
            Some(session_id) => {
                self.inner
                    .sessions
                    .admit_job(session_id, &job.device_name, &job_id)?
            }
            None => None,
        };

        let unit = ExecutionUnit {
            job_id: job_id.clone(),
            program,
            device,
            params: job.params,
            options: job.options,
            lane,
        };
        let handle = tokio::spawn(unit.run(self.clone()));

        let seq = table.next_seq;
        table.next_seq += 1;
        table.jobs.insert(
            job_id.clone(),
            JobRecord {
                id: job_id.clone(),
                program,
                device_name: job.device_name.clone(),
                session_id: job.session_id.clone(),
                status: JobStatus::Queued,
                created_at: Utc::now(),
                seq,
                started_at: None,
                finished_at: None,
                result: None,
                error_message: None,
                execution_handle: Some(handle.abort_handle()),
            },
        );
        drop(table);

        self.inner
            .metrics
            .record_job_submitted(&job.device_name, program.as_str());
        info!(job_id = %job_id, session_id = ?job.session_id, "Job created");

        Ok(job_id)
    }

    /// Point-in-time status of a job.
    pub fn get_job_status(&self, job_id: &str) -> Option<JobSnapshot> {
        self.lock().jobs.get(job_id).map(JobRecord::snapshot)
    }

    /// Result of a completed job.
    pub fn get_job_result(&self, job_id: &str) -> Result<Arc<PrimitiveResult>> {
        let table = self.lock();
        let job = table
            .jobs
            .get(job_id)
            .ok_or_else(|| Error::JobNotFound(job_id.to_string()))?;
        match (job.status, &job.result) {
            (JobStatus::Completed, Some(result)) => Ok(Arc::clone(result)),
            (status, _) => Err(Error::JobNotCompleted {
                job_id: job_id.to_string(),
                status,
            }),
        }
    }

    /// Cancel a job.
    ///
    /// The status flips to `CANCELLED` immediately; the execution task is
    /// aborted afterwards, outside the lock. Returns `Ok(false)` when the job
    /// is already terminal and [`Error::JobNotFound`] when it does not exist.
    #[instrument(skip(self))]
    pub fn cancel(&self, job_id: &str) -> Result<bool> {
        let (handle, was_running, device_name) = {
            let mut table = self.lock();
            let job = table
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| Error::JobNotFound(job_id.to_string()))?;
            let was_running = job.status == JobStatus::Running;
            if !job.transition(JobStatus::Cancelled) {
                return Ok(false);
            }
            (
                job.execution_handle.take(),
                was_running,
                job.device_name.clone(),
            )
        };

        if let Some(handle) = handle {
            handle.abort();
        }
        self.inner
            .metrics
            .record_job_cancelled(&device_name, was_running);
        info!(job_id, "Job cancelled");

        Ok(true)
    }

    /// Cancel a job, treating an absent job like a terminal one.
    pub fn cancel_job(&self, job_id: &str) -> bool {
        self.cancel(job_id).unwrap_or(false)
    }

    /// Filter, sort newest first and paginate.
    pub fn list_jobs(&self, filter: &JobFilter) -> JobPage {
        let table = self.lock();
        let mut matching: Vec<&JobRecord> =
            table.jobs.values().filter(|j| filter.matches(j)).collect();
        matching.sort_by_key(|j| (Reverse(j.created_at), j.seq));

        let jobs: Vec<JobSnapshot> = matching
            .into_iter()
            .skip(filter.skip)
            .take(filter.limit)
            .map(JobRecord::snapshot)
            .collect();
        let count = jobs.len();
        JobPage { jobs, count }
    }

    /// Number of non-terminal jobs targeting a device.
    pub fn pending_jobs(&self, device_name: &str) -> usize {
        self.lock()
            .jobs
            .values()
            .filter(|j| j.device_name == device_name && j.status.is_pending())
            .count()
    }

    /// Cancel a session and every non-terminal job registered under it.
    ///
    /// Returns false if the session does not exist.
    #[instrument(skip(self))]
    pub fn cancel_session(&self, session_id: &str) -> bool {
        let sessions = &self.inner.sessions;
        if !sessions.cancel_session(session_id) {
            return false;
        }
        let cancelled = sessions
            .session_jobs(session_id)
            .unwrap_or_default()
            .iter()
            .filter(|job_id| matches!(self.cancel(job_id), Ok(true)))
            .count();
        if cancelled > 0 {
            info!(session_id, cancelled, "Cancelled session jobs");
        }
        true
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// QUEUED → RUNNING. Returns false if the job left `QUEUED` meanwhile.
    pub(super) fn mark_running(&self, job_id: &str) -> bool {
        let mut table = self.lock();
        let Some(job) = table.jobs.get_mut(job_id) else {
            return false;
        };
        if !job.transition(JobStatus::Running) {
            return false;
        }
        drop(table);
        self.inner.metrics.record_job_started();
        debug!(job_id, "Job running");
        true
    }

    /// Terminal write from the execution unit.
    ///
    /// A job that is already terminal (cancelled while running) keeps its
    /// state and the outcome is dropped.
    pub(super) fn finish(
        &self,
        job_id: &str,
        outcome: std::result::Result<PrimitiveResult, String>,
        elapsed: Duration,
    ) {
        let mut table = self.lock();
        let Some(job) = table.jobs.get_mut(job_id) else {
            return;
        };
        let next = if outcome.is_ok() {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        if !job.transition(next) {
            debug!(job_id, status = %job.status, "Discarding outcome of terminal job");
            return;
        }
        job.execution_handle = None;

        let device_name = job.device_name.clone();
        let program = job.program;
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            Ok(result) => {
                job.result = Some(Arc::new(result));
                drop(table);
                self.inner
                    .metrics
                    .record_job_completed(&device_name, program.as_str(), elapsed_ms);
                info!(job_id, elapsed_ms, "Job completed");
            }
            Err(message) => {
                warn!(job_id, error = %message, "Job failed");
                job.error_message = Some(message);
                drop(table);
                self.inner
                    .metrics
                    .record_job_failed(&device_name, program.as_str(), elapsed_ms);
            }
        }
    }
}
