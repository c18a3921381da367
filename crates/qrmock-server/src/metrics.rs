//! Prometheus metrics for the runtime server.
//!
//! Collectors are process-global (`lazy_static`) and registered with the
//! default registry; [`Metrics`] is a zero-sized handle with recording helpers.

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder, register_counter_vec, register_gauge,
    register_histogram_vec,
};

lazy_static! {
    /// Jobs accepted by `create_job`, labeled by device and program.
    pub static ref JOBS_SUBMITTED: CounterVec = register_counter_vec!(
        "qrmock_jobs_submitted_total",
        "Total number of jobs submitted",
        &["backend", "program"]
    )
    .expect("register qrmock_jobs_submitted_total");

    pub static ref JOBS_COMPLETED: CounterVec = register_counter_vec!(
        "qrmock_jobs_completed_total",
        "Total number of jobs completed successfully",
        &["backend", "program"]
    )
    .expect("register qrmock_jobs_completed_total");

    pub static ref JOBS_FAILED: CounterVec = register_counter_vec!(
        "qrmock_jobs_failed_total",
        "Total number of jobs that failed",
        &["backend", "program"]
    )
    .expect("register qrmock_jobs_failed_total");

    pub static ref JOBS_CANCELLED: CounterVec = register_counter_vec!(
        "qrmock_jobs_cancelled_total",
        "Total number of jobs cancelled",
        &["backend"]
    )
    .expect("register qrmock_jobs_cancelled_total");

    /// Engine execution time in milliseconds.
    pub static ref JOB_DURATION: HistogramVec = register_histogram_vec!(
        "qrmock_job_duration_milliseconds",
        "Job execution duration in milliseconds",
        &["backend", "program"],
        vec![1.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .expect("register qrmock_job_duration_milliseconds");

    pub static ref QUEUED_JOBS: Gauge = register_gauge!(
        "qrmock_queued_jobs",
        "Number of jobs waiting to start"
    )
    .expect("register qrmock_queued_jobs");

    pub static ref ACTIVE_JOBS: Gauge = register_gauge!(
        "qrmock_active_jobs",
        "Number of currently running jobs"
    )
    .expect("register qrmock_active_jobs");

    pub static ref SESSIONS_CREATED: CounterVec = register_counter_vec!(
        "qrmock_sessions_created_total",
        "Total number of sessions opened",
        &["mode"]
    )
    .expect("register qrmock_sessions_created_total");

    pub static ref ACTIVE_SESSIONS: Gauge = register_gauge!(
        "qrmock_active_sessions",
        "Number of sessions that are still active"
    )
    .expect("register qrmock_active_sessions");
}

/// Recording handle for the global collectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Metrics;

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_job_submitted(&self, backend: &str, program: &str) {
        JOBS_SUBMITTED.with_label_values(&[backend, program]).inc();
        QUEUED_JOBS.inc();
    }

    pub fn record_job_started(&self) {
        QUEUED_JOBS.dec();
        ACTIVE_JOBS.inc();
    }

    /// Record a successful execution and its duration.
    pub fn record_job_completed(&self, backend: &str, program: &str, duration_ms: u64) {
        JOBS_COMPLETED.with_label_values(&[backend, program]).inc();
        ACTIVE_JOBS.dec();
        JOB_DURATION
            .with_label_values(&[backend, program])
            .observe(duration_ms as f64);
    }

    pub fn record_job_failed(&self, backend: &str, program: &str, duration_ms: u64) {
        JOBS_FAILED.with_label_values(&[backend, program]).inc();
        ACTIVE_JOBS.dec();
        JOB_DURATION
            .with_label_values(&[backend, program])
            .observe(duration_ms as f64);
    }

    /// Record a cancellation. `was_running` picks the gauge to decrement.
    pub fn record_job_cancelled(&self, backend: &str, was_running: bool) {
        JOBS_CANCELLED.with_label_values(&[backend]).inc();
        if was_running {
            ACTIVE_JOBS.dec();
        } else {
            QUEUED_JOBS.dec();
        }
    }

    pub fn record_session_created(&self, mode: &str) {
        SESSIONS_CREATED.with_label_values(&[mode]).inc();
        ACTIVE_SESSIONS.inc();
    }

    /// Record `n` sessions leaving the active state.
    pub fn record_sessions_deactivated(&self, n: usize) {
        ACTIVE_SESSIONS.sub(n as f64);
    }

    /// Current metrics in Prometheus text format.
    pub fn export(&self) -> Result<String, std::fmt::Error> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|_| std::fmt::Error)?;

        String::from_utf8(buffer).map_err(|_| std::fmt::Error)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_jobs: ACTIVE_JOBS.get().max(0.0) as u64,
            queued_jobs: QUEUED_JOBS.get().max(0.0) as u64,
            active_sessions: ACTIVE_SESSIONS.get().max(0.0) as u64,
        }
    }
}

/// Snapshot of current gauge values.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub active_jobs: u64,
    pub queued_jobs: u64,
    pub active_sessions: u64,
}
