//! Job and session lifecycle tests against the in-process engine.

mod fake_engines;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use qrmock_catalog::DeviceCatalog;
use qrmock_engine::{ComputeEngine, SyntheticEngine};
use qrmock_server::{
    Error, ExecutionLimits, JobEngine, JobFilter, JobSnapshot, JobStatus, NewJob, SessionRegistry,
};
use serde_json::{Value, json};

use fake_engines::{PanickingEngine, SleepyEngine, StalledEngine};

const BELL: &str = "OPENQASM 3.0;\nqubit[2] q;\nbit[2] c;\nh q[0];\ncx q[0], q[1];\nc = measure q;\n";

fn sampler_params() -> Value {
    json!({"pubs": [[BELL, null, 128]], "version": 2})
}

fn setup(compute: Arc<dyn ComputeEngine>) -> (JobEngine, Arc<SessionRegistry>) {
    setup_with_limits(compute, ExecutionLimits::unbounded())
}

fn setup_with_limits(
    compute: Arc<dyn ComputeEngine>,
    limits: ExecutionLimits,
) -> (JobEngine, Arc<SessionRegistry>) {
    let sessions = Arc::new(SessionRegistry::new());
    let jobs = JobEngine::with_limits(
        Arc::new(DeviceCatalog::builtin()),
        Arc::clone(&sessions),
        compute,
        limits,
    );
    (jobs, sessions)
}

fn submit(jobs: &JobEngine, device: &str) -> String {
    jobs.create_job(NewJob::new("sampler", device, sampler_params()))
        .unwrap()
}

fn submit_in(jobs: &JobEngine, device: &str, session_id: &str) -> String {
    jobs.create_job(NewJob::new("sampler", device, sampler_params()).in_session(session_id))
        .unwrap()
}

fn status(jobs: &JobEngine, job_id: &str) -> JobStatus {
    jobs.get_job_status(job_id).unwrap().status
}

async fn wait_terminal(jobs: &JobEngine, job_id: &str) -> JobSnapshot {
    for _ in 0..2000 {
        let snapshot = jobs.get_job_status(job_id).unwrap();
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}

fn rank(status: JobStatus) -> u8 {
    match status {
        JobStatus::Queued => 0,
        JobStatus::Running => 1,
        _ => 2,
    }
}

// ============================================================================
// Creation and completion
// ============================================================================

#[tokio::test]
async fn test_create_returns_before_execution() {
    let (jobs, _) = setup(Arc::new(StalledEngine));

    let job_id = submit(&jobs, "fake_manila");
    let snapshot = jobs.get_job_status(&job_id).unwrap();

    assert!(job_id.starts_with("job-"));
    assert!(!snapshot.status.is_terminal());
    assert_eq!(snapshot.device_name, "fake_manila");
    assert_eq!(snapshot.session_id, job_id);
}

#[tokio::test]
async fn test_synthetic_job_completes_with_result() {
    let (jobs, _) = setup(Arc::new(SyntheticEngine::new().with_seed(7)));

    let job_id = submit(&jobs, "fake_lima");
    let snapshot = wait_terminal(&jobs, &job_id).await;
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert!(snapshot.reason.is_none());
    assert!(snapshot.started_at.is_some());
    assert!(snapshot.finished_at >= snapshot.started_at);

    let result = jobs.get_job_result(&job_id).unwrap();
    assert_eq!(result.results.len(), 1);
    assert_eq!(result.results[0].data.total_shots(), 128);
}

#[tokio::test]
async fn test_cancel_completed_job_keeps_result() {
    let (jobs, _) = setup(Arc::new(SyntheticEngine::new()));

    let job_id = submit(&jobs, "fake_lima");
    wait_terminal(&jobs, &job_id).await;

    assert!(!jobs.cancel_job(&job_id));
    assert_eq!(status(&jobs, &job_id), JobStatus::Completed);
    assert!(jobs.get_job_result(&job_id).is_ok());
}

#[tokio::test]
async fn test_result_unavailable_until_completed() {
    let (jobs, _) = setup(Arc::new(StalledEngine));

    let job_id = submit(&jobs, "fake_lima");
    let err = jobs.get_job_result(&job_id).unwrap_err();
    assert!(matches!(err, Error::JobNotCompleted { .. }));

    assert!(matches!(
        jobs.get_job_result("job-missing"),
        Err(Error::JobNotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_status_never_moves_backwards() {
    let engine = Arc::new(SleepyEngine::new(Duration::from_millis(50)));
    let (jobs, _) = setup(engine);

    let job_id = submit(&jobs, "fake_quito");
    let mut seen = vec![status(&jobs, &job_id)];
    while !seen.last().is_some_and(|s| s.is_terminal()) {
        tokio::time::sleep(Duration::from_millis(5)).await;
        seen.push(status(&jobs, &job_id));
    }

    assert!(seen.windows(2).all(|w| rank(w[0]) <= rank(w[1])));
    assert!(seen.contains(&JobStatus::Running));
    assert_eq!(seen.last(), Some(&JobStatus::Completed));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_engine_panic_marks_job_failed() {
    let (jobs, _) = setup(Arc::new(PanickingEngine));

    let job_id = submit(&jobs, "fake_belem");
    let snapshot = wait_terminal(&jobs, &job_id).await;

    assert_eq!(snapshot.status, JobStatus::Failed);
    let reason = snapshot.reason.unwrap();
    assert!(reason.contains("qubit array out of range"), "{reason}");

    // The engine keeps serving after a panic.
    let second = submit(&jobs, "fake_belem");
    assert_eq!(wait_terminal(&jobs, &second).await.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_unknown_device_stores_nothing() {
    let (jobs, _) = setup(Arc::new(SyntheticEngine::new()));

    let err = jobs
        .create_job(NewJob::new("sampler", "ghost", sampler_params()))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownDevice(ref name) if name == "ghost"));
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn test_unsupported_program_stores_nothing() {
    let (jobs, _) = setup(Arc::new(SyntheticEngine::new()));

    let err = jobs
        .create_job(NewJob::new("qaoa", "fake_lima", sampler_params()))
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedProgram(_)));
    assert_eq!(jobs.len(), 0);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_failed_jobs_paginates_newest_first() {
    let (jobs, _) = setup(Arc::new(SyntheticEngine::new()));

    let mut failed = HashSet::new();
    for _ in 0..3 {
        let id = jobs
            .create_job(NewJob::new("sampler", "fake_nairobi", json!({"pubs": []})))
            .unwrap();
        failed.insert(id);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let completed = submit(&jobs, "fake_nairobi");
    for id in failed.iter().chain(std::iter::once(&completed)) {
        wait_terminal(&jobs, id).await;
    }

    let page = |skip| {
        jobs.list_jobs(&JobFilter {
            limit: 2,
            skip,
            state: Some(JobStatus::Failed),
            ..JobFilter::default()
        })
    };
    let first = page(0);
    let second = page(2);
    assert_eq!(first.count, 2);
    assert_eq!(second.count, 1);

    let listed: Vec<&JobSnapshot> = first.jobs.iter().chain(&second.jobs).collect();
    assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    let ids: HashSet<String> = listed.iter().map(|j| j.id.clone()).collect();
    assert_eq!(ids, failed);
}

#[tokio::test]
async fn test_list_filters_by_backend() {
    let (jobs, _) = setup(Arc::new(StalledEngine));

    submit(&jobs, "fake_lima");
    submit(&jobs, "fake_lima");
    submit(&jobs, "fake_manila");

    let page = jobs.list_jobs(&JobFilter {
        device_name: Some("fake_lima".to_string()),
        ..JobFilter::default()
    });
    assert_eq!(page.count, 2);
    assert!(page.jobs.iter().all(|j| j.device_name == "fake_lima"));
    assert_eq!(jobs.pending_jobs("fake_manila"), 1);
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_device_mismatch_leaves_session_untouched() {
    let (jobs, sessions) = setup(Arc::new(SyntheticEngine::new()));
    let session_id = sessions
        .create_session("batch", "fake_lima", None, None)
        .unwrap();

    let err = jobs
        .create_job(NewJob::new("sampler", "fake_manila", sampler_params()).in_session(&session_id))
        .unwrap_err();
    assert!(matches!(err, Error::DeviceMismatch { .. }));
    assert_eq!(sessions.session_jobs(&session_id), Some(Vec::new()));
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn test_unknown_session_rejects_job() {
    let (jobs, _) = setup(Arc::new(SyntheticEngine::new()));

    let err = jobs
        .create_job(NewJob::new("sampler", "fake_lima", sampler_params()).in_session("session-nope"))
        .unwrap_err();
    assert!(matches!(err, Error::SessionNotFound(_)));
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn test_closed_session_rejects_new_jobs() {
    let (jobs, sessions) = setup(Arc::new(SyntheticEngine::new()));
    let session_id = sessions
        .create_session("batch", "fake_lima", None, None)
        .unwrap();
    let first = submit_in(&jobs, "fake_lima", &session_id);

    assert!(sessions.close_session(&session_id, false));
    let err = jobs
        .create_job(NewJob::new("sampler", "fake_lima", sampler_params()).in_session(&session_id))
        .unwrap_err();
    assert!(matches!(err, Error::SessionClosed(_)));

    // Jobs admitted before closing still run.
    assert_eq!(wait_terminal(&jobs, &first).await.status, JobStatus::Completed);
    assert_eq!(sessions.session_jobs(&session_id), Some(vec![first]));
}

#[tokio::test(start_paused = true)]
async fn test_batch_session_runs_jobs_concurrently() {
    let engine = Arc::new(SleepyEngine::new(Duration::from_millis(100)));
    let (jobs, sessions) = setup(engine.clone());
    let session_id = sessions
        .create_session("batch", "fake_jakarta", None, None)
        .unwrap();

    let a = submit_in(&jobs, "fake_jakarta", &session_id);
    let b = submit_in(&jobs, "fake_jakarta", &session_id);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(status(&jobs, &a), JobStatus::Running);
    assert_eq!(status(&jobs, &b), JobStatus::Running);

    wait_terminal(&jobs, &a).await;
    wait_terminal(&jobs, &b).await;
    assert_eq!(engine.peak(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dedicated_session_runs_jobs_in_order() {
    let engine = Arc::new(SleepyEngine::new(Duration::from_millis(100)));
    let (jobs, sessions) = setup(engine.clone());
    let session_id = sessions
        .create_session("dedicated", "fake_jakarta", None, None)
        .unwrap();

    let ids: Vec<String> = (0..3)
        .map(|_| submit_in(&jobs, "fake_jakarta", &session_id))
        .collect();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(status(&jobs, &ids[0]), JobStatus::Running);
    assert_eq!(status(&jobs, &ids[1]), JobStatus::Queued);
    assert_eq!(status(&jobs, &ids[2]), JobStatus::Queued);

    let snapshots = [
        wait_terminal(&jobs, &ids[0]).await,
        wait_terminal(&jobs, &ids[1]).await,
        wait_terminal(&jobs, &ids[2]).await,
    ];
    assert_eq!(engine.peak(), 1);
    assert!(snapshots.windows(2).all(|w| w[0].finished_at <= w[1].started_at));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_waiting_job_does_not_block_lane() {
    let engine = Arc::new(SleepyEngine::new(Duration::from_millis(100)));
    let (jobs, sessions) = setup(engine.clone());
    let session_id = sessions
        .create_session("dedicated", "fake_lima", None, None)
        .unwrap();

    let first = submit_in(&jobs, "fake_lima", &session_id);
    let second = submit_in(&jobs, "fake_lima", &session_id);
    let third = submit_in(&jobs, "fake_lima", &session_id);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(jobs.cancel_job(&second));

    assert_eq!(wait_terminal(&jobs, &first).await.status, JobStatus::Completed);
    assert_eq!(wait_terminal(&jobs, &third).await.status, JobStatus::Completed);
    assert_eq!(status(&jobs, &second), JobStatus::Cancelled);
    assert_eq!(engine.finished(), 2);
}

#[tokio::test]
async fn test_cancel_session_cascades_to_unfinished_jobs() {
    let (jobs, sessions) = setup(Arc::new(StalledEngine));
    let session_id = sessions
        .create_session("dedicated", "fake_manila", None, None)
        .unwrap();
    let a = submit_in(&jobs, "fake_manila", &session_id);
    let b = submit_in(&jobs, "fake_manila", &session_id);
    let outside = submit(&jobs, "fake_manila");

    assert!(jobs.cancel_session(&session_id));
    assert_eq!(status(&jobs, &a), JobStatus::Cancelled);
    assert_eq!(status(&jobs, &b), JobStatus::Cancelled);
    assert!(!status(&jobs, &outside).is_terminal());

    let session = sessions.get_session(&session_id).unwrap();
    assert!(!session.active);
    assert!(!session.accepting_jobs);
    assert!(!jobs.cancel_session("session-missing"));
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_expires_sessions() {
    let (_jobs, sessions) = setup(Arc::new(SyntheticEngine::new()));
    let sweep = sessions.spawn_expiry_sweep(Duration::from_secs(1));

    let short = sessions
        .create_session("batch", "fake_lima", None, Some(1))
        .unwrap();
    sessions
        .create_session("batch", "fake_lima", None, Some(3600))
        .unwrap();
    assert_eq!(sessions.active_count(), 2);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(sessions.active_count(), 1);
    assert!(!sessions.is_accepting_jobs(&short));

    sweep.shutdown();
}

// ============================================================================
// Capacity
// ============================================================================

#[tokio::test]
async fn test_saturated_engine_rejects_jobs() {
    let limits = ExecutionLimits {
        max_concurrent_jobs: Some(1),
        max_queued_jobs: Some(1),
    };
    let (jobs, _) = setup_with_limits(Arc::new(StalledEngine), limits);

    let first = submit(&jobs, "fake_lima");
    submit(&jobs, "fake_lima");
    let err = jobs
        .create_job(NewJob::new("sampler", "fake_lima", sampler_params()))
        .unwrap_err();
    assert!(matches!(err, Error::Saturated { limit: 2 }));
    assert!(err.is_retryable());
    assert_eq!(jobs.len(), 2);

    assert!(jobs.cancel_job(&first));
    assert!(jobs
        .create_job(NewJob::new("sampler", "fake_lima", sampler_params()))
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_limit_holds_jobs_queued() {
    let engine = Arc::new(SleepyEngine::new(Duration::from_millis(50)));
    let limits = ExecutionLimits {
        max_concurrent_jobs: Some(2),
        max_queued_jobs: None,
    };
    let (jobs, _) = setup_with_limits(engine.clone(), limits);

    let ids: Vec<String> = (0..5).map(|_| submit(&jobs, "fake_guadalupe")).collect();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let running = ids
        .iter()
        .filter(|id| status(&jobs, id) == JobStatus::Running)
        .count();
    assert_eq!(running, 2);

    for id in &ids {
        assert_eq!(wait_terminal(&jobs, id).await.status, JobStatus::Completed);
    }
    assert_eq!(engine.peak(), 2);
}
