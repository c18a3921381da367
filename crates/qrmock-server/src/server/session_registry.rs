//! Session registry.
//!
//! Sessions group jobs bound to one device. A session stops accepting jobs
//! when closed, cancelled, or once its TTL has elapsed. Expiry is evaluated
//! lazily on every read and periodically by [`SessionRegistry::spawn_expiry_sweep`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, instrument};

use super::session::{LaneTicket, SessionMode, SessionRecord, SessionSnapshot};
use crate::error::{Error, Result};
use crate::metrics::Metrics;

/// Default period of the background expiry sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// In-memory session store.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<FxHashMap<String, SessionRecord>>,
    metrics: Metrics,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<String, SessionRecord>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new session and return its id.
    ///
    /// The device name is stored as given; callers validate it against the
    /// catalog.
    #[instrument(skip(self))]
    pub fn create_session(
        &self,
        mode: &str,
        device_name: &str,
        instance: Option<String>,
        max_ttl: Option<u64>,
    ) -> Result<String> {
        let mode: SessionMode = mode.parse()?;
        let session_id = format!("session-{}", uuid::Uuid::new_v4());
        let record = SessionRecord::new(
            session_id.clone(),
            mode,
            device_name.to_string(),
            instance,
            max_ttl,
        );

        self.lock().insert(session_id.clone(), record);
        self.metrics.record_session_created(mode.as_str());
        info!(session_id = %session_id, %mode, device = device_name, "Session created");

        Ok(session_id)
    }

    /// Snapshot of a session, after applying lazy expiry.
    pub fn get_session(&self, session_id: &str) -> Option<SessionSnapshot> {
        let mut sessions = self.lock();
        let record = sessions.get_mut(session_id)?;
        if record.expire_if_due() {
            self.metrics.record_sessions_deactivated(1);
        }
        Some(record.snapshot())
    }

    /// Whether new jobs may be created against the session.
    ///
    /// False for unknown sessions.
    pub fn is_accepting_jobs(&self, session_id: &str) -> bool {
        let mut sessions = self.lock();
        let Some(record) = sessions.get_mut(session_id) else {
            return false;
        };
        if record.expire_if_due() {
            self.metrics.record_sessions_deactivated(1);
        }
        record.accepts_jobs()
    }

    /// Set `accepting_jobs`; `active` is left untouched.
    ///
    /// Returns false if the session does not exist.
    pub fn close_session(&self, session_id: &str, accepting_jobs: bool) -> bool {
        let mut sessions = self.lock();
        let Some(record) = sessions.get_mut(session_id) else {
            return false;
        };
        record.accepting_jobs = accepting_jobs;
        debug!(session_id, accepting_jobs, "Session acceptance updated");
        true
    }

    /// Deactivate a session. Jobs already in the session are not touched.
    ///
    /// Returns false if the session does not exist.
    pub fn cancel_session(&self, session_id: &str) -> bool {
        let mut sessions = self.lock();
        let Some(record) = sessions.get_mut(session_id) else {
            return false;
        };
        if record.deactivate() {
            self.metrics.record_sessions_deactivated(1);
        }
        info!(session_id, "Session cancelled");
        true
    }

    /// Append a job id to the session, ignoring duplicates.
    ///
    /// Returns false if the session does not exist.
    pub fn add_job_to_session(&self, session_id: &str, job_id: &str) -> bool {
        let mut sessions = self.lock();
        match sessions.get_mut(session_id) {
            Some(record) => {
                record.push_job(job_id);
                true
            }
            None => false,
        }
    }

    /// Check that a job may join the session and register it.
    ///
    /// Checks run in order: the session exists, it accepts jobs (after lazy
    /// expiry), and it is bound to `device_name`. On success the job id is
    /// appended and, for sequential sessions, a lane ticket is returned that
    /// orders the job behind the previously admitted one.
    pub fn admit_job(
        &self,
        session_id: &str,
        device_name: &str,
        job_id: &str,
    ) -> Result<Option<LaneTicket>> {
        let mut sessions = self.lock();
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        if record.expire_if_due() {
            self.metrics.record_sessions_deactivated(1);
        }
        if !record.accepts_jobs() {
            return Err(Error::SessionClosed(session_id.to_string()));
        }
        if record.device_name != device_name {
            return Err(Error::DeviceMismatch {
                session_id: session_id.to_string(),
                session_device: record.device_name.clone(),
                requested: device_name.to_string(),
            });
        }

        record.push_job(job_id);
        Ok(match record.mode {
            SessionMode::Sequential => Some(record.next_ticket()),
            SessionMode::Parallel => None,
        })
    }

    /// Job ids registered under a session, in insertion order.
    pub fn session_jobs(&self, session_id: &str) -> Option<Vec<String>> {
        self.lock().get(session_id).map(|r| r.job_ids.clone())
    }

    /// Deactivate every session whose TTL has elapsed.
    ///
    /// Returns the number of sessions deactivated by this call.
    pub fn sweep_expired(&self) -> usize {
        let mut sessions = self.lock();
        let expired = sessions
            .values_mut()
            .map(SessionRecord::expire_if_due)
            .filter(|&expired| expired)
            .count();
        if expired > 0 {
            self.metrics.record_sessions_deactivated(expired);
        }
        expired
    }

    /// Number of sessions currently marked active.
    ///
    /// Reads stored state only; no lazy expiry is applied.
    pub fn active_count(&self) -> usize {
        self.lock().values().filter(|r| r.active).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start the periodic expiry sweep.
    ///
    /// The task holds a weak reference and exits once the registry is
    /// dropped. Dropping the returned handle stops it as well.
    pub fn spawn_expiry_sweep(self: &Arc<Self>, every: Duration) -> SweepHandle {
        let registry = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    debug!("Session registry dropped, stopping expiry sweep");
                    break;
                };
                let expired = registry.sweep_expired();
                if expired > 0 {
                    info!(expired, "Expired sessions deactivated");
                }
            }
        });
        SweepHandle { task }
    }
}

/// Handle to the background expiry sweep.
#[derive(Debug)]
pub struct SweepHandle {
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stop the sweep.
    pub fn shutdown(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
