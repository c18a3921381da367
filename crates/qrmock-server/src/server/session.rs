//! Session records and sequential execution lanes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::Error;

/// Declared execution mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    /// One job at a time, in submission order.
    #[serde(rename = "dedicated", alias = "sequential")]
    Sequential,
    /// Jobs run concurrently.
    #[serde(rename = "batch", alias = "parallel")]
    Parallel,
}

impl SessionMode {
    /// Name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Sequential => "dedicated",
            SessionMode::Parallel => "batch",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dedicated" | "sequential" => Ok(SessionMode::Sequential),
            "batch" | "parallel" => Ok(SessionMode::Parallel),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

/// A session as stored by the registry.
#[derive(Debug)]
pub(crate) struct SessionRecord {
    pub id: String,
    pub mode: SessionMode,
    pub device_name: String,
    pub instance: Option<String>,
    pub max_ttl: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub started: Instant,
    pub accepting_jobs: bool,
    pub active: bool,
    pub job_ids: Vec<String>,
    /// Completion signal of the most recently admitted job (sequential only).
    pub lane_tail: Option<oneshot::Receiver<()>>,
}

impl SessionRecord {
    pub fn new(
        id: String,
        mode: SessionMode,
        device_name: String,
        instance: Option<String>,
        max_ttl: Option<u64>,
    ) -> Self {
        Self {
            id,
            mode,
            device_name,
            instance,
            max_ttl,
            created_at: Utc::now(),
            started: Instant::now(),
            accepting_jobs: true,
            active: true,
            job_ids: Vec::new(),
            lane_tail: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.max_ttl
            .is_some_and(|ttl| self.elapsed() >= Duration::from_secs(ttl))
    }

    /// Force the session inactive if its TTL has elapsed.
    ///
    /// Returns true when this call deactivated a previously active session.
    pub fn expire_if_due(&mut self) -> bool {
        if !self.is_expired() {
            return false;
        }
        self.accepting_jobs = false;
        self.deactivate()
    }

    /// Mark inactive and non-accepting. Returns true if it was active.
    pub fn deactivate(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        self.accepting_jobs = false;
        self.lane_tail = None;
        was_active
    }

    pub fn accepts_jobs(&self) -> bool {
        self.active && self.accepting_jobs
    }

    /// Append a job id unless already present.
    pub fn push_job(&mut self, job_id: &str) -> bool {
        if self.job_ids.iter().any(|id| id == job_id) {
            return false;
        }
        self.job_ids.push(job_id.to_string());
        true
    }

    /// Chain a new lane ticket behind the previous job.
    pub fn next_ticket(&mut self) -> LaneTicket {
        let (done, tail) = oneshot::channel();
        let previous = self.lane_tail.replace(tail);
        LaneTicket {
            previous,
            done: Some(done),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let elapsed = self.elapsed().as_secs();
        SessionSnapshot {
            id: self.id.clone(),
            mode: self.mode,
            device_name: self.device_name.clone(),
            instance: self.instance.clone(),
            max_ttl: self.max_ttl,
            created_at: self.created_at,
            accepting_jobs: self.accepting_jobs,
            active: self.active,
            elapsed_time: elapsed,
            remaining_time: self.max_ttl.map(|ttl| ttl.saturating_sub(elapsed)),
            job_ids: self.job_ids.clone(),
        }
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub mode: SessionMode,
    pub device_name: String,
    pub instance: Option<String>,
    pub max_ttl: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub accepting_jobs: bool,
    pub active: bool,
    /// Seconds since creation.
    pub elapsed_time: u64,
    /// Seconds until expiry, `None` without a TTL.
    pub remaining_time: Option<u64>,
    pub job_ids: Vec<String>,
}

/// Position of one job in a sequential session's execution lane.
///
/// The job may start once the previous ticket in the lane is released.
/// Dropping a ticket releases it, but never before its own predecessor:
/// a job aborted while waiting hands its place on instead of letting the
/// next job overtake.
#[derive(Debug, Default)]
pub struct LaneTicket {
    previous: Option<oneshot::Receiver<()>>,
    done: Option<oneshot::Sender<()>>,
}

impl LaneTicket {
    /// Wait until the previous job in the lane has finished.
    pub async fn wait_turn(&mut self) {
        if let Some(previous) = self.previous.as_mut() {
            // Senders are dropped, never fired: a closed channel means done.
            let _ = previous.await;
        }
        self.previous = None;
    }

    /// Whether the predecessor is already finished (or there is none).
    #[cfg(test)]
    pub(crate) fn is_ready(&mut self) -> bool {
        let Some(previous) = self.previous.as_mut() else {
            return true;
        };
        if matches!(
            previous.try_recv(),
            Err(oneshot::error::TryRecvError::Empty)
        ) {
            return false;
        }
        self.previous = None;
        true
    }
}

impl Drop for LaneTicket {
    fn drop(&mut self) {
        let (Some(previous), Some(done)) = (self.previous.take(), self.done.take()) else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = previous.await;
                drop(done);
            });
        }
    }
}
