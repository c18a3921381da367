//! Job engine and session registry.

pub mod job;
mod job_execution;
pub mod job_store;
pub mod session;
pub mod session_registry;

pub use job::{JobFilter, JobPage, JobSnapshot, JobStatus, NewJob};
pub use job_store::{ExecutionLimits, JobEngine};
pub use session::{LaneTicket, SessionMode, SessionSnapshot};
pub use session_registry::{DEFAULT_SWEEP_INTERVAL, SessionRegistry, SweepHandle};
