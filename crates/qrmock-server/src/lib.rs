//! Mock quantum runtime REST server.
//!
//! Emulates the job and session lifecycle of a cloud quantum runtime for
//! local SDK integration tests. All state lives in memory for the lifetime
//! of the process.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  rest::rest_router          (axum, header checks, JSON)      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  server::JobEngine          one Tokio task per job           │
//! │  server::SessionRegistry    TTL, acceptance, sequential lane │
//! ├──────────────────────────────────────────────────────────────┤
//! │  qrmock_catalog::DeviceCatalog   qrmock_engine::ComputeEngine │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use qrmock_catalog::DeviceCatalog;
//! use qrmock_engine::SyntheticEngine;
//! use qrmock_server::rest::{AppState, auth::AuthState, rest_router};
//! use qrmock_server::server::{JobEngine, SessionRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sessions = Arc::new(SessionRegistry::new());
//!     let jobs = JobEngine::new(
//!         Arc::new(DeviceCatalog::builtin()),
//!         Arc::clone(&sessions),
//!         Arc::new(SyntheticEngine::new()),
//!     );
//!     let _sweep = sessions.spawn_expiry_sweep(std::time::Duration::from_secs(10));
//!
//!     let app = rest_router(AppState::new(jobs, AuthState::default()), &["*".to_string()]);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod rest;
pub mod server;
pub mod tracing_config;

pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use health::{HealthState, create_health_router, init_start_time};
pub use metrics::Metrics;
pub use server::{
    ExecutionLimits, JobEngine, JobFilter, JobSnapshot, JobStatus, NewJob, SessionMode,
    SessionRegistry, SessionSnapshot,
};
pub use tracing_config::{TracingConfig, TracingFormat, init_default_tracing, init_tracing};
