//! Compute engine boundary.
//!
//! The job engine hands every decoded job to a [`ComputeEngine`]. The trait is
//! the only seam between job lifecycle management and the numbers a job
//! produces, so tests can plug in engines that block, sleep or panic.
//!
//! | Method | Kind | Returns |
//! |--------|------|---------|
//! | `name()` | sync | `&str` |
//! | `execute()` | async | `EngineResult<PrimitiveResult>` |

use std::sync::Arc;

use async_trait::async_trait;
use qrmock_catalog::Device;
use serde_json::Value;

use crate::error::EngineResult;
use crate::params::DecodedParams;
use crate::program::ProgramId;
use crate::result::PrimitiveResult;

/// Everything an engine needs to run one job.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub program: ProgramId,
    pub device: Arc<Device>,
    pub params: DecodedParams,
    /// Runtime options as submitted with the job.
    pub options: Value,
}

/// A component that executes primitive programs.
///
/// Implementations must be `Send + Sync`; one instance is shared by all
/// concurrently running jobs.
#[async_trait]
pub trait ComputeEngine: Send + Sync {
    /// Short identifier used in logs and result metadata.
    fn name(&self) -> &str;

    /// Run the program and return its structured result.
    async fn execute(&self, request: ExecutionRequest) -> EngineResult<PrimitiveResult>;
}
