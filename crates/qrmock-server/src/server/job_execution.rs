//! Per-job execution unit.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use qrmock_catalog::Device;
use qrmock_engine::{
    ComputeEngine, EngineResult, ExecutionRequest, PrimitiveResult, ProgramId, decode_params,
};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::job_store::JobEngine;
use super::session::LaneTicket;

/// Everything one spawned job task needs, moved into the task at creation.
pub(super) struct ExecutionUnit {
    pub job_id: String,
    pub program: ProgramId,
    pub device: Arc<Device>,
    pub params: Value,
    pub options: Value,
    /// Present for jobs in a sequential session.
    pub lane: Option<LaneTicket>,
}

impl ExecutionUnit {
    /// Drive the job from QUEUED to a terminal state.
    ///
    /// Holds the lane ticket until the terminal write so the next job of a
    /// sequential session cannot start early. A job cancelled while queued
    /// never reaches the engine.
    #[instrument(skip_all, fields(job_id = %self.job_id, program = %self.program))]
    pub(super) async fn run(mut self, jobs: JobEngine) {
        if let Some(lane) = self.lane.as_mut() {
            lane.wait_turn().await;
        }

        let _permit = match jobs.permits() {
            Some(permits) => permits.acquire_owned().await.ok(),
            None => None,
        };

        if !jobs.mark_running(&self.job_id) {
            debug!("Job left QUEUED before it started, skipping execution");
            return;
        }

        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.execute(jobs.compute()))
            .catch_unwind()
            .await;
        let outcome = match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic) => Err(format!("engine panicked: {}", panic_message(&*panic))),
        };

        jobs.finish(&self.job_id, outcome, started.elapsed());
    }

    async fn execute(&self, compute: &dyn ComputeEngine) -> EngineResult<PrimitiveResult> {
        let params = decode_params(self.program, &self.params)?;
        compute
            .execute(ExecutionRequest {
                program: self.program,
                device: Arc::clone(&self.device),
                params,
                options: self.options.clone(),
            })
            .await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }
}
