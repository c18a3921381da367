//! Compute engines with controllable timing for lifecycle tests.
//!
//! None of these look at the circuits; they only shape when and how a job
//! finishes.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use qrmock_engine::{ComputeEngine, EngineResult, ExecutionRequest, PrimitiveResult};
use serde_json::{Map, Value};

fn empty_result(engine: &str) -> PrimitiveResult {
    let mut metadata = Map::new();
    metadata.insert("engine".to_string(), Value::String(engine.to_string()));
    PrimitiveResult {
        results: Vec::new(),
        metadata,
    }
}

/// Sleeps for a fixed time and tracks how many executions overlap.
#[derive(Debug, Default)]
pub struct SleepyEngine {
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
    finished: AtomicUsize,
}

impl SleepyEngine {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Highest number of executions observed in flight at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComputeEngine for SleepyEngine {
    fn name(&self) -> &str {
        "sleepy"
    }

    async fn execute(&self, _request: ExecutionRequest) -> EngineResult<PrimitiveResult> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(empty_result("sleepy"))
    }
}

/// Never finishes.
#[derive(Debug, Default)]
pub struct StalledEngine;

#[async_trait]
impl ComputeEngine for StalledEngine {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn execute(&self, _request: ExecutionRequest) -> EngineResult<PrimitiveResult> {
        futures::future::pending().await
    }
}

/// Panics on every execution.
#[derive(Debug, Default)]
pub struct PanickingEngine;

#[async_trait]
impl ComputeEngine for PanickingEngine {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn execute(&self, _request: ExecutionRequest) -> EngineResult<PrimitiveResult> {
        panic!("qubit array out of range");
    }
}
