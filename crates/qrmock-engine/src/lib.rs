//! Compute engine boundary for the qrmock runtime server.
//!
//! This crate owns everything between an opaque job payload and a primitive
//! result:
//!
//! - [`ProgramId`]: the closed set of supported primitives.
//! - [`decode_params`]: turns raw JSON parameters into typed PUBs.
//! - [`ComputeEngine`]: the async trait the job engine executes against.
//! - [`SyntheticEngine`]: the default, deterministic engine.
//!
//! # Example
//!
//! ```
//! use qrmock_catalog::DeviceCatalog;
//! use qrmock_engine::{ComputeEngine, ExecutionRequest, ProgramId, SyntheticEngine, decode_params};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), qrmock_engine::EngineError> {
//! let qasm = "OPENQASM 2.0;\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0],q[1];\nmeasure q -> c;";
//! let params = json!({"pubs": [[qasm, null, 100]]});
//! let request = ExecutionRequest {
//!     program: ProgramId::Sampler,
//!     device: DeviceCatalog::builtin().resolve("fake_manila").unwrap(),
//!     params: decode_params(ProgramId::Sampler, &params)?,
//!     options: json!({}),
//! };
//! let result = SyntheticEngine::new().execute(request).await?;
//! assert_eq!(result.results[0].data.total_shots(), 100);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod params;
pub mod program;
pub mod result;
pub mod synthetic;

pub use engine::{ComputeEngine, ExecutionRequest};
pub use error::{EngineError, EngineResult};
pub use params::{
    Circuit, DEFAULT_PRECISION, DEFAULT_SHOTS, DecodedParams, EstimatorPub, MAX_REGISTER_WIDTH,
    Observable, SamplerPub, decode_params,
};
pub use program::ProgramId;
pub use result::{PrimitiveResult, PubData, PubResult};
pub use synthetic::SyntheticEngine;
