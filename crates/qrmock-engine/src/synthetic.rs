//! Deterministic synthetic primitive engine.
//!
//! [`SyntheticEngine`] does not simulate circuits. It produces results with
//! the right shape and plausible statistics:
//!
//! - **sampler**: each shot starts from the all-zeros or all-ones outcome
//!   (GHZ-like) and every bit is flipped with the device's median readout
//!   error.
//! - **estimator**: each non-identity Pauli term gets a pseudo-random
//!   expectation value in `[-1, 1]`, damped by readout error per
//!   non-identity factor; identity terms contribute exactly their
//!   coefficient.
//!
//! All randomness is seeded from the engine seed, the circuit text and the
//! parameter values, so identical submissions return identical results.

use std::collections::BTreeMap;
use std::hash::Hasher;
use std::time::Duration;

use async_trait::async_trait;
use qrmock_catalog::Device;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHasher;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::engine::{ComputeEngine, ExecutionRequest};
use crate::error::{EngineError, EngineResult};
use crate::params::{Circuit, DecodedParams, EstimatorPub, SamplerPub};
use crate::program::ProgramId;
use crate::result::{PrimitiveResult, PubData, PubResult};

type Strategy = fn(u64, &Device, DecodedParams) -> EngineResult<Vec<PubResult>>;

/// Select the execution strategy for a program kind.
fn strategy(program: ProgramId) -> Strategy {
    match program {
        ProgramId::Sampler => run_sampler,
        ProgramId::Estimator => run_estimator,
    }
}

/// Default compute engine.
#[derive(Debug, Clone, Default)]
pub struct SyntheticEngine {
    latency: Duration,
    seed: u64,
}

impl SyntheticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before producing each result.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Mix a fixed seed into every result.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[async_trait]
impl ComputeEngine for SyntheticEngine {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn execute(&self, request: ExecutionRequest) -> EngineResult<PrimitiveResult> {
        let ExecutionRequest {
            program,
            device,
            params,
            ..
        } = request;

        if params.program() != program {
            return Err(EngineError::Execution(format!(
                "{program} job carries {} inputs",
                params.program()
            )));
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let seed = self.seed;
        let device_name = device.name.clone();
        let num_pubs = params.len();
        let run = strategy(program);

        // Sampling is CPU-bound for large shot counts.
        let results = tokio::task::spawn_blocking(move || run(seed, &device, params))
            .await
            .map_err(|e| EngineError::Execution(format!("synthetic execution task failed: {e}")))??;

        debug!(%program, device = %device_name, pubs = num_pubs, "Synthetic execution finished");

        let mut metadata = Map::new();
        metadata.insert("version".to_string(), json!(2));
        metadata.insert("engine".to_string(), json!(self.name()));
        metadata.insert("backend".to_string(), json!(device_name));
        Ok(PrimitiveResult { results, metadata })
    }
}

fn seed_for(base: u64, circuit: &Circuit, parameter_values: &[f64], extra: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u64(base);
    hasher.write(circuit.qasm.as_bytes());
    for value in parameter_values {
        hasher.write_u64(value.to_bits());
    }
    hasher.write(extra.as_bytes());
    hasher.finish()
}

/// Classical bits a device records per qubit, mid-circuit measurements included.
const CLBITS_PER_QUBIT: u32 = 4;

fn check_width(device: &Device, circuit: &Circuit) -> EngineResult<()> {
    if circuit.num_qubits > device.num_qubits {
        return Err(EngineError::CircuitTooLarge {
            device: device.name.clone(),
            required: circuit.num_qubits,
            available: device.num_qubits,
        });
    }
    let max_clbits = device.num_qubits.saturating_mul(CLBITS_PER_QUBIT);
    if circuit.num_clbits > max_clbits {
        return Err(EngineError::TooManyClbits {
            device: device.name.clone(),
            required: circuit.num_clbits,
            available: max_clbits,
        });
    }
    Ok(())
}

fn run_sampler(seed: u64, device: &Device, params: DecodedParams) -> EngineResult<Vec<PubResult>> {
    let DecodedParams::Sampler(pubs) = params else {
        return Err(EngineError::Execution("expected sampler inputs".to_string()));
    };
    pubs.into_iter()
        .map(|pub_| sample_pub(seed, device, pub_))
        .collect()
}

fn sample_pub(seed: u64, device: &Device, pub_: SamplerPub) -> EngineResult<PubResult> {
    check_width(device, &pub_.circuit)?;
    if pub_.shots == 0 || pub_.shots > device.max_shots {
        return Err(EngineError::InvalidShots {
            shots: pub_.shots,
            max: device.max_shots,
        });
    }

    let width = pub_.circuit.num_clbits as usize;
    let flip = device.readout_error().clamp(0.0, 0.5);
    let mut rng = StdRng::seed_from_u64(seed_for(
        seed,
        &pub_.circuit,
        &pub_.parameter_values,
        &pub_.shots.to_string(),
    ));

    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut bitstrings = Vec::with_capacity(pub_.shots as usize);
    for _ in 0..pub_.shots {
        let base = rng.gen_bool(0.5);
        let bits: String = (0..width)
            .map(|_| {
                let bit = base ^ (flip > 0.0 && rng.gen_bool(flip));
                if bit { '1' } else { '0' }
            })
            .collect();
        *counts.entry(bits.clone()).or_default() += 1;
        bitstrings.push(bits);
    }

    let mut metadata = Map::new();
    metadata.insert("shots".to_string(), json!(pub_.shots));
    metadata.insert("num_qubits".to_string(), json!(pub_.circuit.num_qubits));
    metadata.insert("circuit_metadata".to_string(), Value::Object(Map::new()));
    Ok(PubResult {
        data: PubData::sampled(counts, bitstrings),
        metadata,
    })
}

fn run_estimator(
    seed: u64,
    device: &Device,
    params: DecodedParams,
) -> EngineResult<Vec<PubResult>> {
    let DecodedParams::Estimator(pubs) = params else {
        return Err(EngineError::Execution("expected estimator inputs".to_string()));
    };
    pubs.into_iter()
        .map(|pub_| estimate_pub(seed, device, pub_))
        .collect()
}

fn estimate_pub(seed: u64, device: &Device, pub_: EstimatorPub) -> EngineResult<PubResult> {
    check_width(device, &pub_.circuit)?;
    let fidelity = 1.0 - 2.0 * device.readout_error().clamp(0.0, 0.5);

    let expectation_values: Vec<f64> = pub_
        .observables
        .iter()
        .map(|observable| {
            observable
                .terms
                .iter()
                .map(|(pauli, coeff)| {
                    let weight = pauli.chars().filter(|c| *c != 'I').count();
                    if weight == 0 {
                        return *coeff;
                    }
                    let mut rng = StdRng::seed_from_u64(seed_for(
                        seed,
                        &pub_.circuit,
                        &pub_.parameter_values,
                        pauli,
                    ));
                    let ideal: f64 = rng.gen_range(-1.0..=1.0);
                    coeff * ideal * fidelity.powi(weight as i32)
                })
                .sum()
        })
        .collect();
    let standard_errors = vec![pub_.precision; expectation_values.len()];

    let shots = (1.0 / (pub_.precision * pub_.precision)).ceil();
    let mut metadata = Map::new();
    metadata.insert("target_precision".to_string(), json!(pub_.precision));
    metadata.insert("shots".to_string(), json!(shots as u64));
    metadata.insert("circuit_metadata".to_string(), Value::Object(Map::new()));
    Ok(PubResult {
        data: PubData::estimated(expectation_values, standard_errors),
        metadata,
    })
}
