//! REST documents rendered from device descriptors.
//!
//! Field names follow the runtime backend API wire format, so these types
//! serialize directly into response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::ProcessorType;

/// Entry of the `/v1/backends` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub backend_name: String,
    pub backend_version: String,
    pub operational: bool,
    pub simulator: bool,
    pub n_qubits: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_type: Option<ProcessorType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantum_volume: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clops_h: Option<u32>,
    /// Present only when the `wait_time_seconds` field is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_time_seconds: Option<f64>,
}

/// Per-gate entry of the configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub name: String,
    pub parameters: Vec<String>,
    pub qasm_def: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupling_map: Option<Vec<Vec<u32>>>,
}

/// Static configuration document of a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfiguration {
    pub backend_name: String,
    pub backend_version: String,
    pub n_qubits: u32,
    pub basis_gates: Vec<String>,
    pub gates: Vec<GateConfig>,
    pub local: bool,
    pub simulator: bool,
    pub conditional: bool,
    pub open_pulse: bool,
    pub memory: bool,
    pub max_shots: u32,
    pub max_experiments: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupling_map: Option<Vec<[u32; 2]>>,
    pub supported_instructions: Vec<String>,
    pub meas_map: Vec<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_type: Option<ProcessorType>,
    /// Sample time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantum_volume: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clops_h: Option<u32>,
    pub supported_features: Vec<String>,
    pub online_date: DateTime<Utc>,
    pub credits_required: bool,
    pub description: String,
}

/// Name/date/unit/value calibration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nduv {
    pub date: DateTime<Utc>,
    pub name: String,
    pub unit: String,
    pub value: f64,
}

/// Calibration of one gate on a specific qubit tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateProperties {
    pub qubits: Vec<u32>,
    pub gate: String,
    pub parameters: Vec<Nduv>,
}

/// Calibration document of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProperties {
    pub backend_name: String,
    pub backend_version: String,
    pub last_update_date: DateTime<Utc>,
    pub qubits: Vec<Vec<Nduv>>,
    pub gates: Vec<GateProperties>,
    pub general: Vec<Nduv>,
}

impl DeviceProperties {
    /// Look up a per-qubit calibration value by name.
    pub fn qubit_property(&self, qubit: usize, name: &str) -> Option<f64> {
        self.qubits
            .get(qubit)?
            .iter()
            .find(|nduv| nduv.name == name)
            .map(|nduv| nduv.value)
    }
}

/// Operational status document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub backend_name: String,
    pub backend_version: String,
    pub operational: bool,
    pub status_msg: String,
    pub pending_jobs: usize,
}

/// Pulse defaults document.
///
/// No built-in device supports pulse-level control, so the catalog never
/// produces one; the type exists so the endpoint has a well-formed body once
/// a pulse-capable device is added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDefaults {
    pub qubit_freq_est: Vec<f64>,
    pub meas_freq_est: Vec<f64>,
    pub buffer: u32,
}
