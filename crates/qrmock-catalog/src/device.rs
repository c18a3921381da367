//! Device descriptors.
//!
//! A [`Device`] is the handle the job engine passes to the compute engine:
//! it carries everything needed to shape a synthetic result (qubit count,
//! connectivity, median noise figures, shot limits).

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::topology::CouplingMap;

/// Processor family and revision, as reported in the configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorType {
    pub family: String,
    pub revision: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
}

/// Device-wide median noise figures.
///
/// Calibration documents scatter per-qubit values around these medians.
/// Times are in microseconds, errors are probabilities in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    pub t1_us: f64,
    pub t2_us: f64,
    pub readout_error: f64,
    pub single_qubit_error: f64,
    pub two_qubit_error: f64,
}

impl NoiseProfile {
    /// A noiseless profile, used for ideal simulators.
    pub fn ideal() -> Self {
        Self {
            t1_us: 1.0e9,
            t2_us: 1.0e9,
            readout_error: 0.0,
            single_qubit_error: 0.0,
            two_qubit_error: 0.0,
        }
    }

    fn falcon(t1_us: f64, t2_us: f64, readout_error: f64, two_qubit_error: f64) -> Self {
        Self {
            t1_us,
            t2_us,
            readout_error,
            single_qubit_error: 3.0e-4,
            two_qubit_error,
        }
    }
}

/// A fake quantum device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Catalog name, e.g. `fake_manila`.
    pub name: String,
    pub version: String,
    pub num_qubits: u32,
    pub basis_gates: Vec<String>,
    /// `None` means all-to-all (simulators).
    pub coupling_map: Option<CouplingMap>,
    pub processor_type: Option<ProcessorType>,
    pub quantum_volume: Option<u32>,
    pub clops_h: Option<u32>,
    pub simulator: bool,
    pub max_shots: u32,
    pub max_experiments: u32,
    pub open_pulse: bool,
    pub online_date: DateTime<Utc>,
    pub description: String,
    pub noise: NoiseProfile,
}

fn falcon_basis() -> Vec<String> {
    ["cx", "id", "rz", "sx", "x"]
        .iter()
        .map(|g| (*g).to_string())
        .collect()
}

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .earliest()
        .unwrap_or_default()
}

struct FalconSpec {
    name: &'static str,
    version: &'static str,
    coupling: CouplingMap,
    revision: f64,
    segment: Option<&'static str>,
    quantum_volume: u32,
    clops_h: u32,
    online: (i32, u32, u32),
    noise: NoiseProfile,
}

impl Device {
    fn falcon(spec: FalconSpec) -> Self {
        let (y, m, d) = spec.online;
        let num_qubits = spec.coupling.num_qubits();
        Self {
            name: spec.name.to_string(),
            version: spec.version.to_string(),
            num_qubits,
            basis_gates: falcon_basis(),
            coupling_map: Some(spec.coupling),
            processor_type: Some(ProcessorType {
                family: "Falcon".to_string(),
                revision: spec.revision,
                segment: spec.segment.map(str::to_string),
            }),
            quantum_volume: Some(spec.quantum_volume),
            clops_h: Some(spec.clops_h),
            simulator: false,
            max_shots: 100_000,
            max_experiments: 300,
            open_pulse: false,
            online_date: date(y, m, d),
            description: format!("{num_qubits}-qubit fake device modelled on a Falcon processor"),
            noise: spec.noise,
        }
    }

    /// Ideal all-to-all simulator.
    pub fn simulator(name: impl Into<String>, num_qubits: u32) -> Self {
        let mut basis_gates = falcon_basis();
        basis_gates.extend(["h", "cz", "swap", "ry", "rx", "ecr"].map(String::from));
        Self {
            name: name.into(),
            version: "0.14.0".to_string(),
            num_qubits,
            basis_gates,
            coupling_map: None,
            processor_type: None,
            quantum_volume: None,
            clops_h: None,
            simulator: true,
            max_shots: 1_000_000,
            max_experiments: 1_000,
            open_pulse: false,
            online_date: date(2020, 1, 1),
            description: format!("{num_qubits}-qubit ideal simulator"),
            noise: NoiseProfile::ideal(),
        }
    }

    /// The fixed device set served by [`crate::DeviceCatalog::builtin`].
    pub fn builtin_set() -> Vec<Device> {
        vec![
            Device::falcon(FalconSpec {
                name: "fake_manila",
                version: "1.3.31",
                coupling: CouplingMap::linear(5),
                revision: 5.11,
                segment: Some("L"),
                quantum_volume: 32,
                clops_h: 2833,
                online: (2021, 4, 28),
                noise: NoiseProfile::falcon(160.0, 65.0, 0.028, 8.5e-3),
            }),
            Device::falcon(FalconSpec {
                name: "fake_lima",
                version: "1.0.39",
                coupling: CouplingMap::t_shape(),
                revision: 4.0,
                segment: Some("T"),
                quantum_volume: 8,
                clops_h: 2700,
                online: (2021, 1, 8),
                noise: NoiseProfile::falcon(95.0, 110.0, 0.031, 1.1e-2),
            }),
            Device::falcon(FalconSpec {
                name: "fake_belem",
                version: "1.0.50",
                coupling: CouplingMap::t_shape(),
                revision: 4.0,
                segment: Some("T"),
                quantum_volume: 16,
                clops_h: 2500,
                online: (2021, 1, 8),
                noise: NoiseProfile::falcon(90.0, 100.0, 0.026, 1.0e-2),
            }),
            Device::falcon(FalconSpec {
                name: "fake_quito",
                version: "1.1.34",
                coupling: CouplingMap::t_shape(),
                revision: 4.0,
                segment: Some("T"),
                quantum_volume: 16,
                clops_h: 2500,
                online: (2021, 1, 8),
                noise: NoiseProfile::falcon(85.0, 95.0, 0.042, 9.8e-3),
            }),
            Device::falcon(FalconSpec {
                name: "fake_jakarta",
                version: "1.0.34",
                coupling: CouplingMap::h_shape(),
                revision: 5.11,
                segment: Some("H"),
                quantum_volume: 16,
                clops_h: 2400,
                online: (2021, 4, 28),
                noise: NoiseProfile::falcon(130.0, 40.0, 0.027, 7.9e-3),
            }),
            Device::falcon(FalconSpec {
                name: "fake_nairobi",
                version: "1.3.3",
                coupling: CouplingMap::h_shape(),
                revision: 5.11,
                segment: Some("H"),
                quantum_volume: 32,
                clops_h: 2611,
                online: (2021, 11, 8),
                noise: NoiseProfile::falcon(120.0, 75.0, 0.024, 8.1e-3),
            }),
            Device::falcon(FalconSpec {
                name: "fake_guadalupe",
                version: "1.5.24",
                coupling: CouplingMap::heavy_hex_16(),
                revision: 4.0,
                segment: Some("P"),
                quantum_volume: 32,
                clops_h: 2400,
                online: (2020, 6, 24),
                noise: NoiseProfile::falcon(95.0, 110.0, 0.022, 1.0e-2),
            }),
            Device::falcon(FalconSpec {
                name: "fake_kolkata",
                version: "1.2.14",
                coupling: CouplingMap::heavy_hex_27(),
                revision: 5.11,
                segment: None,
                quantum_volume: 128,
                clops_h: 2000,
                online: (2021, 11, 8),
                noise: NoiseProfile::falcon(110.0, 95.0, 0.016, 7.2e-3),
            }),
            Device::simulator("aer_simulator", 32),
        ]
    }

    /// Median readout error of the device.
    pub fn readout_error(&self) -> f64 {
        self.noise.readout_error
    }
}
