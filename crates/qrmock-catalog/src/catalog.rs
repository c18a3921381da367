//! The device catalog.
//!
//! [`DeviceCatalog`] is read-only after construction and is shared behind an
//! `Arc` by the job engine and the REST surface.

use std::hash::Hasher;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHasher};
use tracing::debug;

use crate::device::Device;
use crate::documents::{
    DeviceConfiguration, DeviceDefaults, DeviceProperties, DeviceStatus, DeviceSummary,
    GateConfig, GateProperties, Nduv,
};

/// Falcon sample time, in seconds.
const FALCON_DT: f64 = 2.222_222_222_222_222e-10;

/// Estimated queue wait per pending job, in seconds.
const WAIT_SECONDS_PER_JOB: f64 = 60.0;

/// Registry of addressable devices.
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    devices: FxHashMap<String, Arc<Device>>,
    calibrated_at: DateTime<Utc>,
}

impl DeviceCatalog {
    /// Catalog holding the fixed built-in device set.
    pub fn builtin() -> Self {
        let catalog = Self::from_devices(Device::builtin_set());
        debug!(devices = catalog.len(), "Loaded built-in device catalog");
        catalog
    }

    /// Catalog holding exactly the given devices. Later duplicates win.
    pub fn from_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let devices = devices
            .into_iter()
            .map(|d| (d.name.clone(), Arc::new(d)))
            .collect();
        Self {
            devices,
            calibrated_at: Utc
                .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
                .earliest()
                .unwrap_or_default(),
        }
    }

    /// Resolve a device name to its descriptor.
    pub fn resolve(&self, name: &str) -> Option<Arc<Device>> {
        self.devices.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.contains_key(name)
    }

    /// Device names in lexicographic order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.devices.keys().cloned().collect();
        names.sort();
        names
    }

    /// Devices in name order.
    pub fn iter(&self) -> impl Iterator<Item = Arc<Device>> + '_ {
        self.names()
            .into_iter()
            .filter_map(move |name| self.devices.get(&name).cloned())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Listing entries for every device.
    ///
    /// `pending_for` supplies the number of non-terminal jobs per device;
    /// queue length and wait estimate are only filled when `with_wait_time`
    /// is set.
    pub fn summaries(
        &self,
        pending_for: impl Fn(&str) -> usize,
        with_wait_time: bool,
    ) -> Vec<DeviceSummary> {
        self.iter()
            .map(|device| {
                let (queue_length, wait_time_seconds) = if with_wait_time {
                    let pending = pending_for(&device.name);
                    (Some(pending), Some(pending as f64 * WAIT_SECONDS_PER_JOB))
                } else {
                    (None, None)
                };
                DeviceSummary {
                    backend_name: device.name.clone(),
                    backend_version: device.version.clone(),
                    operational: true,
                    simulator: device.simulator,
                    n_qubits: device.num_qubits,
                    processor_type: device.processor_type.clone(),
                    quantum_volume: device.quantum_volume,
                    clops_h: device.clops_h,
                    queue_length,
                    wait_time_seconds,
                }
            })
            .collect()
    }

    /// Configuration document of a device.
    pub fn configuration(&self, name: &str) -> Option<DeviceConfiguration> {
        let device = self.devices.get(name)?;
        let n = device.num_qubits;
        let directed = device.coupling_map.as_ref().map(|m| m.directed());
        let per_qubit: Vec<Vec<u32>> = (0..n).map(|q| vec![q]).collect();

        let gates = device
            .basis_gates
            .iter()
            .map(|gate| {
                let two_qubit = matches!(gate.as_str(), "cx" | "cz" | "ecr" | "swap");
                let coupling_map = if two_qubit {
                    directed
                        .as_ref()
                        .map(|edges| edges.iter().map(|e| e.to_vec()).collect())
                } else {
                    Some(per_qubit.clone())
                };
                GateConfig {
                    name: gate.clone(),
                    parameters: gate_parameters(gate),
                    qasm_def: qasm_def(gate),
                    coupling_map,
                }
            })
            .collect();

        let mut supported_instructions = device.basis_gates.clone();
        supported_instructions.extend(["measure", "reset", "delay", "barrier"].map(String::from));

        let dt = (!device.simulator).then_some(FALCON_DT);

        Some(DeviceConfiguration {
            backend_name: device.name.clone(),
            backend_version: device.version.clone(),
            n_qubits: n,
            basis_gates: device.basis_gates.clone(),
            gates,
            local: false,
            simulator: device.simulator,
            conditional: false,
            open_pulse: device.open_pulse,
            memory: true,
            max_shots: device.max_shots,
            max_experiments: device.max_experiments,
            coupling_map: directed,
            supported_instructions,
            meas_map: vec![(0..n).collect()],
            processor_type: device.processor_type.clone(),
            dt,
            dtm: dt,
            quantum_volume: device.quantum_volume,
            clops_h: device.clops_h,
            supported_features: vec!["qobj".to_string()],
            online_date: device.online_date,
            credits_required: !device.simulator,
            description: device.description.clone(),
        })
    }

    /// Calibration document of a device.
    ///
    /// `None` for unknown devices and for simulators, which carry no
    /// calibration. Values are drawn from an RNG seeded by the device name.
    pub fn properties(&self, name: &str) -> Option<DeviceProperties> {
        let device = self.devices.get(name)?;
        if device.simulator {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(name_seed(&device.name));
        let date = self.calibrated_at;
        let noise = &device.noise;
        let nduv = |name: &str, unit: &str, value: f64| Nduv {
            date,
            name: name.to_string(),
            unit: unit.to_string(),
            value,
        };

        let qubits = (0..device.num_qubits)
            .map(|_| {
                let t1 = noise.t1_us * rng.gen_range(0.6..1.4);
                let t2 = (noise.t2_us * rng.gen_range(0.6..1.4)).min(2.0 * t1);
                let readout = (noise.readout_error * rng.gen_range(0.5..1.5)).clamp(0.0, 0.5);
                vec![
                    nduv("T1", "us", t1),
                    nduv("T2", "us", t2),
                    nduv("frequency", "GHz", rng.gen_range(4.8..5.3)),
                    nduv("anharmonicity", "GHz", rng.gen_range(-0.345..-0.330)),
                    nduv("readout_error", "", readout),
                    nduv("prob_meas0_prep1", "", (readout * 1.2).min(1.0)),
                    nduv("prob_meas1_prep0", "", readout * 0.8),
                    nduv("readout_length", "ns", 5351.11),
                ]
            })
            .collect();

        let mut gates = Vec::new();
        for q in 0..device.num_qubits {
            for gate in device.basis_gates.iter().filter(|g| g.as_str() != "cx") {
                let (error, length) = match gate.as_str() {
                    "rz" => (0.0, 0.0),
                    _ => (
                        noise.single_qubit_error * rng.gen_range(0.5..1.5),
                        35.555_555_555_555_56,
                    ),
                };
                gates.push(GateProperties {
                    qubits: vec![q],
                    gate: gate.clone(),
                    parameters: vec![nduv("gate_error", "", error), nduv("gate_length", "ns", length)],
                });
            }
        }
        if let Some(map) = &device.coupling_map {
            for [a, b] in map.directed() {
                gates.push(GateProperties {
                    qubits: vec![a, b],
                    gate: "cx".to_string(),
                    parameters: vec![
                        nduv("gate_error", "", noise.two_qubit_error * rng.gen_range(0.6..1.4)),
                        nduv("gate_length", "ns", rng.gen_range(250.0..550.0)),
                    ],
                });
            }
        }

        Some(DeviceProperties {
            backend_name: device.name.clone(),
            backend_version: device.version.clone(),
            last_update_date: date,
            qubits,
            gates,
            general: vec![nduv("jq_01", "GHz", 0.0), nduv("zz_01", "GHz", 0.0)],
        })
    }

    /// Operational status, with the pending job count supplied by the caller.
    pub fn status(&self, name: &str, pending_jobs: usize) -> Option<DeviceStatus> {
        let device = self.devices.get(name)?;
        Some(DeviceStatus {
            backend_name: device.name.clone(),
            backend_version: device.version.clone(),
            operational: true,
            status_msg: "active".to_string(),
            pending_jobs,
        })
    }

    /// Pulse defaults. Only open-pulse devices have them, and none of the
    /// built-ins do.
    pub fn defaults(&self, name: &str) -> Option<DeviceDefaults> {
        let device = self.devices.get(name)?;
        if !device.open_pulse {
            return None;
        }
        let props = self.properties(name)?;
        let qubit_freq_est = (0..props.qubits.len())
            .map(|q| props.qubit_property(q, "frequency").unwrap_or(5.0))
            .collect();
        Some(DeviceDefaults {
            qubit_freq_est,
            meas_freq_est: vec![7.0; device.num_qubits as usize],
            buffer: 0,
        })
    }
}

fn name_seed(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(name.as_bytes());
    hasher.finish()
}

fn gate_parameters(gate: &str) -> Vec<String> {
    match gate {
        "rz" | "rx" | "ry" => vec!["theta".to_string()],
        _ => Vec::new(),
    }
}

fn qasm_def(gate: &str) -> String {
    match gate {
        "cx" => "gate cx q0, q1 { CX q0, q1; }".to_string(),
        "id" => "gate id q { U(0, 0, 0) q; }".to_string(),
        "rz" => "gate rz(theta) q { U(0, 0, theta) q; }".to_string(),
        "sx" => "gate sx q { U(pi/2, 3*pi/2, pi/2) q; }".to_string(),
        "x" => "gate x q { U(pi, 0, pi) q; }".to_string(),
        other => format!("gate {other} q {{ }}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let catalog = DeviceCatalog::builtin();
        assert!(catalog.resolve("fake_manila").is_some());
        assert!(catalog.resolve("ghost").is_none());
        assert!(catalog.contains("aer_simulator"));
    }

    #[test]
    fn test_names_sorted() {
        let names = DeviceCatalog::builtin().names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn test_properties_deterministic() {
        let a = DeviceCatalog::builtin().properties("fake_nairobi").unwrap();
        let b = DeviceCatalog::builtin().properties("fake_nairobi").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.qubits.len(), 7);
        // 4 non-cx basis gates per qubit plus both directions of 6 edges.
        assert_eq!(a.gates.len(), 7 * 4 + 12);
    }

    #[test]
    fn test_properties_differ_between_devices() {
        let catalog = DeviceCatalog::builtin();
        let lima = catalog.properties("fake_lima").unwrap();
        let belem = catalog.properties("fake_belem").unwrap();
        assert_ne!(
            lima.qubit_property(0, "T1"),
            belem.qubit_property(0, "T1")
        );
    }

    #[test]
    fn test_properties_ranges() {
        let props = DeviceCatalog::builtin().properties("fake_kolkata").unwrap();
        for q in 0..props.qubits.len() {
            let t1 = props.qubit_property(q, "T1").unwrap();
            let t2 = props.qubit_property(q, "T2").unwrap();
            let ro = props.qubit_property(q, "readout_error").unwrap();
            assert!(t1 > 0.0);
            assert!(t2 <= 2.0 * t1);
            assert!((0.0..=0.5).contains(&ro));
        }
    }

    #[test]
    fn test_simulator_has_no_properties() {
        let catalog = DeviceCatalog::builtin();
        assert!(catalog.properties("aer_simulator").is_none());
        assert!(catalog.properties("ghost").is_none());
    }

    #[test]
    fn test_configuration() {
        let config = DeviceCatalog::builtin().configuration("fake_manila").unwrap();
        assert_eq!(config.n_qubits, 5);
        assert_eq!(config.coupling_map.as_ref().unwrap().len(), 8);
        assert!(config.supported_instructions.contains(&"measure".to_string()));
        let cx = config.gates.iter().find(|g| g.name == "cx").unwrap();
        assert_eq!(cx.coupling_map.as_ref().unwrap().len(), 8);
        assert_eq!(config.dt, Some(FALCON_DT));
    }

    #[test]
    fn test_status_and_defaults() {
        let catalog = DeviceCatalog::builtin();
        let status = catalog.status("fake_lima", 3).unwrap();
        assert!(status.operational);
        assert_eq!(status.status_msg, "active");
        assert_eq!(status.pending_jobs, 3);
        assert!(catalog.status("ghost", 0).is_none());
        assert!(catalog.defaults("fake_lima").is_none());
    }

    #[test]
    fn test_summaries_wait_time() {
        let catalog = DeviceCatalog::builtin();
        let plain = catalog.summaries(|_| 2, false);
        assert!(plain.iter().all(|s| s.wait_time_seconds.is_none()));

        let timed = catalog.summaries(|name| usize::from(name == "fake_quito") * 2, true);
        let quito = timed.iter().find(|s| s.backend_name == "fake_quito").unwrap();
        assert_eq!(quito.queue_length, Some(2));
        assert_eq!(quito.wait_time_seconds, Some(120.0));
        let lima = timed.iter().find(|s| s.backend_name == "fake_lima").unwrap();
        assert_eq!(lima.wait_time_seconds, Some(0.0));
    }

    #[test]
    fn test_summary_omits_absent_fields() {
        let catalog = DeviceCatalog::builtin();
        let summaries = catalog.summaries(|_| 0, false);
        let sim = summaries
            .iter()
            .find(|s| s.backend_name == "aer_simulator")
            .unwrap();
        let json = serde_json::to_value(sim).unwrap();
        assert!(json.get("wait_time_seconds").is_none());
        assert!(json.get("processor_type").is_none());
        assert_eq!(json["simulator"], true);
    }
}
