//! Decoding of primitive parameters.
//!
//! Job parameters arrive as opaque JSON in the runtime V2 shape:
//!
//! ```json
//! { "pubs": [...], "options": { "default_shots": 1024 }, "version": 2 }
//! ```
//!
//! Circuits are embedded either as a bare OpenQASM string or as a tagged
//! object `{"__type__": "QuantumCircuit", "__value__": "<qasm>"}`. Decoding
//! rebuilds just enough of the circuit to drive an engine: its source text
//! and its qubit/clbit widths, read from the register declarations.

use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::program::ProgramId;

/// Shots used when neither the PUB nor the options specify any.
pub const DEFAULT_SHOTS: u32 = 1024;

/// Estimator precision used when neither the PUB nor the options specify any.
pub const DEFAULT_PRECISION: f64 = 0.015625;

/// Widest quantum or classical register total a circuit may declare.
pub const MAX_REGISTER_WIDTH: u32 = 1024;

const CIRCUIT_TYPE_TAG: &str = "QuantumCircuit";

/// A circuit reconstructed from its serialized form.
#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    pub qasm: String,
    pub num_qubits: u32,
    pub num_clbits: u32,
}

impl Circuit {
    /// Scan an OpenQASM 2 or 3 program for its register declarations.
    pub fn from_qasm(source: &str) -> EngineResult<Self> {
        let stripped: String = source
            .lines()
            .map(|line| line.split("//").next().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n");

        if !stripped.trim_start().starts_with("OPENQASM") {
            return Err(EngineError::decode("circuit is not an OpenQASM program"));
        }

        let mut num_qubits = 0u32;
        let mut num_clbits = 0u32;
        for statement in stripped.split(';') {
            // A statement may follow the closing brace of a gate body.
            let statement = statement.rsplit('}').next().unwrap_or_default().trim();
            if let Some(rest) = statement.strip_prefix("qreg") {
                grow(&mut num_qubits, declared_size(rest, false)?)?;
            } else if let Some(rest) = statement.strip_prefix("creg") {
                grow(&mut num_clbits, declared_size(rest, false)?)?;
            } else if let Some(rest) = statement.strip_prefix("qubit") {
                grow(&mut num_qubits, declared_size(rest, true)?)?;
            } else if let Some(rest) = statement.strip_prefix("bit") {
                grow(&mut num_clbits, declared_size(rest, true)?)?;
            }
        }

        if num_qubits == 0 {
            return Err(EngineError::decode("circuit declares no qubits"));
        }
        if num_qubits > MAX_REGISTER_WIDTH || num_clbits > MAX_REGISTER_WIDTH {
            return Err(EngineError::decode(format!(
                "circuit declares {num_qubits} qubits and {num_clbits} clbits; \
                 at most {MAX_REGISTER_WIDTH} of each are supported"
            )));
        }

        Ok(Self {
            qasm: source.to_string(),
            num_qubits,
            num_clbits,
        })
    }

    fn decode(value: &Value) -> EngineResult<Self> {
        match value {
            Value::String(qasm) => Self::from_qasm(qasm),
            Value::Object(obj) => match obj.get("__type__").and_then(Value::as_str) {
                Some(CIRCUIT_TYPE_TAG) => match obj.get("__value__") {
                    Some(Value::String(qasm)) => Self::from_qasm(qasm),
                    _ => Err(EngineError::decode(
                        "unsupported circuit encoding: expected OpenQASM text in __value__",
                    )),
                },
                Some(other) => Err(EngineError::decode(format!(
                    "expected a {CIRCUIT_TYPE_TAG}, found {other}"
                ))),
                None => Err(EngineError::decode("circuit object is missing __type__")),
            },
            _ => Err(EngineError::decode(
                "circuit must be an OpenQASM string or a tagged circuit object",
            )),
        }
    }
}

/// Add a register to a running width total.
fn grow(total: &mut u32, size: u32) -> EngineResult<()> {
    *total = total
        .checked_add(size)
        .ok_or_else(|| EngineError::decode("register size overflow"))?;
    Ok(())
}

/// Parse the size of a declaration tail.
///
/// QASM 2 tails look like ` q[5]`; QASM 3 tails look like `[5] q` or ` q`
/// (a single unit when `bare_is_one` is set).
fn declared_size(rest: &str, bare_is_one: bool) -> EngineResult<u32> {
    // Reject identifiers that merely start with a keyword, e.g. `qubits_used`.
    if !rest.starts_with([' ', '\t', '\n', '[']) {
        return Ok(0);
    }
    match (rest.find('['), rest.find(']')) {
        (Some(open), Some(close)) if open < close => rest[open + 1..close]
            .trim()
            .parse::<u32>()
            .map_err(|_| EngineError::decode(format!("invalid register size in '{}'", rest.trim()))),
        (None, None) if bare_is_one => Ok(1),
        _ => Err(EngineError::decode(format!(
            "malformed register declaration '{}'",
            rest.trim()
        ))),
    }
}

/// Weighted sum of Pauli strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Observable {
    pub terms: Vec<(String, f64)>,
}

impl Observable {
    fn decode(value: &Value, num_qubits: u32) -> EngineResult<Self> {
        let terms = match value {
            Value::String(pauli) => vec![(check_pauli(pauli, num_qubits)?, 1.0)],
            Value::Object(map) => map
                .iter()
                .map(|(pauli, coeff)| {
                    let coeff = coeff.as_f64().ok_or_else(|| {
                        EngineError::decode(format!("coefficient of {pauli} is not a number"))
                    })?;
                    Ok((check_pauli(pauli, num_qubits)?, coeff))
                })
                .collect::<EngineResult<Vec<_>>>()?,
            _ => {
                return Err(EngineError::decode(
                    "observable must be a Pauli string or a {pauli: coefficient} map",
                ));
            }
        };
        if terms.is_empty() {
            return Err(EngineError::decode("observable has no terms"));
        }
        Ok(Self { terms })
    }

    fn decode_many(value: &Value, num_qubits: u32) -> EngineResult<Vec<Self>> {
        let observables = match value {
            Value::Array(items) => items
                .iter()
                .map(|item| Self::decode_many(item, num_qubits))
                .collect::<EngineResult<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect(),
            other => vec![Self::decode(other, num_qubits)?],
        };
        Ok(observables)
    }
}

fn check_pauli(pauli: &str, num_qubits: u32) -> EngineResult<String> {
    if let Some(bad) = pauli.chars().find(|c| !matches!(c, 'I' | 'X' | 'Y' | 'Z')) {
        return Err(EngineError::decode(format!(
            "invalid Pauli character '{bad}' in {pauli}"
        )));
    }
    if pauli.len() != num_qubits as usize {
        return Err(EngineError::decode(format!(
            "observable {pauli} acts on {} qubits but the circuit has {num_qubits}",
            pauli.len()
        )));
    }
    Ok(pauli.to_string())
}

/// One sampler PUB.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerPub {
    pub circuit: Circuit,
    pub parameter_values: Vec<f64>,
    pub shots: u32,
}

/// One estimator PUB.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorPub {
    pub circuit: Circuit,
    pub observables: Vec<Observable>,
    pub parameter_values: Vec<f64>,
    pub precision: f64,
}

/// Decoded primitive inputs, tagged by program kind.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedParams {
    Sampler(Vec<SamplerPub>),
    Estimator(Vec<EstimatorPub>),
}

impl DecodedParams {
    /// Program kind the inputs belong to.
    pub fn program(&self) -> ProgramId {
        match self {
            DecodedParams::Sampler(_) => ProgramId::Sampler,
            DecodedParams::Estimator(_) => ProgramId::Estimator,
        }
    }

    /// Number of PUBs.
    pub fn len(&self) -> usize {
        match self {
            DecodedParams::Sampler(pubs) => pubs.len(),
            DecodedParams::Estimator(pubs) => pubs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode the raw job parameters for `program`.
pub fn decode_params(program: ProgramId, params: &Value) -> EngineResult<DecodedParams> {
    let pubs = params
        .get("pubs")
        .and_then(Value::as_array)
        .ok_or_else(|| EngineError::decode("params.pubs must be a list"))?;
    if pubs.is_empty() {
        return Err(EngineError::decode("params.pubs is empty"));
    }
    let options = params.get("options");

    match program {
        ProgramId::Sampler => {
            let default_shots = option_u32(options, "default_shots")?
                .or(option_u32(Some(params), "shots")?)
                .unwrap_or(DEFAULT_SHOTS);
            pubs.iter()
                .enumerate()
                .map(|(i, pub_)| decode_sampler_pub(pub_, default_shots).map_err(|e| at_pub(i, e)))
                .collect::<EngineResult<Vec<_>>>()
                .map(DecodedParams::Sampler)
        }
        ProgramId::Estimator => {
            let default_precision = options
                .and_then(|o| o.get("default_precision"))
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_PRECISION);
            pubs.iter()
                .enumerate()
                .map(|(i, pub_)| {
                    decode_estimator_pub(pub_, default_precision).map_err(|e| at_pub(i, e))
                })
                .collect::<EngineResult<Vec<_>>>()
                .map(DecodedParams::Estimator)
        }
    }
}

fn at_pub(index: usize, err: EngineError) -> EngineError {
    match err {
        EngineError::Decode(msg) => EngineError::Decode(format!("pub {index}: {msg}")),
        other => other,
    }
}

fn option_u32(holder: Option<&Value>, key: &str) -> EngineResult<Option<u32>> {
    match holder.and_then(|h| h.get(key)) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| EngineError::decode(format!("{key} must be a non-negative integer"))),
    }
}

fn parameter_values(value: Option<&Value>) -> EngineResult<Vec<f64>> {
    fn collect(value: &Value, out: &mut Vec<f64>) -> EngineResult<()> {
        match value {
            Value::Null => Ok(()),
            Value::Number(n) => {
                out.push(n.as_f64().unwrap_or_default());
                Ok(())
            }
            Value::Array(items) => items.iter().try_for_each(|item| collect(item, out)),
            _ => Err(EngineError::decode("parameter values must be numbers")),
        }
    }
    let mut out = Vec::new();
    if let Some(value) = value {
        collect(value, &mut out)?;
    }
    Ok(out)
}

fn decode_sampler_pub(value: &Value, default_shots: u32) -> EngineResult<SamplerPub> {
    let (circuit, params, shots) = match value {
        Value::Array(items) => {
            let circuit = items
                .first()
                .ok_or_else(|| EngineError::decode("empty sampler pub"))?;
            let shots = match items.get(2) {
                None | Some(Value::Null) => None,
                Some(v) => Some(
                    v.as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| EngineError::decode("shots must be a non-negative integer"))?,
                ),
            };
            (Circuit::decode(circuit)?, items.get(1), shots)
        }
        other => (Circuit::decode(other)?, None, None),
    };

    if circuit.num_clbits == 0 {
        return Err(EngineError::decode(
            "sampler circuit has no classical bits to measure into",
        ));
    }

    Ok(SamplerPub {
        circuit,
        parameter_values: parameter_values(params)?,
        shots: shots.unwrap_or(default_shots),
    })
}

fn decode_estimator_pub(value: &Value, default_precision: f64) -> EngineResult<EstimatorPub> {
    let items = value
        .as_array()
        .ok_or_else(|| EngineError::decode("estimator pub must be [circuit, observables, ...]"))?;
    let circuit = Circuit::decode(
        items
            .first()
            .ok_or_else(|| EngineError::decode("empty estimator pub"))?,
    )?;
    let observables = Observable::decode_many(
        items
            .get(1)
            .ok_or_else(|| EngineError::decode("estimator pub has no observables"))?,
        circuit.num_qubits,
    )?;
    if observables.is_empty() {
        return Err(EngineError::decode("estimator pub has no observables"));
    }
    let precision = match items.get(3) {
        None | Some(Value::Null) => default_precision,
        Some(v) => v
            .as_f64()
            .ok_or_else(|| EngineError::decode("precision must be a number"))?,
    };
    if !(precision > 0.0) {
        return Err(EngineError::decode("precision must be positive"));
    }

    Ok(EstimatorPub {
        parameter_values: parameter_values(items.get(2))?,
        circuit,
        observables,
        precision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BELL: &str = "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0],q[1];\nmeasure q -> c;\n";
    const BELL3: &str = "OPENQASM 3.0;\ninclude \"stdgates.inc\";\nbit[2] c;\nqubit[2] q;\nh q[0];\ncx q[0], q[1];\nc = measure q;\n";

    #[test]
    fn test_scan_qasm2() {
        let circuit = Circuit::from_qasm(BELL).unwrap();
        assert_eq!(circuit.num_qubits, 2);
        assert_eq!(circuit.num_clbits, 2);
    }

    #[test]
    fn test_scan_qasm3() {
        let circuit = Circuit::from_qasm(BELL3).unwrap();
        assert_eq!(circuit.num_qubits, 2);
        assert_eq!(circuit.num_clbits, 2);
    }

    #[test]
    fn test_scan_ignores_gate_bodies_and_comments() {
        let src = "// header\nOPENQASM 3.0;\ngate g a { x a; }\nqubit[3] q; // three\nqubit anc;\nbit b;\n";
        let circuit = Circuit::from_qasm(src).unwrap();
        assert_eq!(circuit.num_qubits, 4);
        assert_eq!(circuit.num_clbits, 1);
    }

    #[test]
    fn test_scan_rejects_non_qasm() {
        assert!(matches!(
            Circuit::from_qasm("qreg q[2];"),
            Err(EngineError::Decode(_))
        ));
        assert!(Circuit::from_qasm("OPENQASM 2.0;\nqreg q[x];").is_err());
        assert!(Circuit::from_qasm("OPENQASM 2.0;\ncreg c[1];").is_err());
    }

    #[test]
    fn test_decode_sampler_shapes() {
        let params = json!({
            "pubs": [
                BELL,
                [{"__type__": "QuantumCircuit", "__value__": BELL3}, null, 200],
            ],
            "options": {"default_shots": 500},
            "version": 2
        });
        let DecodedParams::Sampler(pubs) = decode_params(ProgramId::Sampler, &params).unwrap()
        else {
            panic!("expected sampler params");
        };
        assert_eq!(pubs.len(), 2);
        assert_eq!(pubs[0].shots, 500);
        assert_eq!(pubs[1].shots, 200);
    }

    #[test]
    fn test_shots_fallback_chain() {
        let top_level = json!({"pubs": [BELL], "shots": 64});
        let DecodedParams::Sampler(pubs) = decode_params(ProgramId::Sampler, &top_level).unwrap()
        else {
            panic!("expected sampler params");
        };
        assert_eq!(pubs[0].shots, 64);

        let bare = json!({"pubs": [[BELL]]});
        let DecodedParams::Sampler(pubs) = decode_params(ProgramId::Sampler, &bare).unwrap() else {
            panic!("expected sampler params");
        };
        assert_eq!(pubs[0].shots, DEFAULT_SHOTS);
    }

    #[test]
    fn test_sampler_requires_clbits() {
        let src = "OPENQASM 2.0;\nqreg q[2];\nh q[0];\n";
        let err = decode_params(ProgramId::Sampler, &json!({"pubs": [src]})).unwrap_err();
        assert!(err.to_string().contains("pub 0"));
        assert!(err.to_string().contains("classical bits"));
    }

    #[test]
    fn test_register_sizes_do_not_wrap() {
        let src = "OPENQASM 2.0;\nqreg a[4294967295];\nqreg b[2];\ncreg c[2];\n";
        let err = Circuit::from_qasm(src).unwrap_err();
        assert!(err.to_string().contains("register size overflow"));

        let src = "OPENQASM 3.0;\nqubit[2] q;\nbit[4294967295] c;\nbit[1] d;\n";
        assert!(matches!(
            Circuit::from_qasm(src),
            Err(EngineError::Decode(_))
        ));
    }

    #[test]
    fn test_oversized_registers_rejected() {
        let src = "OPENQASM 2.0;\nqreg q[2];\ncreg c[4000000000];\n";
        let params = json!({"pubs": [[src, null, 100000]]});
        let err = decode_params(ProgramId::Sampler, &params).unwrap_err();
        assert!(err.to_string().contains("at most 1024"), "{err}");

        let wide = "OPENQASM 3.0;\nqubit[2000] q;\nbit[2] c;\n";
        assert!(Circuit::from_qasm(wide).is_err());

        let widest = format!("OPENQASM 3.0;\nqubit[2] q;\nbit[{MAX_REGISTER_WIDTH}] c;\n");
        assert_eq!(
            Circuit::from_qasm(&widest).unwrap().num_clbits,
            MAX_REGISTER_WIDTH
        );
    }

    #[test]
    fn test_unsupported_encoding() {
        let qpy = json!({"pubs": [{"__type__": "QuantumCircuit", "__value__": {"qpy": "AAAA"}}]});
        assert!(matches!(
            decode_params(ProgramId::Sampler, &qpy),
            Err(EngineError::Decode(_))
        ));
        let other = json!({"pubs": [{"__type__": "Parameter", "__value__": "theta"}]});
        assert!(decode_params(ProgramId::Sampler, &other).is_err());
    }

    #[test]
    fn test_missing_or_empty_pubs() {
        assert!(decode_params(ProgramId::Sampler, &json!({})).is_err());
        assert!(decode_params(ProgramId::Estimator, &json!({"pubs": []})).is_err());
        assert!(decode_params(ProgramId::Sampler, &json!("pubs")).is_err());
    }

    #[test]
    fn test_decode_estimator() {
        let params = json!({
            "pubs": [
                [BELL, "ZZ"],
                [BELL, ["XX", {"ZI": 0.5, "IZ": -0.5}], [0.1, 0.2], 0.01],
            ]
        });
        let DecodedParams::Estimator(pubs) = decode_params(ProgramId::Estimator, &params).unwrap()
        else {
            panic!("expected estimator params");
        };
        assert_eq!(pubs[0].observables.len(), 1);
        assert_eq!(pubs[0].precision, DEFAULT_PRECISION);
        assert_eq!(pubs[1].observables.len(), 2);
        assert_eq!(pubs[1].observables[1].terms.len(), 2);
        assert_eq!(pubs[1].parameter_values, vec![0.1, 0.2]);
        assert_eq!(pubs[1].precision, 0.01);
    }

    #[test]
    fn test_estimator_observable_width() {
        let params = json!({"pubs": [[BELL, "ZZZ"]]});
        let err = decode_params(ProgramId::Estimator, &params).unwrap_err();
        assert!(err.to_string().contains("acts on 3 qubits"));

        let bad_char = json!({"pubs": [[BELL, "ZA"]]});
        assert!(decode_params(ProgramId::Estimator, &bad_char).is_err());
    }

    #[test]
    fn test_estimator_requires_observables() {
        assert!(decode_params(ProgramId::Estimator, &json!({"pubs": [[BELL]]})).is_err());
        assert!(decode_params(ProgramId::Estimator, &json!({"pubs": [BELL]})).is_err());
        assert!(decode_params(ProgramId::Estimator, &json!({"pubs": [[BELL, []]]})).is_err());
    }

    #[test]
    fn test_decoded_program() {
        let params = json!({"pubs": [BELL]});
        let decoded = decode_params(ProgramId::Sampler, &params).unwrap();
        assert_eq!(decoded.program(), ProgramId::Sampler);
        assert_eq!(decoded.len(), 1);
    }
}
