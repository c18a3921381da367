//! Primitive result model.
//!
//! A [`PrimitiveResult`] holds one [`PubResult`] per submitted PUB (primitive
//! unified bloc), in submission order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one primitive execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveResult {
    pub results: Vec<PubResult>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Result of a single PUB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubResult {
    pub data: PubData,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Data payload of a PUB result.
///
/// Sampler results fill `counts` and `bitstrings`; estimator results fill
/// `expectation_values` and `standard_errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PubData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<BTreeMap<String, u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitstrings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectation_values: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_errors: Option<Vec<f64>>,
}

impl PubData {
    /// Sampler payload.
    pub fn sampled(counts: BTreeMap<String, u64>, bitstrings: Vec<String>) -> Self {
        Self {
            counts: Some(counts),
            bitstrings: Some(bitstrings),
            ..Self::default()
        }
    }

    /// Estimator payload.
    pub fn estimated(expectation_values: Vec<f64>, standard_errors: Vec<f64>) -> Self {
        Self {
            expectation_values: Some(expectation_values),
            standard_errors: Some(standard_errors),
            ..Self::default()
        }
    }

    /// Total number of shots recorded in `counts`.
    pub fn total_shots(&self) -> u64 {
        self.counts.as_ref().map_or(0, |c| c.values().sum())
    }
}
