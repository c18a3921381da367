//! Supported compute programs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The closed set of runtime primitives the server can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramId {
    Sampler,
    Estimator,
}

impl ProgramId {
    /// All supported programs.
    pub const ALL: [ProgramId; 2] = [ProgramId::Sampler, ProgramId::Estimator];

    /// Wire name of the program.
    pub fn as_str(self) -> &'static str {
        match self {
            ProgramId::Sampler => "sampler",
            ProgramId::Estimator => "estimator",
        }
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgramId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sampler" => Ok(ProgramId::Sampler),
            "estimator" => Ok(ProgramId::Estimator),
            other => Err(EngineError::UnsupportedProgram(other.to_string())),
        }
    }
}
