//! Error types for the compute engine.

use thiserror::Error;

/// Result type for compute engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors raised while decoding parameters or executing a program.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Parameters could not be decoded into primitive inputs.
    #[error("Failed to decode parameters: {0}")]
    Decode(String),

    /// Program id is not one of the supported primitives.
    #[error("Unsupported program: {0}")]
    UnsupportedProgram(String),

    /// Circuit needs more qubits than the device has.
    #[error("Circuit requires {required} qubits but {device} has {available}")]
    CircuitTooLarge {
        device: String,
        required: u32,
        available: u32,
    },

    /// Circuit reads out into more classical bits than the device can record.
    #[error("Circuit declares {required} classical bits but {device} records at most {available}")]
    TooManyClbits {
        device: String,
        required: u32,
        available: u32,
    },

    /// Shot count outside the device limits.
    #[error("Invalid shot count {shots}: must be between 1 and {max}")]
    InvalidShots { shots: u32, max: u32 },

    /// Execution failed for any other reason.
    #[error("Execution failed: {0}")]
    Execution(String),
}

impl EngineError {
    /// Shorthand for a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
