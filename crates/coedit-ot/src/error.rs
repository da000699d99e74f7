//! Error types for coedit-ot

use thiserror::Error;

/// Errors raised by operation composition, application and decoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtError {
    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Incompatible operations: {0}")]
    Incompatible(&'static str),

    #[error("Invalid component: {0}")]
    InvalidComponent(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Result type for operation handling
pub type OtResult<T> = Result<T, OtError>;
