// Wed Feb 18 2026 - Alex

use crate::driver::DriverError;
use crate::memory::{Address, MemoryError};
use crate::property::ValueKind;
use crate::resolver::ExpressionError;
use crate::scripting::HookError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PropertyError {
    // Load-time configuration errors.
    #[error("Property '{path}': invalid address expression: {source}")]
    InvalidExpression {
        path: String,
        #[source]
        source: ExpressionError,
    },
    #[error("Property '{path}': invalid bit selector '{selector}': {reason}")]
    InvalidBitSelector {
        path: String,
        selector: String,
        reason: String,
    },
    #[error("Property '{path}': length must be greater than zero")]
    InvalidLength { path: String },
    #[error("Property '{path}': {kind} spans at most {max} bytes, got {length}")]
    LengthTooLong {
        path: String,
        kind: ValueKind,
        length: usize,
        max: usize,
    },

    // Per-cycle recoverable errors.
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("Unsupported length {0} for this value kind")]
    UnsupportedLength(usize),
    #[error("Reference table '{0}' not found")]
    MissingReference(String),
    #[error("No entry in reference table '{table}' has value {value}")]
    MissingReferenceValue { table: String, value: String },
    #[error("Length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Invalid value '{value}': {reason}")]
    InvalidValue { value: String, reason: String },
    #[error("Address of '{0}' is not resolved yet")]
    Unresolved(String),
    #[error("Property '{0}' has not been read yet")]
    NotRead(String),
    #[error("Property '{0}' is read-only")]
    ReadOnly(String),
    #[error("Hook failed: {0}")]
    Hook(#[from] HookError),
    #[error("Write to {address} failed: {source}")]
    Write {
        address: Address,
        #[source]
        source: DriverError,
    },
}

impl PropertyError {
    pub fn invalid_value(value: impl ToString, reason: impl Into<String>) -> Self {
        PropertyError::InvalidValue {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Configuration errors abort a mapper load instead of leaving a property stale.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PropertyError::InvalidExpression { .. }
                | PropertyError::InvalidBitSelector { .. }
                | PropertyError::InvalidLength { .. }
                | PropertyError::LengthTooLong { .. }
        )
    }
}
