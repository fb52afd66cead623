// Tue Feb 17 2026 - Alex

use thiserror::Error;

/// Malformed address expression. Raised once when a mapper is loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("Empty address expression")]
    Empty,
    #[error("Unexpected character '{0}' at column {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Invalid number literal '{0}' at column {1}")]
    InvalidNumber(String, usize),
    #[error("Unexpected token '{0}' at column {1}")]
    UnexpectedToken(String, usize),
    #[error("Unexpected end of expression, expected {0}")]
    UnexpectedEnd(String),
}
