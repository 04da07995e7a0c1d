use thiserror::Error;

/// Errors from parsing identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("object id is not valid hex: {0}")]
    InvalidHex(String),

    #[error("object id must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
