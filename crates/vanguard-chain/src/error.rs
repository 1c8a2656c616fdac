//! Error types for chain data handling.

use thiserror::Error;

/// Chain data errors.
#[derive(Error, Debug)]
pub enum ChainError {
    /// Wire bytes were truncated or otherwise malformed.
    #[error("Malformed wire data: {0}")]
    Malformed(String),

    /// A declared length exceeded sane bounds.
    #[error("Length out of bounds: {field} = {len}")]
    LengthOutOfBounds { field: &'static str, len: usize },

    /// An enum discriminant was not recognized.
    #[error("Unknown {field} discriminant: {value}")]
    UnknownDiscriminant { field: &'static str, value: u8 },
}

/// Result type for chain data handling.
pub type ChainResult<T> = Result<T, ChainError>;
