//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// A public key did not decode to a valid curve point.
    #[error("Malformed public key: {0}")]
    MalformedPubKey(String),

    /// A signature scalar was not canonical.
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Key aggregation was asked to aggregate nothing.
    #[error("Cannot aggregate an empty key set")]
    EmptyKeySet,
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
