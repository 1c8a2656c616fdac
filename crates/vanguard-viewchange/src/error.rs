//! Rejection reasons for view-change processing.

use thiserror::Error;

/// Why a view-change block was rejected. Each variant is one stage of the
/// validation pipeline; a rejection carries no side effects.
#[derive(Error, Debug)]
pub enum ViewChangeError {
    /// The bytes did not parse as a view-change block.
    #[error("Parse: {0}")]
    Parse(#[from] vanguard_chain::ChainError),

    /// Wrong protocol version tag.
    #[error("Version: got {got}, expected {expected}")]
    Version { got: u32, expected: u32 },

    /// The view change preceded a DS block and is applied with that block
    /// by a different path.
    #[error("Phase: view change in a DS-block state is processed with the DS block")]
    Phase,

    /// The block's epochs do not advance this node's view.
    #[error("Stale: {0}")]
    Stale(String),

    /// A hash binding failed (block hash or committee hash).
    #[error("Integrity: {0}")]
    Integrity(String),

    /// The block is already persisted.
    #[error("Duplicate: block {0} already stored")]
    Duplicate(vanguard_crypto::Hash256),

    /// The timestamp is outside the acceptance window.
    #[error("Timestamp: {timestamp_micros} outside [{lo}, {hi}]")]
    Timestamp {
        timestamp_micros: u64,
        lo: u64,
        hi: u64,
    },

    /// The cosignature was not produced by exactly the required signer set,
    /// or failed verification.
    #[error("Cosig: {0}")]
    Cosig(String),

    /// A durable write failed; the block link may already be persisted and
    /// will be reconciled by resync.
    #[error("Persistence: {0}")]
    Persistence(#[from] vanguard_storage::StorageError),
}

/// Result type for view-change processing.
pub type ViewChangeResult<T> = Result<T, ViewChangeError>;
