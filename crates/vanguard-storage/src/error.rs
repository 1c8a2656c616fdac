//! Error types for the storage layer.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB error.
    #[error("Database error: {0}")]
    Database(#[from] rocksdb::Error),

    /// Column family not found.
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// A second put for an existing key carried different bytes.
    #[error("Divergent overwrite for key {key}")]
    DivergentOverwrite { key: String },

    /// A block link was submitted out of sequence.
    #[error("Non-contiguous block link index: got {got}, expected {expected}")]
    NonContiguousIndex { got: u64, expected: u64 },

    /// Stored bytes failed to decode.
    #[error("Data corruption detected: {0}")]
    Corruption(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
