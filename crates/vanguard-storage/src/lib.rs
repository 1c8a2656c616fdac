//! # vanguard-storage
//!
//! Persistence layer for the Vanguard node.
//!
//! This crate provides a RocksDB-based storage abstraction with:
//! - Column families for the persisted data classes
//! - [`BlockStore`]: durable hash → view-change-block mapping with
//!   idempotent puts
//! - [`BlockLinkChain`]: the append-only, gap-free index of finalized
//!   blocks, iterable in index order for recovery scans
//!
//! ## Column families
//!
//! - `vcblock`: hex-encoded block hash → serialized view-change block
//! - `blocklink`: big-endian u64 index → `(ds_epoch, type, hash)`
//! - `metadata`: node metadata
//!
//! Individual puts are crash-consistent: each goes through the RocksDB WAL
//! and is either fully visible or invisible after restart.

mod block_link_chain;
mod block_store;
mod database;
mod error;

pub use block_link_chain::BlockLinkChain;
pub use block_store::BlockStore;
pub use database::{ColumnFamily, Database};
pub use error::{StorageError, StorageResult};

/// Storage trait abstracting database operations, for testing with mock
/// implementations.
pub trait Storage: Send + Sync {
    /// Get a value by key from a column family.
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Put a key-value pair into a column family.
    fn put(&self, cf: ColumnFamily, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Check if a key exists in a column family.
    fn contains(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(cf, key)?.is_some())
    }

    /// Create an iterator over a column family in key order.
    fn iter(&self, cf: ColumnFamily)
        -> StorageResult<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>>;
}
