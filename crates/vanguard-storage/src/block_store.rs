//! Durable view-change block storage.

use tracing::{debug, warn};
use vanguard_crypto::Hash256;

use crate::{ColumnFamily, Database, Storage, StorageError, StorageResult};

/// Hash-keyed store of serialized view-change blocks.
///
/// Puts are idempotent: re-storing a block under its hash with identical
/// bytes is a no-op, while differing bytes for the same hash is an error
/// (that state cannot arise when hashes are computed honestly, so it is
/// treated as corruption rather than overwritten).
#[derive(Clone)]
pub struct BlockStore {
    db: Database,
}

impl BlockStore {
    /// Wrap a database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Durably store a serialized view-change block under its hash.
    pub fn put_vc_block(&self, hash: &Hash256, bytes: &[u8]) -> StorageResult<()> {
        let key = hash.to_hex();
        if let Some(existing) = self.db.get(ColumnFamily::VcBlocks, key.as_bytes())? {
            if existing == bytes {
                debug!(block_hash = %hash, "VC block already stored, ignoring identical put");
                return Ok(());
            }
            warn!(block_hash = %hash, "Divergent bytes for an already-stored VC block");
            return Err(StorageError::DivergentOverwrite { key });
        }
        self.db.put(ColumnFamily::VcBlocks, key.as_bytes(), bytes)
    }

    /// Fetch the serialized block for a hash, if stored.
    pub fn get_vc_block(&self, hash: &Hash256) -> StorageResult<Option<Vec<u8>>> {
        self.db
            .get(ColumnFamily::VcBlocks, hash.to_hex().as_bytes())
    }

    /// Whether a block with this hash is stored.
    pub fn contains_vc_block(&self, hash: &Hash256) -> StorageResult<bool> {
        self.db
            .contains(ColumnFamily::VcBlocks, hash.to_hex().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vanguard_crypto::sha256;

    fn store() -> (BlockStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(tmp.path()).unwrap();
        (BlockStore::new(db), tmp)
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (store, _tmp) = store();
        let bytes = b"serialized vc block".to_vec();
        let hash = sha256(&bytes);

        store.put_vc_block(&hash, &bytes).unwrap();
        assert_eq!(store.get_vc_block(&hash).unwrap(), Some(bytes));
    }

    #[test]
    fn test_missing_is_none() {
        let (store, _tmp) = store();
        assert_eq!(store.get_vc_block(&sha256(b"nope")).unwrap(), None);
        assert!(!store.contains_vc_block(&sha256(b"nope")).unwrap());
    }

    #[test]
    fn test_identical_put_is_noop() {
        let (store, _tmp) = store();
        let bytes = b"block".to_vec();
        let hash = sha256(&bytes);

        store.put_vc_block(&hash, &bytes).unwrap();
        store.put_vc_block(&hash, &bytes).unwrap();
        assert_eq!(store.get_vc_block(&hash).unwrap(), Some(bytes));
    }

    #[test]
    fn test_divergent_put_is_error() {
        let (store, _tmp) = store();
        let hash = sha256(b"block");

        store.put_vc_block(&hash, b"block").unwrap();
        let err = store.put_vc_block(&hash, b"other bytes").unwrap_err();
        assert!(matches!(err, StorageError::DivergentOverwrite { .. }));

        // Original bytes survive.
        assert_eq!(store.get_vc_block(&hash).unwrap(), Some(b"block".to_vec()));
    }
}
