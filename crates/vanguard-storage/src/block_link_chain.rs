//! The append-only block-link chain.

use parking_lot::Mutex;
use tracing::{debug, warn};
use vanguard_chain::BlockLink;

use crate::{ColumnFamily, Database, Storage, StorageError, StorageResult};

/// Append-only index of every finalized block (DS, VC, FB), keyed by a
/// dense monotonic position.
///
/// Indices start at 0 and never skip: an append must carry
/// `latest_index() + 1` (or 0 into an empty chain). A link may exist whose
/// block body is not locally stored — that happens when a body write fails
/// after its link landed — and readers of the chain must treat such links
/// as "known but not present" until resync restores the body.
pub struct BlockLinkChain {
    db: Database,
    /// Highest assigned index; `None` while the chain is empty. Guarded so
    /// that concurrent appends serialize their contiguity check.
    latest: Mutex<Option<u64>>,
}

impl BlockLinkChain {
    /// Open the chain, recovering the latest index from storage.
    pub fn open(db: Database) -> StorageResult<Self> {
        let mut latest: Option<u64> = None;
        for (key, _) in db.iter(ColumnFamily::BlockLinks)? {
            let arr: [u8; 8] = key.as_slice().try_into().map_err(|_| {
                StorageError::Corruption(format!("block link key of length {}", key.len()))
            })?;
            latest = Some(u64::from_be_bytes(arr));
        }
        debug!(?latest, "Block link chain opened");
        Ok(Self {
            db,
            latest: Mutex::new(latest),
        })
    }

    /// Highest assigned index, or `None` when the chain is empty.
    pub fn latest_index(&self) -> Option<u64> {
        *self.latest.lock()
    }

    /// The index the next link must carry.
    pub fn next_index(&self) -> u64 {
        self.latest.lock().map_or(0, |i| i + 1)
    }

    /// Append a link. Rejects any index other than `latest + 1` (or 0 into
    /// an empty chain).
    pub fn add_block_link(&self, link: &BlockLink) -> StorageResult<()> {
        let mut latest = self.latest.lock();
        let expected = latest.map_or(0, |i| i + 1);
        if link.index != expected {
            warn!(
                got = link.index,
                expected, "Rejecting non-contiguous block link"
            );
            return Err(StorageError::NonContiguousIndex {
                got: link.index,
                expected,
            });
        }

        self.db.put(
            ColumnFamily::BlockLinks,
            &link.index.to_be_bytes(),
            &link.serialize_value(),
        )?;
        *latest = Some(link.index);
        debug!(
            index = link.index,
            ds_epoch = link.ds_epoch,
            block_type = ?link.block_type,
            block_hash = %link.block_hash,
            "Block link appended"
        );
        Ok(())
    }

    /// Fetch the link at an index.
    pub fn get_block_link(&self, index: u64) -> StorageResult<Option<BlockLink>> {
        match self.db.get(ColumnFamily::BlockLinks, &index.to_be_bytes())? {
            Some(value) => BlockLink::deserialize_value(index, &value)
                .map(Some)
                .map_err(|e| StorageError::Corruption(e.to_string())),
            None => Ok(None),
        }
    }

    /// All links in index order, for recovery scans.
    pub fn iter_links(&self) -> StorageResult<Vec<BlockLink>> {
        let mut links = Vec::new();
        for (key, value) in self.db.iter(ColumnFamily::BlockLinks)? {
            let arr: [u8; 8] = key.as_slice().try_into().map_err(|_| {
                StorageError::Corruption(format!("block link key of length {}", key.len()))
            })?;
            let index = u64::from_be_bytes(arr);
            let link = BlockLink::deserialize_value(index, &value)
                .map_err(|e| StorageError::Corruption(e.to_string()))?;
            links.push(link);
        }
        Ok(links)
    }
}
