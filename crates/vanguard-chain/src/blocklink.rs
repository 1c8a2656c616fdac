//! Block-link entries.

use bytes::{Buf, BufMut};
use vanguard_crypto::{Hash256, HASH_SIZE};

use crate::{ChainError, ChainResult};

/// Kind of finalized block a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockType {
    /// Directory-service block.
    Ds = 0,
    /// View-change block.
    Vc = 1,
    /// Final (micro-aggregating) block.
    Fb = 2,
}

impl BlockType {
    /// Parse a stored discriminant.
    pub fn from_u8(value: u8) -> ChainResult<Self> {
        match value {
            0 => Ok(BlockType::Ds),
            1 => Ok(BlockType::Vc),
            2 => Ok(BlockType::Fb),
            other => Err(ChainError::UnknownDiscriminant {
                field: "block type",
                value: other,
            }),
        }
    }
}

/// One entry of the append-only block-link chain: a finalized block's dense
/// position, its DS epoch, its kind, and its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLink {
    /// Dense monotonic position; no gaps are ever admitted.
    pub index: u64,
    /// DS epoch the block belongs to.
    pub ds_epoch: u64,
    /// Block kind.
    pub block_type: BlockType,
    /// Hash of the linked block.
    pub block_hash: Hash256,
}

impl BlockLink {
    /// Stored value form: `ds_epoch ‖ type ‖ hash` (the index is the key).
    pub fn serialize_value(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 1 + HASH_SIZE);
        buf.put_u64(self.ds_epoch);
        buf.put_u8(self.block_type as u8);
        buf.put_slice(self.block_hash.as_bytes());
        buf
    }

    /// Rebuild an entry from its key and stored value.
    pub fn deserialize_value(index: u64, mut value: &[u8]) -> ChainResult<Self> {
        if value.len() != 8 + 1 + HASH_SIZE {
            return Err(ChainError::Malformed("block link value size".into()));
        }
        let ds_epoch = value.get_u64();
        let block_type = BlockType::from_u8(value.get_u8())?;
        let mut hash = [0u8; HASH_SIZE];
        value.copy_to_slice(&mut hash);
        Ok(Self {
            index,
            ds_epoch,
            block_type,
            block_hash: Hash256(hash),
        })
    }
}
