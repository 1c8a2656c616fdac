//! # vanguard-chain
//!
//! Core chain types for the Vanguard node:
//!
//! - [`Peer`] network endpoints, including the `0.0.0.0` self sentinel used
//!   for committee self-identification after restart
//! - [`Committee`], the ordered DS committee (leader at index 0) and its
//!   canonical snapshot hash
//! - [`VcBlock`] / [`VcBlockHeader`], the view-change certificate and its
//!   fixed wire layout
//! - [`BitVector`], the signer bitmap carried alongside cosignatures
//! - [`BlockLink`], the append-only index entry tying every finalized block
//!   to its position, epoch and type
//! - message envelope constants for NODE/VCBLOCK gossip

mod bitvector;
mod blocklink;
mod committee;
mod error;
mod message;
mod peer;
mod vcblock;

pub use bitvector::BitVector;
pub use blocklink::{BlockLink, BlockType};
pub use committee::{num_for_consensus, Committee, CommitteeMember};
pub use error::{ChainError, ChainResult};
pub use message::{
    build_node_envelope, MessageType, NodeInstruction, MESSAGE_BODY_OFFSET,
};
pub use peer::Peer;
pub use vcblock::{VcBlock, VcBlockHeader, ViewChangeState, VCBLOCK_VERSION};
