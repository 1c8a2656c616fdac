//! The view-change block processor.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use vanguard_chain::{
    build_node_envelope, num_for_consensus, BlockLink, BlockType, Committee, NodeInstruction,
    Peer, VcBlock,
};
use vanguard_crypto::{aggregate_pub_keys, multi_sig_verify, PubKey};
use vanguard_storage::{BlockLinkChain, BlockStore};

use crate::{
    forwarding_cluster_size, update_ds_committee_after_vc, ShardForwarder, ViewChangeError,
    ViewChangeResult,
};

/// Stages a block passes on its way to acceptance; used in structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceStage {
    /// Raw bytes arrived from a peer.
    Received,
    /// Bytes parsed into a block.
    Parsed,
    /// All validation checks passed.
    Validated,
    /// Block link and body are durable.
    Persisted,
    /// Committee mutation applied.
    Applied,
}

/// This node's view of chain progress, used for freshness gating.
#[derive(Debug, Clone, Copy)]
pub struct NodeView {
    /// The epoch the node is currently in.
    pub current_epoch: u64,
    /// Highest DS block number seen.
    pub latest_ds_block_num: u64,
}

impl NodeView {
    /// Whether a block stamped `(ds_epoch, epoch)` strictly advances this
    /// view.
    pub fn check_whether_block_is_latest(&self, ds_epoch: u64, epoch: u64) -> bool {
        if ds_epoch < self.latest_ds_block_num + 1 {
            warn!(
                ds_epoch,
                latest_ds_block_num = self.latest_ds_block_num,
                "Block DS epoch is behind this node"
            );
            return false;
        }
        if epoch < self.current_epoch {
            warn!(
                epoch,
                current_epoch = self.current_epoch,
                "Block epoch is behind this node"
            );
            return false;
        }
        true
    }
}

/// Processor configuration; every knob maps to a recognized node option.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Expected view-change block version tag.
    pub vcblock_version: u32,
    /// Consensus object lifetime, milliseconds.
    pub consensus_object_timeout_ms: u64,
    /// View-change round duration, milliseconds.
    pub viewchange_time_ms: u64,
    /// View-change precheck duration, milliseconds.
    pub viewchange_precheck_time_ms: u64,
    /// Extra view-change allowance, milliseconds.
    pub viewchange_extra_time_ms: u64,
    /// Forward clock-skew tolerance, milliseconds.
    pub timestamp_skew_ms: u64,
    /// Committee pinned for bootstrap.
    pub guard_mode: bool,
    /// This node serves lookups and does not gossip to shards.
    pub lookup_node_mode: bool,
    /// Tree-based block broadcast enabled.
    pub broadcast_treebased_cluster_mode: bool,
    /// Primary receivers per shard for forwarded blocks.
    pub num_forwarded_block_receivers_per_shard: u32,
    /// DS election size.
    pub num_ds_election: u32,
    /// Child clusters per tree-broadcast hop.
    pub num_of_treebased_child_clusters: u32,
}

impl ProcessorConfig {
    /// Width of the backward acceptance window in microseconds.
    fn acceptance_window_micros(&self) -> u64 {
        (self.consensus_object_timeout_ms
            + self.viewchange_time_ms
            + self.viewchange_precheck_time_ms
            + self.viewchange_extra_time_ms)
            * 1_000
    }
}

/// Validates, persists and applies view-change blocks.
pub struct ViewChangeProcessor {
    config: ProcessorConfig,
    committee: Arc<Mutex<Committee>>,
    view: Arc<Mutex<NodeView>>,
    block_store: BlockStore,
    block_link_chain: Arc<BlockLinkChain>,
    self_key: PubKey,
    forwarder: Arc<dyn ShardForwarder>,
}

impl ViewChangeProcessor {
    /// Wire up a processor.
    pub fn new(
        config: ProcessorConfig,
        committee: Arc<Mutex<Committee>>,
        view: Arc<Mutex<NodeView>>,
        block_store: BlockStore,
        block_link_chain: Arc<BlockLinkChain>,
        self_key: PubKey,
        forwarder: Arc<dyn ShardForwarder>,
    ) -> Self {
        Self {
            config,
            committee,
            view,
            block_store,
            block_link_chain,
            self_key,
            forwarder,
        }
    }

    /// Parse, validate and commit one view-change block from
    /// `bytes[offset..]`.
    ///
    /// Either the block commits fully (link, body, committee rotation) or
    /// the call fails with a typed reason and no state change — with the
    /// single documented exception that a body-write failure leaves its
    /// already-durable link behind for resync to reconcile.
    pub fn process_vc_block(
        &self,
        bytes: &[u8],
        offset: usize,
        from_peer: Peer,
    ) -> ViewChangeResult<()> {
        debug!(%from_peer, len = bytes.len(), offset, stage = ?AcceptanceStage::Received,
            "Processing view-change block");

        let vc_block = VcBlock::deserialize(bytes, offset)?;
        debug!(block_hash = %vc_block.block_hash, stage = ?AcceptanceStage::Parsed,
            "View-change block parsed");

        if vc_block.header.version != self.config.vcblock_version {
            warn!(
                got = vc_block.header.version,
                expected = self.config.vcblock_version,
                "View-change block version check failed"
            );
            return Err(ViewChangeError::Version {
                got: vc_block.header.version,
                expected: self.config.vcblock_version,
            });
        }

        // A view change raised while a DS block was being agreed is applied
        // together with that DS block elsewhere; accepting it alone would
        // split the committee mutation from the DS-block validation.
        if vc_block.header.vc_state.is_ds_block_state() {
            warn!(
                state = ?vc_block.header.vc_state,
                epoch = vc_block.header.vc_epoch_no,
                "View-change block for a DS-block state arrived on the standalone path"
            );
            return Err(ViewChangeError::Phase);
        }

        self.process_vc_block_core(&vc_block)?;

        if !self.config.lookup_node_mode && self.config.broadcast_treebased_cluster_mode {
            // Re-serialize rather than echoing `bytes`: the incoming buffer
            // may carry suffix data beyond the parsed block.
            let message =
                build_node_envelope(NodeInstruction::VcBlock, &vc_block.serialize());
            let cluster_size = forwarding_cluster_size(
                self.config.num_forwarded_block_receivers_per_shard,
                self.config.num_ds_election,
            );
            self.forwarder.send_to_shard_nodes(
                message,
                cluster_size,
                self.config.num_of_treebased_child_clusters,
            );
        }

        info!(
            block_hash = %vc_block.block_hash,
            candidate_leader = %vc_block.header.candidate_leader_pub_key,
            "View of the DS leader successfully changed"
        );
        Ok(())
    }

    /// The validation pipeline and commit for one parsed block.
    fn process_vc_block_core(&self, vc_block: &VcBlock) -> ViewChangeResult<()> {
        let header = &vc_block.header;

        let view = *self.view.lock();
        if header.vc_epoch_no != view.current_epoch {
            return Err(ViewChangeError::Stale(format!(
                "block epoch {} is not the current epoch {}",
                header.vc_epoch_no, view.current_epoch
            )));
        }

        if !view.check_whether_block_is_latest(header.vc_ds_epoch_no, header.vc_epoch_no) {
            return Err(ViewChangeError::Stale(format!(
                "({}, {}) does not advance ({}, {})",
                header.vc_ds_epoch_no,
                header.vc_epoch_no,
                view.latest_ds_block_num,
                view.current_epoch
            )));
        }

        let computed_hash = header.compute_hash();
        if computed_hash != vc_block.block_hash {
            return Err(ViewChangeError::Integrity(format!(
                "block hash mismatch: calculated {computed_hash}, received {}",
                vc_block.block_hash
            )));
        }

        if self.block_store.contains_vc_block(&vc_block.block_hash)? {
            debug!(block_hash = %vc_block.block_hash, "Duplicate view-change block");
            return Err(ViewChangeError::Duplicate(vc_block.block_hash));
        }

        self.verify_timestamp(header.timestamp_micros)?;

        // Everything from the committee-hash check through the committee
        // rotation happens under the one committee lock.
        let mut committee = self.committee.lock();

        let committee_hash = committee.snapshot_hash();
        if committee_hash != header.committee_hash {
            return Err(ViewChangeError::Integrity(format!(
                "committee hash mismatch: calculated {committee_hash}, received {}",
                header.committee_hash
            )));
        }

        self.verify_vc_block_cosignature(vc_block, &committee)?;
        debug!(block_hash = %vc_block.block_hash, stage = ?AcceptanceStage::Validated,
            "View-change block validated");

        let link = BlockLink {
            index: self.block_link_chain.next_index(),
            ds_epoch: header.vc_ds_epoch_no,
            block_type: BlockType::Vc,
            block_hash: vc_block.block_hash,
        };
        self.block_link_chain.add_block_link(&link)?;

        if let Err(e) = self
            .block_store
            .put_vc_block(&vc_block.block_hash, &vc_block.serialize())
        {
            // The link is already durable; resync reconciles a link whose
            // body is missing.
            warn!(block_hash = %vc_block.block_hash, error = %e,
                "Failed to store view-change block body after linking it");
            return Err(e.into());
        }
        debug!(block_hash = %vc_block.block_hash, stage = ?AcceptanceStage::Persisted,
            "View-change block persisted");

        update_ds_committee_after_vc(
            vc_block,
            &mut committee,
            &self.self_key,
            self.config.guard_mode,
        );
        debug!(block_hash = %vc_block.block_hash, stage = ?AcceptanceStage::Applied,
            "DS committee updated");

        if self.config.lookup_node_mode {
            info!(
                ds_epoch = header.vc_ds_epoch_no,
                tx_epoch = header.vc_epoch_no,
                leader = %header.candidate_leader_peer,
                "VCBLK accepted"
            );
            for faulty in &header.faulty_leaders {
                info!(faulty = %faulty.peer, "VCBLK faulty leader");
            }
        }

        Ok(())
    }

    /// Check the round-two cosignature: exact signer count and aggregate
    /// verification over `header ‖ cs1 ‖ b1`.
    fn verify_vc_block_cosignature(
        &self,
        vc_block: &VcBlock,
        committee: &Committee,
    ) -> ViewChangeResult<()> {
        if vc_block.b2.len() != committee.len() {
            return Err(ViewChangeError::Cosig(format!(
                "committee size {} does not match bitmap size {}",
                committee.len(),
                vc_block.b2.len()
            )));
        }

        let mut keys: Vec<PubKey> = Vec::with_capacity(committee.len());
        for (member, signed) in committee.iter().zip(vc_block.b2.iter()) {
            if signed {
                keys.push(member.pub_key);
            }
        }

        // The consensus protocol emits exactly the threshold set; both an
        // undercount and an overcount are rejected.
        let required = num_for_consensus(vc_block.b2.len());
        if keys.len() != required {
            return Err(ViewChangeError::Cosig(format!(
                "cosignature carries {} signers, consensus requires exactly {}",
                keys.len(),
                required
            )));
        }

        let aggregated = aggregate_pub_keys(&keys)
            .map_err(|e| ViewChangeError::Cosig(format!("key aggregation failed: {e}")))?;

        if !multi_sig_verify(&vc_block.cosig_message(), &vc_block.cs2, &aggregated) {
            return Err(ViewChangeError::Cosig(
                "aggregate signature verification failed".into(),
            ));
        }
        Ok(())
    }

    /// Accept only timestamps inside
    /// `[now − acceptance window, now + skew]`.
    fn verify_timestamp(&self, timestamp_micros: u64) -> ViewChangeResult<()> {
        let now_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        let lo = now_micros.saturating_sub(self.config.acceptance_window_micros());
        let hi = now_micros + self.config.timestamp_skew_ms * 1_000;

        if timestamp_micros < lo || timestamp_micros > hi {
            warn!(timestamp_micros, lo, hi, "View-change block timestamp out of window");
            return Err(ViewChangeError::Timestamp {
                timestamp_micros,
                lo,
                hi,
            });
        }
        Ok(())
    }
}
