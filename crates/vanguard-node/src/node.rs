//! Node wiring.

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{info, warn};
use vanguard_chain::{BlockType, Committee, Peer, VcBlock};
use vanguard_crypto::PubKey;
use vanguard_pow::{PowEngine, PowEngineConfig};
use vanguard_storage::{BlockLinkChain, BlockStore, Database};
use vanguard_viewchange::{
    update_retrieve_ds_committee_after_vc, NodeView, ProcessorConfig, ShardForwarder,
    ViewChangeProcessor, ViewChangeResult,
};

use crate::NodeConfig;

/// A wired node: storage, the committee under its lock, the view-change
/// processor, and the PoW engine.
pub struct Node {
    config: NodeConfig,
    committee: Arc<Mutex<Committee>>,
    view: Arc<Mutex<NodeView>>,
    block_store: BlockStore,
    block_link_chain: Arc<BlockLinkChain>,
    processor: ViewChangeProcessor,
    pow_engine: Arc<PowEngine>,
}

impl Node {
    /// Open storage and wire every subsystem.
    pub fn open(
        config: NodeConfig,
        committee: Committee,
        view: NodeView,
        self_key: PubKey,
        forwarder: Arc<dyn ShardForwarder>,
    ) -> Result<Self> {
        let db = Database::open(&config.data_dir).context("Failed to open node database")?;
        let block_store = BlockStore::new(db.clone());
        let block_link_chain =
            Arc::new(BlockLinkChain::open(db).context("Failed to open block link chain")?);

        let committee = Arc::new(Mutex::new(committee));
        let view = Arc::new(Mutex::new(view));

        let processor = ViewChangeProcessor::new(
            ProcessorConfig {
                vcblock_version: config.vcblock_version,
                consensus_object_timeout_ms: config.timeouts.consensus_object_timeout_ms,
                viewchange_time_ms: config.timeouts.viewchange_time_ms,
                viewchange_precheck_time_ms: config.timeouts.viewchange_precheck_time_ms,
                viewchange_extra_time_ms: config.timeouts.viewchange_extra_time_ms,
                timestamp_skew_ms: config.timeouts.timestamp_skew_ms,
                guard_mode: config.guard_mode,
                lookup_node_mode: config.lookup_node_mode,
                broadcast_treebased_cluster_mode: config.broadcast.treebased_cluster_mode,
                num_forwarded_block_receivers_per_shard: config
                    .broadcast
                    .num_forwarded_block_receivers_per_shard,
                num_ds_election: config.broadcast.num_ds_election,
                num_of_treebased_child_clusters: config
                    .broadcast
                    .num_of_treebased_child_clusters,
            },
            Arc::clone(&committee),
            Arc::clone(&view),
            block_store.clone(),
            Arc::clone(&block_link_chain),
            self_key,
            forwarder,
        );

        let pow_engine = Arc::new(PowEngine::new(PowEngineConfig {
            mining_workers: config.mining.workers,
            opencl_gpu_mine: config.mining.opencl_gpu_mine,
            cuda_gpu_mine: config.mining.cuda_gpu_mine,
        }));

        info!(node_name = %config.node_name, "Node wired");
        Ok(Self {
            config,
            committee,
            view,
            block_store,
            block_link_chain,
            processor,
            pow_engine,
        })
    }

    /// Handle a view-change block delivered by a peer.
    pub fn process_vc_block(
        &self,
        bytes: &[u8],
        offset: usize,
        from_peer: Peer,
    ) -> ViewChangeResult<()> {
        self.processor.process_vc_block(bytes, offset, from_peer)
    }

    /// Replay persisted view changes against a reconstructed committee.
    ///
    /// Walks the block links in index order; each VC link's stored block is
    /// re-applied with the key-only matcher (endpoints drift across
    /// restarts). A link whose body is missing is skipped with a WARN —
    /// that is the documented aftermath of a body write failing after its
    /// link landed, and resync restores the body later.
    pub fn replay_view_changes(&self, committee: &mut Committee) -> Result<usize> {
        let mut replayed = 0;
        for link in self.block_link_chain.iter_links()? {
            if link.block_type != BlockType::Vc {
                continue;
            }
            let Some(bytes) = self.block_store.get_vc_block(&link.block_hash)? else {
                warn!(
                    index = link.index,
                    block_hash = %link.block_hash,
                    "Linked view-change block has no stored body; skipping replay"
                );
                continue;
            };
            let vc_block = VcBlock::deserialize(&bytes, 0)
                .with_context(|| format!("Stored VC block {} is corrupt", link.block_hash))?;

            update_retrieve_ds_committee_after_vc(
                &vc_block,
                committee,
                self.config.guard_mode,
            );
            replayed += 1;
        }
        info!(replayed, "View-change replay complete");
        Ok(replayed)
    }

    /// Advance this node's epoch view.
    pub fn set_view(&self, current_epoch: u64, latest_ds_block_num: u64) {
        *self.view.lock() = NodeView {
            current_epoch,
            latest_ds_block_num,
        };
    }

    /// The committee under its lock.
    pub fn committee(&self) -> &Arc<Mutex<Committee>> {
        &self.committee
    }

    /// The PoW engine handle.
    pub fn pow_engine(&self) -> &Arc<PowEngine> {
        &self.pow_engine
    }

    /// The block store handle.
    pub fn block_store(&self) -> &BlockStore {
        &self.block_store
    }

    /// The block-link chain handle.
    pub fn block_link_chain(&self) -> &Arc<BlockLinkChain> {
        &self.block_link_chain
    }

    /// The loaded configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}
