//! Node configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default expected whole-network node population for difficulty
/// retargeting.
pub const DEFAULT_EXPECTED_NODES: i64 = 10_000;

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name.
    pub node_name: String,
    /// Data directory.
    pub data_dir: PathBuf,
    /// View-change block protocol version accepted by this node.
    #[serde(default = "default_vcblock_version")]
    pub vcblock_version: u32,
    /// Committee pinned for bootstrap.
    #[serde(default)]
    pub guard_mode: bool,
    /// This node serves lookups; no shard gossip.
    #[serde(default)]
    pub lookup_node_mode: bool,
    /// Consensus and view-change timing.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Tree-based broadcast settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    /// PoW and difficulty settings.
    #[serde(default)]
    pub mining: MiningConfig,
}

fn default_vcblock_version() -> u32 {
    vanguard_chain::VCBLOCK_VERSION
}

/// Consensus and view-change timing, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Consensus object lifetime.
    pub consensus_object_timeout_ms: u64,
    /// View-change round duration.
    pub viewchange_time_ms: u64,
    /// View-change precheck duration.
    pub viewchange_precheck_time_ms: u64,
    /// Extra view-change allowance.
    pub viewchange_extra_time_ms: u64,
    /// Forward clock-skew tolerance.
    pub timestamp_skew_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            consensus_object_timeout_ms: 10_000,
            viewchange_time_ms: 60_000,
            viewchange_precheck_time_ms: 10_000,
            viewchange_extra_time_ms: 30_000,
            timestamp_skew_ms: 5_000,
        }
    }
}

/// Tree-based broadcast settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Tree-based cluster broadcast enabled.
    pub treebased_cluster_mode: bool,
    /// Primary receivers per shard for forwarded blocks.
    pub num_forwarded_block_receivers_per_shard: u32,
    /// DS election size.
    pub num_ds_election: u32,
    /// Child clusters per tree-broadcast hop.
    pub num_of_treebased_child_clusters: u32,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            treebased_cluster_mode: true,
            num_forwarded_block_receivers_per_shard: 10,
            num_ds_election: 2,
            num_of_treebased_child_clusters: 3,
        }
    }
}

/// PoW and difficulty settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Mining worker threads; 0 selects the available parallelism.
    pub workers: usize,
    /// OpenCL mining requested.
    pub opencl_gpu_mine: bool,
    /// CUDA mining requested.
    pub cuda_gpu_mine: bool,
    /// Minimum difficulty level.
    pub min_difficulty: u8,
    /// Expected whole-network node population.
    pub expected_nodes: i64,
    /// Cap on the difficulty noise threshold.
    pub difficulty_adjust_threshold: u32,
    /// Epochs per year, for the annual difficulty bonus.
    pub num_blocks_per_year: i64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            opencl_gpu_mine: false,
            cuda_gpu_mine: false,
            min_difficulty: 3,
            expected_nodes: DEFAULT_EXPECTED_NODES,
            difficulty_adjust_threshold: 99,
            num_blocks_per_year: 1_971_000,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_name: "vanguard-node".to_string(),
            data_dir: PathBuf::from(".vanguard"),
            vcblock_version: default_vcblock_version(),
            guard_mode: false,
            lookup_node_mode: false,
            timeouts: TimeoutConfig::default(),
            broadcast: BroadcastConfig::default(),
            mining: MiningConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file, or defaults when the file does
    /// not exist.
    pub fn load(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
