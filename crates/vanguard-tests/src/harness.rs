//! Test harness for integration tests.
//!
//! Provides temporary databases and fully wired nodes backed by them.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use vanguard_chain::Committee;
use vanguard_crypto::{KeyPair, PubKey};
use vanguard_node::{Node, NodeConfig};
use vanguard_storage::{BlockLinkChain, BlockStore, Database};
use vanguard_viewchange::{NodeView, NullForwarder};

/// Test database wrapper that cleans up on drop.
pub struct TestDatabase {
    db: Database,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new test database in a temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(temp_dir.path()).expect("Failed to open database");
        Self {
            db,
            _temp_dir: temp_dir,
        }
    }

    /// Path to the database directory.
    pub fn path(&self) -> PathBuf {
        self._temp_dir.path().to_path_buf()
    }

    /// A block store over this database.
    pub fn block_store(&self) -> BlockStore {
        BlockStore::new(self.db.clone())
    }

    /// A block-link chain over this database.
    pub fn block_link_chain(&self) -> BlockLinkChain {
        BlockLinkChain::open(self.db.clone()).expect("Failed to open block link chain")
    }

    /// The underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// A wired node over a temporary data directory.
pub struct TestNode {
    /// The node under test.
    pub node: Node,
    /// The node's own keypair.
    pub self_keypair: KeyPair,
    _temp_dir: TempDir,
}

impl TestNode {
    /// Wire a node with the given committee and epoch view.
    pub fn new(committee: Committee, current_epoch: u64, latest_ds_block_num: u64) -> Self {
        Self::with_config_tweak(committee, current_epoch, latest_ds_block_num, |_| {})
    }

    /// Wire a node, adjusting the default configuration first.
    pub fn with_config_tweak<F>(
        committee: Committee,
        current_epoch: u64,
        latest_ds_block_num: u64,
        tweak: F,
    ) -> Self
    where
        F: FnOnce(&mut NodeConfig),
    {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut config = NodeConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..NodeConfig::default()
        };
        tweak(&mut config);

        let self_keypair = KeyPair::generate();
        let node = Node::open(
            config,
            committee,
            NodeView {
                current_epoch,
                latest_ds_block_num,
            },
            self_keypair.public,
            Arc::new(NullForwarder),
        )
        .expect("Failed to open node");

        Self {
            node,
            self_keypair,
            _temp_dir: temp_dir,
        }
    }

    /// This node's public key.
    pub fn self_key(&self) -> PubKey {
        self.self_keypair.public
    }
}
