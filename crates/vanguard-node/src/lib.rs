//! # vanguard-node
//!
//! Configuration loading and subsystem wiring for the Vanguard node.
//!
//! The embedding binary loads a [`NodeConfig`], constructs a [`Node`], and
//! feeds it peer messages. All engines are explicit handles owned by the
//! node; nothing in the workspace is a process-wide singleton.

mod config;
mod node;

pub use config::{
    BroadcastConfig, MiningConfig, NodeConfig, TimeoutConfig, DEFAULT_EXPECTED_NODES,
};
pub use node::Node;

/// Initialize tracing for the node process, honoring `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}
