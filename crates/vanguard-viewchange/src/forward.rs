//! Forwarding accepted blocks to shard peers.

use tracing::debug;

/// Sink for tree-based broadcast of accepted blocks. The transport lives
/// outside this crate; the processor only hands over a fully framed
/// message.
pub trait ShardForwarder: Send + Sync {
    /// Forward a framed message to `cluster_size` primary receivers, each
    /// fanning out to `child_clusters` child clusters.
    fn send_to_shard_nodes(&self, message: Vec<u8>, cluster_size: u32, child_clusters: u32);
}

/// Forwarder that drops everything; used by lookup nodes and tests.
pub struct NullForwarder;

impl ShardForwarder for NullForwarder {
    fn send_to_shard_nodes(&self, _message: Vec<u8>, cluster_size: u32, child_clusters: u32) {
        debug!(cluster_size, child_clusters, "Forwarding disabled, dropping message");
    }
}

/// Primary receiver count for forwarded blocks. The configured receiver
/// count must exceed the DS election size; too-small configurations are
/// widened rather than rejected.
pub fn forwarding_cluster_size(receivers_per_shard: u32, num_ds_election: u32) -> u32 {
    if receivers_per_shard <= num_ds_election {
        tracing::warn!(
            receivers_per_shard,
            num_ds_election,
            "Forwarded-block receiver count not above DS election size; widening cluster"
        );
        num_ds_election + 1
    } else {
        receivers_per_shard
    }
}
