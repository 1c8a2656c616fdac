//! Ethash.
//!
//! The memory-hard PoW function combining Keccak and a pseudo-random
//! dataset. Per epoch (30,000 blocks) a light cache is derived from a
//! deterministic seed; the full dataset is derived from the cache. Light
//! verification computes dataset items on demand; full-dataset mining
//! materializes them once.
//!
//! Parameters follow the reference implementation exactly — the dataset and
//! cache sizes are pinned by test vectors, and the known-block hashes from
//! the POC-9 testnet reproduce bit-for-bit.

mod cache;
mod hashimoto;
mod sizes;

pub use cache::{build_light_cache, calc_dataset_item, epoch_seed, EpochContext};
pub use hashimoto::{hashimoto_full, hashimoto_light, EthashResult};
pub use sizes::{cache_size, epoch_number, full_dataset_size};

/// Blocks per Ethash epoch.
pub const EPOCH_LENGTH: u64 = 30_000;

/// Bytes of the hashimoto mix.
pub const MIX_BYTES: usize = 128;

/// Bytes per dataset/cache item (one Keccak-512 output).
pub const HASH_BYTES: usize = 64;

/// Bytes per mix word.
pub const WORD_BYTES: usize = 4;

/// Dataset size at epoch 0 before prime adjustment (2^30).
pub const DATASET_BYTES_INIT: u64 = 1 << 30;

/// Dataset growth per epoch (2^23).
pub const DATASET_BYTES_GROWTH: u64 = 1 << 23;

/// Cache size at epoch 0 before prime adjustment (2^24).
pub const CACHE_BYTES_INIT: u64 = 1 << 24;

/// Cache growth per epoch (2^17).
pub const CACHE_BYTES_GROWTH: u64 = 1 << 17;

/// Rounds of the cache generation memo-hash.
pub const CACHE_ROUNDS: usize = 3;

/// Dataset accesses per hashimoto invocation.
pub const ACCESSES: usize = 64;

/// Cache parents mixed into each dataset item.
pub const DATASET_PARENTS: u32 = 256;
