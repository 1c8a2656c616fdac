//! Epoch-dependent cache and dataset sizing.
//!
//! Sizes grow linearly with the epoch and are then lowered to the largest
//! value whose item count is prime, which keeps the hashimoto access
//! pattern free of short cycles.

use super::{
    CACHE_BYTES_GROWTH, CACHE_BYTES_INIT, DATASET_BYTES_GROWTH, DATASET_BYTES_INIT, EPOCH_LENGTH,
    HASH_BYTES, MIX_BYTES,
};

/// Epoch a block number belongs to.
pub fn epoch_number(block_number: u64) -> u64 {
    block_number / EPOCH_LENGTH
}

/// Light cache size in bytes for an epoch.
pub fn cache_size(epoch: u64) -> u64 {
    let mut size = CACHE_BYTES_INIT + CACHE_BYTES_GROWTH * epoch - HASH_BYTES as u64;
    while !is_prime(size / HASH_BYTES as u64) {
        size -= 2 * HASH_BYTES as u64;
    }
    size
}

/// Full dataset size in bytes for an epoch.
pub fn full_dataset_size(epoch: u64) -> u64 {
    let mut size = DATASET_BYTES_INIT + DATASET_BYTES_GROWTH * epoch - MIX_BYTES as u64;
    while !is_prime(size / MIX_BYTES as u64) {
        size -= 2 * MIX_BYTES as u64;
    }
    size
}

/// Trial-division primality; the candidates here are below 2^32.
fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3u64;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}
