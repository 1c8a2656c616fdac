//! The hashimoto aggregation loop.

use sha3::{Digest, Keccak256, Keccak512};

use super::cache::{calc_dataset_item, fnv};
use super::{ACCESSES, HASH_BYTES, MIX_BYTES, WORD_BYTES};

/// Mix words per hashimoto round.
const MIX_WORDS: usize = MIX_BYTES / WORD_BYTES;

/// 64-byte items per 128-byte mix page.
const MIX_HASHES: usize = MIX_BYTES / HASH_BYTES;

/// Outcome of one ethash evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthashResult {
    /// The boundary-checked final hash.
    pub final_hash: [u8; 32],
    /// The compressed mix, committing to the dataset accesses.
    pub mix_hash: [u8; 32],
}

/// Core hashimoto: seed from header and nonce, 64 dataset page accesses,
/// mix compression, final Keccak-256.
///
/// `full_items` is the number of 64-byte items in the epoch's full dataset;
/// `lookup` resolves one item by index.
fn hashimoto<F>(header_hash: &[u8; 32], nonce: u64, full_items: usize, lookup: F) -> EthashResult
where
    F: Fn(u32) -> [u8; HASH_BYTES],
{
    // Seed: Keccak-512 over the header hash and the little-endian nonce.
    let mut seed_input = [0u8; 40];
    seed_input[..32].copy_from_slice(header_hash);
    seed_input[32..].copy_from_slice(&nonce.to_le_bytes());
    let seed: [u8; HASH_BYTES] = Keccak512::digest(seed_input).into();
    let seed_head = u32::from_le_bytes(seed[..4].try_into().unwrap());

    // Start the mix as the seed replicated across the mix width.
    let mut mix = [0u32; MIX_WORDS];
    for (i, chunk) in seed.chunks_exact(4).enumerate() {
        let word = u32::from_le_bytes(chunk.try_into().unwrap());
        mix[i] = word;
        mix[i + HASH_BYTES / WORD_BYTES] = word;
    }

    let pages = (full_items / MIX_HASHES) as u32;
    for i in 0..ACCESSES as u32 {
        let page = fnv(i ^ seed_head, mix[i as usize % MIX_WORDS]) % pages;
        let first_item = page * MIX_HASHES as u32;
        for j in 0..MIX_HASHES {
            let item = lookup(first_item + j as u32);
            for (w, chunk) in mix[j * 16..(j + 1) * 16]
                .iter_mut()
                .zip(item.chunks_exact(4))
            {
                *w = fnv(*w, u32::from_le_bytes(chunk.try_into().unwrap()));
            }
        }
    }

    // Compress 32 mix words down to 8.
    let mut mix_hash = [0u8; 32];
    for k in 0..8 {
        let c = fnv(
            fnv(fnv(mix[4 * k], mix[4 * k + 1]), mix[4 * k + 2]),
            mix[4 * k + 3],
        );
        mix_hash[4 * k..4 * k + 4].copy_from_slice(&c.to_le_bytes());
    }

    let mut final_input = [0u8; HASH_BYTES + 32];
    final_input[..HASH_BYTES].copy_from_slice(&seed);
    final_input[HASH_BYTES..].copy_from_slice(&mix_hash);
    let final_hash: [u8; 32] = Keccak256::digest(final_input).into();

    EthashResult {
        final_hash,
        mix_hash,
    }
}

/// Ethash with dataset items derived from the light cache on demand.
pub fn hashimoto_light(
    light_cache: &[u8],
    full_items: usize,
    header_hash: &[u8; 32],
    nonce: u64,
) -> EthashResult {
    hashimoto(header_hash, nonce, full_items, |index| {
        calc_dataset_item(light_cache, index)
    })
}

/// Ethash reading a materialized full dataset.
pub fn hashimoto_full(
    full_dataset: &[u8],
    header_hash: &[u8; 32],
    nonce: u64,
) -> EthashResult {
    let full_items = full_dataset.len() / HASH_BYTES;
    hashimoto(header_hash, nonce, full_items, |index| {
        let start = index as usize * HASH_BYTES;
        full_dataset[start..start + HASH_BYTES].try_into().unwrap()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethash::{build_light_cache, epoch_seed};

    fn tiny_cache() -> Vec<u8> {
        build_light_cache(1024 * HASH_BYTES as u64, &epoch_seed(0))
    }

    #[test]
    fn test_light_is_deterministic() {
        let cache = tiny_cache();
        let header = [7u8; 32];
        let a = hashimoto_light(&cache, 2048, &header, 42);
        let b = hashimoto_light(&cache, 2048, &header, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_nonce_changes_result() {
        let cache = tiny_cache();
        let header = [7u8; 32];
        let a = hashimoto_light(&cache, 2048, &header, 42);
        let b = hashimoto_light(&cache, 2048, &header, 43);
        assert_ne!(a.final_hash, b.final_hash);
    }

    #[test]
    fn test_header_changes_result() {
        let cache = tiny_cache();
        let a = hashimoto_light(&cache, 2048, &[7u8; 32], 42);
        let b = hashimoto_light(&cache, 2048, &[8u8; 32], 42);
        assert_ne!(a.final_hash, b.final_hash);
    }

    #[test]
    fn test_full_matches_light() {
        let cache = tiny_cache();
        let items = 2048usize;
        let mut dataset = vec![0u8; items * HASH_BYTES];
        for i in 0..items {
            let item = crate::ethash::calc_dataset_item(&cache, i as u32);
            dataset[i * HASH_BYTES..(i + 1) * HASH_BYTES].copy_from_slice(&item);
        }

        let header = [9u8; 32];
        let light = hashimoto_light(&cache, items, &header, 7);
        let full = hashimoto_full(&dataset, &header, 7);
        assert_eq!(light, full);
    }
}
