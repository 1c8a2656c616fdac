//! Epoch seeds, light caches, and dataset item derivation.

use sha3::{Digest, Keccak256, Keccak512};
use std::sync::OnceLock;
use tracing::{debug, info};

use super::{
    cache_size, full_dataset_size, CACHE_ROUNDS, DATASET_PARENTS, HASH_BYTES,
};

/// Words per 64-byte item.
const ITEM_WORDS: usize = HASH_BYTES / 4;

/// FNV prime-multiply mix.
#[inline(always)]
pub(super) fn fnv(x: u32, y: u32) -> u32 {
    x.wrapping_mul(0x0100_0193) ^ y
}

/// Seed hash for an epoch: Keccak-256 iterated `epoch` times over zeros.
pub fn epoch_seed(epoch: u64) -> [u8; 32] {
    let mut seed = [0u8; 32];
    for _ in 0..epoch {
        seed = Keccak256::digest(seed).into();
    }
    seed
}

/// Generate the light cache for an epoch seed.
///
/// The cache is a flat buffer of 64-byte items: a Keccak-512 chain over the
/// seed, then [`CACHE_ROUNDS`] passes of the RandMemoHash mix.
pub fn build_light_cache(size: u64, seed: &[u8; 32]) -> Vec<u8> {
    let n = (size as usize) / HASH_BYTES;
    let mut cache = vec![0u8; n * HASH_BYTES];

    let first: [u8; HASH_BYTES] = Keccak512::digest(seed).into();
    cache[..HASH_BYTES].copy_from_slice(&first);
    for i in 1..n {
        let prev_start = (i - 1) * HASH_BYTES;
        let digest: [u8; HASH_BYTES] =
            Keccak512::digest(&cache[prev_start..prev_start + HASH_BYTES]).into();
        cache[i * HASH_BYTES..(i + 1) * HASH_BYTES].copy_from_slice(&digest);
    }

    for _ in 0..CACHE_ROUNDS {
        for i in 0..n {
            let item_start = i * HASH_BYTES;
            let v = u32::from_le_bytes(
                cache[item_start..item_start + 4].try_into().unwrap(),
            ) as usize
                % n;
            let u = (i + n - 1) % n;

            let mut mixed = [0u8; HASH_BYTES];
            for b in 0..HASH_BYTES {
                mixed[b] = cache[u * HASH_BYTES + b] ^ cache[v * HASH_BYTES + b];
            }
            let digest: [u8; HASH_BYTES] = Keccak512::digest(mixed).into();
            cache[item_start..item_start + HASH_BYTES].copy_from_slice(&digest);
        }
    }

    cache
}

/// Read cache item `index` as little-endian words.
fn cache_item_words(cache: &[u8], index: usize) -> [u32; ITEM_WORDS] {
    let start = index * HASH_BYTES;
    let mut words = [0u32; ITEM_WORDS];
    for (w, chunk) in words.iter_mut().zip(cache[start..start + HASH_BYTES].chunks_exact(4)) {
        *w = u32::from_le_bytes(chunk.try_into().unwrap());
    }
    words
}

fn words_to_bytes(words: &[u32; ITEM_WORDS]) -> [u8; HASH_BYTES] {
    let mut bytes = [0u8; HASH_BYTES];
    for (chunk, w) in bytes.chunks_exact_mut(4).zip(words.iter()) {
        chunk.copy_from_slice(&w.to_le_bytes());
    }
    bytes
}

/// Derive full-dataset item `index` from the light cache.
pub fn calc_dataset_item(cache: &[u8], index: u32) -> [u8; HASH_BYTES] {
    let n = cache.len() / HASH_BYTES;

    let mut mix = cache_item_words(cache, index as usize % n);
    mix[0] ^= index;
    let hashed: [u8; HASH_BYTES] = Keccak512::digest(words_to_bytes(&mix)).into();
    let mut mix = {
        let mut words = [0u32; ITEM_WORDS];
        for (w, chunk) in words.iter_mut().zip(hashed.chunks_exact(4)) {
            *w = u32::from_le_bytes(chunk.try_into().unwrap());
        }
        words
    };

    for j in 0..DATASET_PARENTS {
        let parent = fnv(index ^ j, mix[j as usize % ITEM_WORDS]) as usize % n;
        let parent_words = cache_item_words(cache, parent);
        for (m, p) in mix.iter_mut().zip(parent_words.iter()) {
            *m = fnv(*m, *p);
        }
    }

    Keccak512::digest(words_to_bytes(&mix)).into()
}

/// Per-epoch Ethash resources: the light cache, built eagerly, and the full
/// dataset, materialized on first use.
///
/// Shared read-only after construction; the engine's context map provides
/// the build barrier so an epoch is never constructed twice.
pub struct EpochContext {
    epoch: u64,
    light_cache: Vec<u8>,
    full_dataset: OnceLock<Vec<u8>>,
}

impl EpochContext {
    /// Build the light context for an epoch.
    pub fn build(epoch: u64) -> Self {
        let seed = epoch_seed(epoch);
        let size = cache_size(epoch);
        info!(epoch, cache_bytes = size, "Building ethash light cache");
        let light_cache = build_light_cache(size, &seed);
        debug!(epoch, "Light cache ready");
        Self {
            epoch,
            light_cache,
            full_dataset: OnceLock::new(),
        }
    }

    /// The epoch this context serves.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The light cache bytes.
    pub fn light_cache(&self) -> &[u8] {
        &self.light_cache
    }

    /// Number of 64-byte items in the full dataset for this epoch.
    pub fn full_dataset_items(&self) -> usize {
        (full_dataset_size(self.epoch) as usize) / HASH_BYTES
    }

    /// The full dataset, generating it on first call. Expensive: a gigabyte
    /// of Keccak output at genesis, growing with the epoch.
    pub fn full_dataset(&self) -> &[u8] {
        self.full_dataset.get_or_init(|| {
            let items = self.full_dataset_items();
            info!(
                epoch = self.epoch,
                dataset_bytes = items * HASH_BYTES,
                "Generating full ethash dataset"
            );
            let mut dataset = vec![0u8; items * HASH_BYTES];
            for i in 0..items {
                let item = calc_dataset_item(&self.light_cache, i as u32);
                dataset[i * HASH_BYTES..(i + 1) * HASH_BYTES].copy_from_slice(&item);
            }
            info!(epoch = self.epoch, "Full dataset ready");
            dataset
        })
    }

    /// Whether the full dataset has been materialized.
    pub fn has_full_dataset(&self) -> bool {
        self.full_dataset.get().is_some()
    }
}
