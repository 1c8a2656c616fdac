//! The proof-of-work engine handle.
//!
//! One engine is constructed at startup and passed to whoever mines or
//! verifies; it owns the memoized per-epoch ethash contexts. Mining fans
//! out across worker threads that partition the nonce space and stop on the
//! first winner or on external cancellation.

use dashmap::DashMap;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vanguard_crypto::{sha256_concat, Hash256, PubKey};

use crate::ethash::{epoch_number, hashimoto_full, hashimoto_light, EpochContext, EthashResult};

/// A committee-admission PoW submission context. Everything except the
/// nonce that seeds the ethash evaluation.
#[derive(Debug, Clone)]
pub struct PowSubmission {
    /// Block number the submission targets; selects the ethash epoch.
    pub block_number: u64,
    /// Required difficulty in leading zero bits.
    pub difficulty: u8,
    /// First consensus randomness beacon.
    pub rand1: [u8; 32],
    /// Second consensus randomness beacon.
    pub rand2: [u8; 32],
    /// Submitter address.
    pub ip_addr: u128,
    /// Submitter public key.
    pub pub_key: PubKey,
    /// Lookup node the submission is routed through.
    pub lookup_id: u32,
    /// Gas price bid.
    pub gas_price: u128,
}

impl PowSubmission {
    /// The 32-byte header hash seeding ethash:
    /// `SHA-256(rand1 ‖ rand2 ‖ ip ‖ pubkey ‖ lookup_id ‖ gas_price)`,
    /// integers big-endian.
    pub fn header_hash(&self) -> Hash256 {
        sha256_concat(&[
            &self.rand1,
            &self.rand2,
            &self.ip_addr.to_be_bytes(),
            self.pub_key.as_bytes(),
            &self.lookup_id.to_be_bytes(),
            &self.gas_price.to_be_bytes(),
        ])
    }
}

/// A winning mining result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningResult {
    /// The winning nonce; never 0, which verification treats as a sentinel.
    pub nonce: u64,
    /// Final hash satisfying the boundary.
    pub final_hash: Hash256,
    /// Mix hash committing to the dataset accesses.
    pub mix_hash: Hash256,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct PowEngineConfig {
    /// Mining worker threads; 0 selects the available parallelism.
    pub mining_workers: usize,
    /// OpenCL mining requested.
    pub opencl_gpu_mine: bool,
    /// CUDA mining requested.
    pub cuda_gpu_mine: bool,
}

impl Default for PowEngineConfig {
    fn default() -> Self {
        Self {
            mining_workers: 0,
            opencl_gpu_mine: false,
            cuda_gpu_mine: false,
        }
    }
}

/// The engine: epoch context store plus mining/verification entry points.
pub struct PowEngine {
    contexts: DashMap<u64, Arc<EpochContext>>,
    config: PowEngineConfig,
    gpu_warned: AtomicBool,
}

impl PowEngine {
    /// Create an engine.
    pub fn new(config: PowEngineConfig) -> Self {
        Self {
            contexts: DashMap::new(),
            config,
            gpu_warned: AtomicBool::new(false),
        }
    }

    /// The context for a block number's epoch, building it on first use.
    ///
    /// The map's entry lock is the construction barrier: when two threads
    /// race for a missing epoch, exactly one builds and the other blocks
    /// until the context is ready.
    pub fn epoch_context(&self, block_number: u64) -> Arc<EpochContext> {
        let epoch = epoch_number(block_number);
        self.contexts
            .entry(epoch)
            .or_insert_with(|| Arc::new(EpochContext::build(epoch)))
            .clone()
    }

    /// Drop contexts for epochs older than the given block number's epoch.
    pub fn prune_contexts_before(&self, block_number: u64) {
        let current = epoch_number(block_number);
        self.contexts.retain(|epoch, _| *epoch >= current);
    }

    /// Mine a submission until a nonce satisfies the boundary or `cancel`
    /// is raised.
    ///
    /// Returns `None` when cancelled — the no-winner sentinel. With
    /// `use_full_dataset` the epoch's dataset is materialized once and
    /// shared by all workers; otherwise items are derived from the light
    /// cache per access. A GPU request falls back to the full-dataset CPU
    /// path (no GPU kernel is linked into this build).
    pub fn mine(
        &self,
        submission: &PowSubmission,
        use_full_dataset: bool,
        cancel: &AtomicBool,
    ) -> Option<MiningResult> {
        let gpu_requested = self.config.opencl_gpu_mine || self.config.cuda_gpu_mine;
        if gpu_requested && !self.gpu_warned.swap(true, Ordering::Relaxed) {
            warn!("GPU mining requested but no GPU backend is built in; using CPU full dataset");
        }
        let use_full_dataset = use_full_dataset || gpu_requested;

        let context = self.epoch_context(submission.block_number);
        let header_hash = submission.header_hash();
        let target = boundary(submission.difficulty);
        let full_items = context.full_dataset_items();

        let dataset: Option<&[u8]> = if use_full_dataset {
            Some(context.full_dataset())
        } else {
            None
        };

        let workers = match self.config.mining_workers {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };
        debug!(
            block_number = submission.block_number,
            difficulty = submission.difficulty,
            workers,
            use_full_dataset,
            "Starting PoW search"
        );

        let stop = AtomicBool::new(false);
        let winner = parking_lot::Mutex::new(None::<MiningResult>);
        let partition = u64::MAX / workers as u64;

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let header = *header_hash.as_bytes();
                let stop = &stop;
                let winner = &winner;
                let light_cache = context.light_cache();
                let start = (worker as u64)
                    .wrapping_mul(partition)
                    .wrapping_add(rand::thread_rng().gen_range(0..partition));

                scope.spawn(move || {
                    let mut nonce = start;
                    loop {
                        if stop.load(Ordering::Relaxed) || cancel.load(Ordering::Relaxed) {
                            return;
                        }
                        // Nonce 0 is the invalid sentinel; never emit it.
                        if nonce == 0 {
                            nonce = 1;
                        }

                        let result = match dataset {
                            Some(full) => hashimoto_full(full, &header, nonce),
                            None => hashimoto_light(light_cache, full_items, &header, nonce),
                        };

                        if check_difficulty(&result.final_hash, &target) {
                            let mut slot = winner.lock();
                            if slot.is_none() {
                                *slot = Some(to_mining_result(nonce, &result));
                                stop.store(true, Ordering::Relaxed);
                            }
                            return;
                        }
                        nonce = nonce.wrapping_add(1);
                    }
                });
            }
        });

        let result = winner.into_inner();
        match &result {
            Some(win) => info!(
                block_number = submission.block_number,
                nonce = win.nonce,
                final_hash = %win.final_hash,
                "PoW solution found"
            ),
            None => debug!(
                block_number = submission.block_number,
                "PoW search cancelled with no winner"
            ),
        }
        result
    }

    /// Verify a claimed solution.
    ///
    /// Recomputes ethash with the claimed nonce from the light cache and
    /// requires final-hash equality, mix-hash equality, and boundary
    /// satisfaction. A zero nonce is rejected outright. All failures return
    /// `false` with a WARN event; verification never errors.
    pub fn verify(
        &self,
        submission: &PowSubmission,
        nonce: u64,
        claimed_final: &Hash256,
        claimed_mix: &Hash256,
    ) -> bool {
        if nonce == 0 {
            warn!("Rejecting PoW with sentinel nonce 0");
            return false;
        }

        let context = self.epoch_context(submission.block_number);
        let header_hash = submission.header_hash();
        let result = hashimoto_light(
            context.light_cache(),
            context.full_dataset_items(),
            header_hash.as_bytes(),
            nonce,
        );

        if &result.final_hash != claimed_final.as_bytes() {
            warn!(
                expected = %claimed_final,
                actual = %hex::encode(result.final_hash),
                "PoW final hash mismatch"
            );
            return false;
        }
        if &result.mix_hash != claimed_mix.as_bytes() {
            warn!(
                expected = %claimed_mix,
                actual = %hex::encode(result.mix_hash),
                "PoW mix hash mismatch"
            );
            return false;
        }

        let target = boundary(submission.difficulty);
        if !check_difficulty(&result.final_hash, &target) {
            warn!(
                difficulty = submission.difficulty,
                final_hash = %hex::encode(result.final_hash),
                "PoW final hash misses the difficulty boundary"
            );
            return false;
        }
        true
    }
}

fn to_mining_result(nonce: u64, result: &EthashResult) -> MiningResult {
    MiningResult {
        nonce,
        final_hash: Hash256(result.final_hash),
        mix_hash: Hash256(result.mix_hash),
    }
}

/// The boundary for a difficulty: `difficulty` leading zero bits followed
/// by ones (`(2^256 − 1) >> difficulty`, big-endian).
pub fn boundary(difficulty: u8) -> [u8; 32] {
    let mut target = [0xffu8; 32];
    let full_bytes = (difficulty / 8) as usize;
    let rem_bits = difficulty % 8;
    for byte in target.iter_mut().take(full_bytes.min(32)) {
        *byte = 0;
    }
    if full_bytes < 32 && rem_bits > 0 {
        target[full_bytes] = 0xff >> rem_bits;
    }
    target
}

/// Strict byte-wise comparison: the hash satisfies the target iff it is
/// lexicographically less than or equal to it.
pub fn check_difficulty(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    hash <= target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_shapes() {
        assert_eq!(boundary(0), [0xff; 32]);

        let b8 = boundary(8);
        assert_eq!(b8[0], 0x00);
        assert_eq!(&b8[1..], &[0xff; 31][..]);

        let b10 = boundary(10);
        assert_eq!(b10[0], 0x00);
        assert_eq!(b10[1], 0x3f);
        assert_eq!(&b10[2..], &[0xff; 30][..]);

        let b255 = boundary(255);
        assert_eq!(&b255[..31], &[0x00; 31][..]);
        assert_eq!(b255[31], 0x01);
    }

    #[test]
    fn test_check_difficulty_ascii_vectors() {
        let hash: [u8; 32] = *b"11111111111111111111111111111111";
        let easier: [u8; 32] = *b"22222222222222222222222222222222";
        assert!(check_difficulty(&hash, &easier));
        assert!(check_difficulty(&hash, &hash));

        let above: [u8; 32] = *b"11111111111111111111111111111112";
        assert!(check_difficulty(&hash, &above));

        let below: [u8; 32] = *b"11111111111111111111111111111110";
        assert!(!check_difficulty(&hash, &below));
    }

    #[test]
    fn test_header_hash_covers_every_field() {
        let base = PowSubmission {
            block_number: 5,
            difficulty: 3,
            rand1: [1u8; 32],
            rand2: [2u8; 32],
            ip_addr: 2307193356,
            pub_key: vanguard_crypto::KeyPair::generate().public,
            lookup_id: 0,
            gas_price: 100,
        };
        let h0 = base.header_hash();

        let mut changed = base.clone();
        changed.rand1[0] ^= 1;
        assert_ne!(changed.header_hash(), h0);

        let mut changed = base.clone();
        changed.ip_addr += 1;
        assert_ne!(changed.header_hash(), h0);

        let mut changed = base.clone();
        changed.gas_price += 1;
        assert_ne!(changed.header_hash(), h0);

        let mut changed = base.clone();
        changed.lookup_id = 9;
        assert_ne!(changed.header_hash(), h0);

        // Block number selects the epoch but is not part of the header hash.
        let mut changed = base.clone();
        changed.block_number = 6;
        assert_eq!(changed.header_hash(), h0);
    }
}
