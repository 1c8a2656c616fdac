//! # vanguard-pow
//!
//! Proof-of-work admission for the Vanguard node.
//!
//! Candidate nodes submit Ethash solutions to join the committee. This
//! crate provides:
//! - A faithful Ethash implementation (Keccak-256/512, epoch light caches,
//!   optional full dataset, hashimoto)
//! - [`PowEngine`]: an explicit engine handle that derives submission
//!   header hashes, mines across worker threads with cooperative
//!   cancellation, and verifies claimed solutions
//! - [`calculate_new_difficulty`]: the submission-rate difficulty retarget
//!
//! Epoch contexts are built lazily and memoized; when two threads race to
//! build the same epoch, exactly one builds and the other waits.

pub mod ethash;

mod difficulty;
mod engine;

pub use difficulty::{
    calculate_new_difficulty, MAX_ADJUST_STEP, MAX_INCREASE_DIFFICULTY_YEARS,
    POW_CHANGE_PERCENT_TO_ADJ_DIFF,
};
pub use engine::{
    boundary, check_difficulty, MiningResult, PowEngine, PowEngineConfig, PowSubmission,
};
