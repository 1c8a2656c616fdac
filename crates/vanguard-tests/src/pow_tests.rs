//! Ethash reference vectors and mine-then-verify exercises.
//!
//! The known-block vectors come from the POC-9 testnet via the upstream
//! ethash test corpus.

use std::sync::atomic::{AtomicBool, Ordering};

use vanguard_crypto::{Hash256, KeyPair};
use vanguard_pow::ethash::{
    cache_size, epoch_number, full_dataset_size, hashimoto_light, EpochContext,
};
use vanguard_pow::{boundary, check_difficulty, PowEngine, PowEngineConfig};

use crate::pow_submission;

fn header_hash(hex_str: &str) -> [u8; 32] {
    let bytes = hex::decode(hex_str).unwrap();
    bytes.try_into().unwrap()
}

fn target_with_prefix(prefix: &[u8]) -> [u8; 32] {
    let mut target = [0u8; 32];
    target[..prefix.len()].copy_from_slice(prefix);
    target
}

#[test]
fn test_dataset_params_genesis_bounds() {
    let full = full_dataset_size(epoch_number(0));
    let cache = cache_size(epoch_number(0));
    assert!(full < 1 << 30);
    assert!(full + 20 * 128 >= 1 << 30);
    assert!(cache < (1 << 30) / 32);
}

#[test]
fn test_dataset_params_calcified() {
    assert_eq!(full_dataset_size(epoch_number(22)), 1_073_739_904);
    assert_eq!(cache_size(epoch_number(22)), 16_776_896);
    assert_eq!(full_dataset_size(epoch_number(30_000)), 1_082_130_304);
    assert_eq!(cache_size(epoch_number(30_000)), 16_907_456);
}

#[test]
fn test_check_difficulty_vectors() {
    let hash: [u8; 32] = *b"11111111111111111111111111111111";
    let target: [u8; 32] = *b"22222222222222222222222222222222";
    assert!(check_difficulty(&hash, &target));
    assert!(check_difficulty(&hash, &hash));
    assert!(check_difficulty(
        &hash,
        b"11111111111111111111111111111112"
    ));
    assert!(!check_difficulty(
        &hash,
        b"11111111111111111111111111111110"
    ));
}

#[test]
fn test_block22_verification() {
    // POC-9 testnet, epoch 0.
    let context = EpochContext::build(epoch_number(22));
    let header =
        header_hash("372eca2454ead349c3df0ab5d00b0b706b23e49d469387db91811cee0358fc6d");

    let result = hashimoto_light(
        context.light_cache(),
        context.full_dataset_items(),
        &header,
        0x495732e0ed7a801c,
    );

    assert_eq!(
        hex::encode(result.final_hash),
        "00000b184f1fdd88bfd94c86c39e65db0c36144d5e43f745f722196e730cb614"
    );
    assert!(check_difficulty(
        &result.final_hash,
        &target_with_prefix(&[0x02, 0x05, 0x40])
    ));
}

#[test]
fn test_block30001_verification() {
    // POC-9 testnet, epoch 1.
    let context = EpochContext::build(epoch_number(30_001));
    let header =
        header_hash("7e44356ee3441623bc72a683fd3708fdf75e971bbe294f33e539eedad4b92b34");

    let result = hashimoto_light(
        context.light_cache(),
        context.full_dataset_items(),
        &header,
        0x318df1c8adef7e5e,
    );

    assert!(check_difficulty(
        &result.final_hash,
        &target_with_prefix(&[0x17, 0x62, 0xff])
    ));
}

#[test]
#[ignore = "builds a third epoch cache; epochs 0 and 1 already cover the vector path"]
fn test_block60000_verification() {
    // POC-9 testnet, epoch 2.
    let context = EpochContext::build(epoch_number(60_000));
    let header =
        header_hash("5fc898f16035bf5ac9c6d9077ae1e3d5fc1ecc3c9fd5bee8bb00e810fdacbaa0");

    let result = hashimoto_light(
        context.light_cache(),
        context.full_dataset_items(),
        &header,
        0x50377003e5d830ca,
    );

    assert!(check_difficulty(
        &result.final_hash,
        &target_with_prefix(&[0x25, 0xa6, 0x1e])
    ));
}

/// Mine at a low difficulty and put the result through every negative
/// verification branch.
fn mine_and_verify_exercise(block_number: u64, difficulty: u8, use_full_dataset: bool) {
    let engine = PowEngine::new(PowEngineConfig::default());
    let pub_key = KeyPair::generate().public;
    let submission = pow_submission(block_number, difficulty, pub_key);

    let cancel = AtomicBool::new(false);
    let result = engine
        .mine(&submission, use_full_dataset, &cancel)
        .expect("mining without cancellation must produce a winner");
    assert_ne!(result.nonce, 0);

    assert!(engine.verify(
        &submission,
        result.nonce,
        &result.final_hash,
        &result.mix_hash
    ));

    // Mutating rand1 alone invalidates the solution.
    let mut tampered = submission.clone();
    tampered.rand1[1] = b'3';
    assert!(!engine.verify(
        &tampered,
        result.nonce,
        &result.final_hash,
        &result.mix_hash
    ));

    // Raising the claimed difficulty invalidates it.
    let mut harder = submission.clone();
    harder.difficulty = 30;
    assert!(!engine.verify(
        &harder,
        result.nonce,
        &result.final_hash,
        &result.mix_hash
    ));

    // The zero nonce is a rejected sentinel.
    assert!(!engine.verify(&submission, 0, &result.final_hash, &result.mix_hash));

    // A wrong mix hash is rejected even with the right final hash.
    assert!(!engine.verify(
        &submission,
        result.nonce,
        &result.final_hash,
        &Hash256::zero()
    ));
}

#[test]
#[ignore = "mines epoch-0 ethash at difficulty 10 on the CPU; minutes in CI"]
fn test_mining_and_verification() {
    mine_and_verify_exercise(0, 10, false);
}

#[test]
#[ignore = "mines a later-epoch block; builds a fresh cache then searches at difficulty 10"]
fn test_mining_and_verification_big_block_number() {
    mine_and_verify_exercise(34_567, 10, false);
}

#[test]
#[ignore = "materializes the gigabyte-scale full dataset before mining"]
fn test_mining_and_verification_full_dataset() {
    mine_and_verify_exercise(0, 10, true);
}

#[test]
fn test_cancelled_mining_returns_no_winner() {
    let engine = PowEngine::new(PowEngineConfig {
        mining_workers: 2,
        ..PowEngineConfig::default()
    });
    // Difficulty far beyond CPU reach, so cancellation is the only exit.
    let submission = pow_submission(0, 60, KeyPair::generate().public);

    let cancel = AtomicBool::new(false);
    std::thread::scope(|scope| {
        let cancel = &cancel;
        scope.spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(300));
            cancel.store(true, Ordering::Relaxed);
        });
        let result = engine.mine(&submission, false, cancel);
        assert!(result.is_none());
    });
}

#[test]
fn test_epoch_context_is_shared() {
    let engine = PowEngine::new(PowEngineConfig::default());
    let a = engine.epoch_context(10);
    let b = engine.epoch_context(29_999);
    // Same epoch: the same context, not a rebuild.
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert_eq!(a.epoch(), 0);
}

#[test]
fn test_boundary_matches_difficulty_semantics() {
    // A difficulty-10 boundary admits hashes with 10 leading zero bits.
    let target = boundary(10);
    let mut passing = [0u8; 32];
    passing[1] = 0x3f;
    assert!(check_difficulty(&passing, &target));

    let mut failing = [0u8; 32];
    failing[1] = 0x40;
    assert!(!check_difficulty(&failing, &target));
}
