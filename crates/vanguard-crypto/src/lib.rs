//! # vanguard-crypto
//!
//! Cryptographic primitives for the Vanguard node.
//!
//! This crate provides:
//! - Schnorr-style multi-signatures over ristretto255: key aggregation and
//!   aggregate verification of two-round threshold cosignatures
//! - SHA-256 hashing with a typed 32-byte digest
//!
//! Aggregation and verification are deterministic and side-effect free.
//! Verification failures are reported as `false` plus a WARN event; no
//! cryptographic failure is ever fatal to the process.

mod error;
mod hash;
mod multisig;

pub use error::{CryptoError, CryptoResult};
pub use hash::{sha256, sha256_concat, Hash256, HASH_SIZE};
pub use multisig::{
    aggregate_pub_keys, combine_secret_keys, multi_sig_verify, sign, CoSignature, KeyPair, PubKey,
    SecretKey, COSIG_CHALLENGE_SIZE, COSIG_RESPONSE_SIZE, PUB_KEY_SIZE,
};
