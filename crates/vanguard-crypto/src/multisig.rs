//! Schnorr-style multi-signature over ristretto255.
//!
//! The DS consensus protocol produces a two-round threshold cosignature: the
//! signers' nonce commitments are folded into a single challenge scalar, and
//! their responses sum into a single response scalar. Because both halves are
//! linear, the committee side only needs two operations:
//!
//! - [`aggregate_pub_keys`]: sum the signer subset's public keys into one
//!   aggregate verification key
//! - [`multi_sig_verify`]: check a `(challenge, response)` pair against the
//!   aggregate key
//!
//! Verification recomputes `R' = response·B + challenge·A` and accepts iff
//! `challenge == H(R' ‖ A ‖ message)` with the hash reduced from 64 bytes
//! modulo the group order.

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand::rngs::OsRng;
use sha2::{Digest, Sha512};
use tracing::warn;

use crate::{CryptoError, CryptoResult};

/// Size of a compressed ristretto255 public key.
pub const PUB_KEY_SIZE: usize = 32;

/// Size of the cosignature challenge scalar.
pub const COSIG_CHALLENGE_SIZE: usize = 32;

/// Size of the cosignature response scalar.
pub const COSIG_RESPONSE_SIZE: usize = 32;

/// A committee member's public key (compressed ristretto255 point).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PubKey([u8; PUB_KEY_SIZE]);

impl PubKey {
    /// Wrap raw compressed-point bytes.
    ///
    /// The point is validated lazily, at aggregation time; malformed keys
    /// fail there rather than here so wire parsing stays infallible.
    pub fn from_bytes(bytes: [u8; PUB_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Interpret a 32-byte slice as a public key.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; PUB_KEY_SIZE] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// The compressed-point bytes.
    pub fn as_bytes(&self) -> &[u8; PUB_KEY_SIZE] {
        &self.0
    }

    fn decompress(&self) -> CryptoResult<RistrettoPoint> {
        CompressedRistretto::from_slice(&self.0)
            .ok()
            .and_then(|c| c.decompress())
            .ok_or_else(|| CryptoError::MalformedPubKey(hex::encode(self.0)))
    }
}

impl std::fmt::Debug for PubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PubKey({})", hex::encode(self.0))
    }
}

impl std::fmt::Display for PubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A secret signing key.
pub struct SecretKey(Scalar);

/// A signing keypair.
///
/// The node itself only verifies; signing lives here so the consensus layer
/// (and the test suites standing in for it) share one implementation.
pub struct KeyPair {
    /// Secret scalar.
    pub secret: SecretKey,
    /// Matching public key.
    pub public: PubKey,
}

impl KeyPair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        let secret = Scalar::random(&mut OsRng);
        let public = RistrettoPoint::mul_base(&secret);
        Self {
            secret: SecretKey(secret),
            public: PubKey(public.compress().to_bytes()),
        }
    }
}

/// A two-scalar threshold cosignature: the challenge and response halves of
/// the two-round commit.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CoSignature {
    /// Challenge scalar bytes.
    pub challenge: [u8; COSIG_CHALLENGE_SIZE],
    /// Response scalar bytes.
    pub response: [u8; COSIG_RESPONSE_SIZE],
}

impl CoSignature {
    /// Concatenated `challenge ‖ response` bytes.
    pub fn to_bytes(&self) -> [u8; COSIG_CHALLENGE_SIZE + COSIG_RESPONSE_SIZE] {
        let mut out = [0u8; COSIG_CHALLENGE_SIZE + COSIG_RESPONSE_SIZE];
        out[..COSIG_CHALLENGE_SIZE].copy_from_slice(&self.challenge);
        out[COSIG_CHALLENGE_SIZE..].copy_from_slice(&self.response);
        out
    }

    /// Parse `challenge ‖ response` bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != COSIG_CHALLENGE_SIZE + COSIG_RESPONSE_SIZE {
            return None;
        }
        let mut challenge = [0u8; COSIG_CHALLENGE_SIZE];
        let mut response = [0u8; COSIG_RESPONSE_SIZE];
        challenge.copy_from_slice(&bytes[..COSIG_CHALLENGE_SIZE]);
        response.copy_from_slice(&bytes[COSIG_CHALLENGE_SIZE..]);
        Some(Self {
            challenge,
            response,
        })
    }
}

impl std::fmt::Debug for CoSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CoSignature(c={}, r={})",
            hex::encode(self.challenge),
            hex::encode(self.response)
        )
    }
}

/// Aggregate a set of public keys into one verification key.
///
/// Fails on an empty set or on any key that does not decode to a valid
/// curve point.
pub fn aggregate_pub_keys(keys: &[PubKey]) -> CryptoResult<PubKey> {
    if keys.is_empty() {
        return Err(CryptoError::EmptyKeySet);
    }

    let mut sum = RistrettoPoint::identity();
    for key in keys {
        sum += key.decompress()?;
    }

    Ok(PubKey(sum.compress().to_bytes()))
}

/// Verify an aggregate cosignature against an aggregate public key.
///
/// Returns `false` (never an error) on any failure: a malformed key, a
/// non-canonical scalar, or a challenge mismatch. Each failure emits a WARN
/// event naming the cause.
pub fn multi_sig_verify(message: &[u8], signature: &CoSignature, agg_key: &PubKey) -> bool {
    let agg_point = match agg_key.decompress() {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Cosignature verification failed: bad aggregate key");
            return false;
        }
    };

    let challenge = match canonical_scalar(&signature.challenge) {
        Some(s) => s,
        None => {
            warn!("Cosignature verification failed: non-canonical challenge scalar");
            return false;
        }
    };
    let response = match canonical_scalar(&signature.response) {
        Some(s) => s,
        None => {
            warn!("Cosignature verification failed: non-canonical response scalar");
            return false;
        }
    };

    // R' = s·B + c·A; a valid signature satisfies c == H(R' ‖ A ‖ m).
    let commitment = RistrettoPoint::mul_base(&response) + agg_point * challenge;
    let expected = challenge_scalar(&commitment, &agg_point, message);

    if expected != challenge {
        warn!("Cosignature verification failed: challenge mismatch");
        return false;
    }
    true
}

/// Sign a message with a single (or pre-aggregated) secret key.
///
/// The consensus layer aggregates signer nonces and responses itself; for an
/// already-combined secret this produces exactly the cosignature shape that
/// [`multi_sig_verify`] accepts.
pub fn sign(message: &[u8], keypair: &KeyPair) -> CryptoResult<CoSignature> {
    let agg_point = keypair.public.decompress()?;

    let nonce = Scalar::random(&mut OsRng);
    let commitment = RistrettoPoint::mul_base(&nonce);
    let challenge = challenge_scalar(&commitment, &agg_point, message);
    let response = nonce - challenge * keypair.secret.0;

    Ok(CoSignature {
        challenge: challenge.to_bytes(),
        response: response.to_bytes(),
    })
}

/// Combine secret keys so a test double can stand in for a full signer set.
pub fn combine_secret_keys(keys: &[&SecretKey]) -> SecretKey {
    let sum = keys.iter().fold(Scalar::ZERO, |acc, k| acc + k.0);
    SecretKey(sum)
}

impl SecretKey {
    /// Public key matching this secret.
    pub fn public_key(&self) -> PubKey {
        PubKey(RistrettoPoint::mul_base(&self.0).compress().to_bytes())
    }
}

fn canonical_scalar(bytes: &[u8; 32]) -> Option<Scalar> {
    Scalar::from_canonical_bytes(*bytes).into()
}

fn challenge_scalar(commitment: &RistrettoPoint, agg_key: &RistrettoPoint, message: &[u8]) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(commitment.compress().as_bytes());
    hasher.update(agg_key.compress().as_bytes());
    hasher.update(message);
    let wide: [u8; 64] = hasher.finalize().into();
    Scalar::from_bytes_mod_order_wide(&wide)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let sig = sign(b"view change", &kp).unwrap();
        assert!(multi_sig_verify(b"view change", &sig, &kp.public));
    }

    #[test]
    fn test_wrong_message_rejected() {
        let kp = KeyPair::generate();
        let sig = sign(b"view change", &kp).unwrap();
        assert!(!multi_sig_verify(b"view chance", &sig, &kp.public));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let sig = sign(b"view change", &kp).unwrap();
        assert!(!multi_sig_verify(b"view change", &sig, &other.public));
    }

    #[test]
    fn test_aggregate_empty_fails() {
        assert!(matches!(
            aggregate_pub_keys(&[]),
            Err(CryptoError::EmptyKeySet)
        ));
    }

    #[test]
    fn test_aggregate_malformed_key_fails() {
        let bad = PubKey::from_bytes([0xff; PUB_KEY_SIZE]);
        assert!(matches!(
            aggregate_pub_keys(&[bad]),
            Err(CryptoError::MalformedPubKey(_))
        ));
    }

    #[test]
    fn test_aggregate_signature_of_combined_secrets() {
        // Aggregate key = sum of member keys; combined secret signs for it.
        let members: Vec<KeyPair> = (0..7).map(|_| KeyPair::generate()).collect();
        let pubs: Vec<PubKey> = members.iter().map(|m| m.public).collect();
        let agg = aggregate_pub_keys(&pubs).unwrap();

        let secrets: Vec<&SecretKey> = members.iter().map(|m| &m.secret).collect();
        let combined = combine_secret_keys(&secrets);
        assert_eq!(combined.public_key(), agg);

        let kp = KeyPair {
            public: agg,
            secret: combined,
        };
        let sig = sign(b"epoch 42 committee", &kp).unwrap();
        assert!(multi_sig_verify(b"epoch 42 committee", &sig, &agg));
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let ab = aggregate_pub_keys(&[a.public, b.public]).unwrap();
        let ba = aggregate_pub_keys(&[b.public, a.public]).unwrap();
        assert_eq!(ab, ba);
    }
}
