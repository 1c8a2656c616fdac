//! SHA-256 hashing with a typed digest.

use sha2::{Digest, Sha256};

/// Size of a SHA-256 digest.
pub const HASH_SIZE: usize = 32;

/// A 32-byte SHA-256 digest.
///
/// Ordering is lexicographic over the big-endian byte representation, which
/// is what proof-of-work boundary comparisons rely on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash256(pub [u8; HASH_SIZE]);

impl Hash256 {
    /// Interpret a 32-byte slice as a digest.
    ///
    /// Returns `None` when the slice has the wrong length.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; HASH_SIZE] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Lowercase hex rendering of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        Self::from_slice(&bytes)
    }

    /// The all-zero digest.
    pub fn zero() -> Self {
        Self([0u8; HASH_SIZE])
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// SHA-256 of a byte slice.
pub fn sha256(data: &[u8]) -> Hash256 {
    let digest = Sha256::digest(data);
    Hash256(digest.into())
}

/// SHA-256 over the concatenation of several byte slices.
pub fn sha256_concat(parts: &[&[u8]]) -> Hash256 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Hash256(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256 of the empty string.
        let h = sha256(b"");
        assert_eq!(
            h.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_concat_matches_single_buffer() {
        let whole = sha256(b"hello world");
        let parts = sha256_concat(&[b"hello", b" ", b"world"]);
        assert_eq!(whole, parts);
    }

    #[test]
    fn test_hex_roundtrip() {
        let h = sha256(b"vanguard");
        let parsed = Hash256::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut a = [0u8; HASH_SIZE];
        let mut b = [0u8; HASH_SIZE];
        a[0] = 1;
        b[0] = 2;
        assert!(Hash256(a) < Hash256(b));
        assert!(Hash256(a) <= Hash256(a));
    }
}
