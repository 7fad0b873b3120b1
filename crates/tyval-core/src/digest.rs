//! # Value Digest — Structural Hashing
//!
//! `ValueDigest` is a SHA-256 over [`CanonicalBytes`], so it is invariant to
//! object key order, equal for deep-equal values, and distinct for unequal
//! values with overwhelming probability.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::value::Value;

/// A 32-byte structural digest of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueDigest {
    pub bytes: [u8; 32],
}

impl ValueDigest {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// The first eight bytes as an integer, for hash tables and memo keys.
    pub fn as_u64(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.bytes[..8]);
        u64::from_be_bytes(head)
    }
}

impl fmt::Display for ValueDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute the SHA-256 digest of canonical bytes.
///
/// Accepts only `&CanonicalBytes`, so every digest flows through the
/// canonical encoding.
pub fn sha256_digest(data: &CanonicalBytes) -> ValueDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ValueDigest::new(bytes)
}

/// Structural digest of a value.
pub fn digest_value(value: &Value) -> ValueDigest {
    sha256_digest(&CanonicalBytes::new(value))
}
