//! Salted password digests and login challenge ciphers.
//!
//! The server stores `hex(H(plain + salt))`. A client proves knowledge of the
//! password by sending `hex(H(stored + decimal(timestamp)))`, so the stored
//! digest never crosses the wire and every cipher is bound to a timestamp.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// The legacy salt. Existing clients derive digests with it.
pub const DEFAULT_SALT: &str = "r9q.v9v[b7xnw4]4tzeiz.vlpu,iq/l5";

/// Hash function used for both the stored digest and the challenge cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-1, wire-compatible with existing clients.
    #[default]
    Sha1,
    /// BLAKE3 for new deployments.
    Blake3,
}

impl DigestAlgorithm {
    /// Lowercase hex digest of `data`.
    pub fn hex(self, data: &[u8]) -> String {
        match self {
            DigestAlgorithm::Sha1 => hex::encode(Sha1::digest(data)),
            DigestAlgorithm::Blake3 => blake3::hash(data).to_hex().to_string(),
        }
    }
}

/// A stored password digest (lowercase hex).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap a digest read from storage.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// Derives stored digests and expected challenge ciphers.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    algorithm: DigestAlgorithm,
    salt: String,
}

impl PasswordHasher {
    pub fn new(algorithm: DigestAlgorithm, salt: impl Into<String>) -> Self {
        Self {
            algorithm,
            salt: salt.into(),
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Digest to store when a password is set.
    pub fn hash_password(&self, plain: &str) -> PasswordDigest {
        let mut input = String::with_capacity(plain.len() + self.salt.len());
        input.push_str(plain);
        input.push_str(&self.salt);
        PasswordDigest(self.algorithm.hex(input.as_bytes()))
    }

    /// The cipher a client must send for `stored` at `timestamp_ms`.
    pub fn challenge_cipher(&self, stored: &PasswordDigest, timestamp_ms: i64) -> String {
        let input = format!("{}{}", stored.as_str(), timestamp_ms);
        self.algorithm.hex(input.as_bytes())
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DigestAlgorithm::default(), DEFAULT_SALT)
    }
}

/// Compare two byte strings without early exit on the first difference.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
