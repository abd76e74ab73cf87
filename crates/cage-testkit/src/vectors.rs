//! Golden login vectors.
//!
//! Clients derive the challenge cipher themselves, so these values pin the
//! digest scheme byte for byte. All vectors use SHA-1 and the legacy salt.

use serde::Serialize;

use cage_core::{DigestAlgorithm, PasswordDigest, PasswordHasher, DEFAULT_SALT};

/// A golden login vector.
#[derive(Debug, Clone, Serialize)]
pub struct LoginVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub password: &'static str,
    pub timestamp: i64,
    /// `hex(sha1(password + salt))`.
    pub expected_digest: &'static str,
    /// `hex(sha1(digest + decimal(timestamp)))`.
    pub expected_cipher: &'static str,
}

/// Get all golden login vectors.
pub fn all_vectors() -> Vec<LoginVector> {
    vec![
        LoginVector {
            name: "passphrase with a space",
            password: "correct horse",
            timestamp: 1_700_000_000_000,
            expected_digest: "a77abd7bc7f9e7856c21b5315f3e0c4da3b590b0",
            expected_cipher: "56415356ca0ee1dc4e06be1358f0c26dfb2ef333",
        },
        LoginVector {
            name: "fixture password at epoch",
            password: "password-123",
            timestamp: 0,
            expected_digest: "ef5790f665168eae57b8931bee56303c78b45303",
            expected_cipher: "492c9a7d4907ed7b9aadc6e9c213ef23512a218e",
        },
        LoginVector {
            name: "fixture password at 2025-01-14",
            password: "password-123",
            timestamp: 1_736_870_400_000,
            expected_digest: "ef5790f665168eae57b8931bee56303c78b45303",
            expected_cipher: "34fd08a472a6c82314f8d64a2c87039f1f71af79",
        },
        LoginVector {
            name: "empty password",
            password: "",
            timestamp: 1,
            expected_digest: "2b4e288db395d15afed3b2f2195453a7d8aa7fd2",
            expected_cipher: "30c267ec81e360ee521b8f75a232fee535194296",
        },
    ]
}

/// The hasher the vectors were computed with.
pub fn vector_hasher() -> PasswordHasher {
    PasswordHasher::new(DigestAlgorithm::Sha1, DEFAULT_SALT)
}

/// Check every vector. Returns `(name, matches, cipher)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let hasher = vector_hasher();
    all_vectors()
        .iter()
        .map(|v| {
            let digest = hasher.hash_password(v.password);
            let cipher = hasher.challenge_cipher(&digest, v.timestamp);
            let matches = digest.as_str() == v.expected_digest && cipher == v.expected_cipher;
            (v.name.to_string(), matches, cipher)
        })
        .collect()
}

/// The vectors as JSON, for client test suites.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&all_vectors())
}
