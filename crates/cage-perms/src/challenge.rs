//! Challenge-response login verification.
//!
//! The client computes `H(stored_digest + decimal(timestamp))` using its own
//! clock and sends the hex cipher with the timestamp. The server checks the
//! cipher first, then the drift `|now - timestamp|` against the window. Drift
//! is symmetric: a client clock ahead of the server is treated the same as
//! one behind.

use cage_core::{constant_time_eq, PasswordDigest, PasswordHasher, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{PermsError, Result};

/// 30 hours.
pub const DEFAULT_LOGIN_WINDOW_MS: u64 = 30 * 3600 * 1000;

/// A login attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginChallenge {
    pub id: UserId,
    /// Hex cipher computed by the client.
    pub password: String,
    /// Client clock in Unix milliseconds.
    pub timestamp: i64,
}

impl LoginChallenge {
    pub fn new(id: impl Into<UserId>, password: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
            timestamp,
        }
    }
}

/// Verifies login challenges against stored digests.
#[derive(Debug, Clone)]
pub struct ChallengeVerifier {
    hasher: PasswordHasher,
    window_ms: u64,
}

impl ChallengeVerifier {
    pub fn new(hasher: PasswordHasher, window_ms: u64) -> Self {
        Self { hasher, window_ms }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// The cipher a well-behaved client would send. Used by tools and tests.
    pub fn client_cipher(&self, plain: &str, timestamp: i64) -> String {
        let stored = self.hasher.hash_password(plain);
        self.hasher.challenge_cipher(&stored, timestamp)
    }

    /// Verify `challenge` against `stored` at server time `now`.
    pub fn verify(&self, stored: &PasswordDigest, challenge: &LoginChallenge, now: i64) -> Result<()> {
        let expected = self.hasher.challenge_cipher(stored, challenge.timestamp);
        if !constant_time_eq(expected.as_bytes(), challenge.password.as_bytes()) {
            return Err(PermsError::InvalidCredentials);
        }

        let drift_ms = now.abs_diff(challenge.timestamp);
        if drift_ms > self.window_ms {
            return Err(PermsError::ChallengeExpired {
                drift_ms,
                window_ms: self.window_ms,
            });
        }

        Ok(())
    }
}

impl Default for ChallengeVerifier {
    fn default() -> Self {
        Self::new(PasswordHasher::default(), DEFAULT_LOGIN_WINDOW_MS)
    }
}
