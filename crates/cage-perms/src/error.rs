//! Error types for the permissions module.

use thiserror::Error;

/// Errors produced by guards and challenge verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermsError {
    /// The actor lacks the named flag.
    #[error("permission denied: {required} is required")]
    PermissionDenied { required: &'static str },

    /// The challenge cipher does not match the stored password.
    #[error("user id and password do not match")]
    InvalidCredentials,

    /// The challenge timestamp is outside the replay window.
    #[error("login challenge expired: drift of {drift_ms} ms exceeds {window_ms} ms")]
    ChallengeExpired { drift_ms: u64, window_ms: u64 },
}

impl PermsError {
    /// The request field this error is reported against.
    pub fn field(&self) -> &'static str {
        match self {
            PermsError::PermissionDenied { .. } => "permission",
            PermsError::InvalidCredentials => "password",
            PermsError::ChallengeExpired { .. } => "timestamp",
        }
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
