//! Error types for Cage Core.

use thiserror::Error;

/// Startup-time configuration errors.
///
/// These describe an invariant violation in how the process was wired up
/// (a reused permission bit, a renderer registered twice, a broken pattern).
/// They are caught before any request is served.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("permission bit {bit} is outside 0..=62")]
    BitOutOfRange { bit: u8 },

    #[error("permission bit {bit} is already used by {existing}")]
    DuplicateBit { bit: u8, existing: &'static str },

    #[error("permission flag {0} is already defined")]
    DuplicateFlag(String),

    #[error("permission flag {0} is not defined")]
    UnknownFlag(String),

    #[error("extension `{0}` has been occupied")]
    DuplicateRenderer(String),

    #[error("invalid pattern for {field}: {source}")]
    InvalidPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A field value rejected by its validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// The request field that failed.
    pub field: &'static str,
    /// Human-readable description of the accepted values.
    pub message: String,
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
