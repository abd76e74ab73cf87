//! Error types for the Cms.

use cage_core::{ConfigError, ValidationError};
use cage_perms::PermsError;
use cage_render::RenderError;
use cage_store::StoreError;
use thiserror::Error;

/// Errors that stop a [`Cms`](crate::Cms) from starting.
#[derive(Debug, Error)]
pub enum CmsError {
    /// Invalid wiring: duplicate renderer, bad pattern, reused flag bit.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for startup operations.
pub type Result<T> = std::result::Result<T, CmsError>;

/// The failure of a single action, reported against a request field.
///
/// Everything except [`ActionError::Store`] is an expected outcome the
/// client can act on.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{message}")]
    PermissionDenied { message: String },

    #[error("user id and password do not match")]
    InvalidCredentials,

    #[error("login session has expired, please refresh and retry")]
    ChallengeExpired,

    #[error("{message}")]
    NotFound { field: &'static str, message: String },

    #[error("{message}")]
    Invalid { field: &'static str, message: String },

    #[error("{message}")]
    Duplicate { field: &'static str, message: String },

    #[error("text type `{0}` is not supported")]
    UnsupportedFormat(String),

    /// The renderer failed; `detail` is safe to show, the cause stays in the
    /// source chain.
    #[error("failed to render the source text: {detail}")]
    RenderFailure {
        detail: String,
        #[source]
        source: RenderError,
    },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ActionError {
    pub fn denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn not_found(field: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            field,
            message: message.into(),
        }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    pub fn duplicate(field: &'static str, message: impl Into<String>) -> Self {
        Self::Duplicate {
            field,
            message: message.into(),
        }
    }

    /// The request field this error is reported against.
    pub fn field(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "permission",
            Self::InvalidCredentials => "password",
            Self::ChallengeExpired => "timestamp",
            Self::NotFound { field, .. }
            | Self::Invalid { field, .. }
            | Self::Duplicate { field, .. } => *field,
            Self::UnsupportedFormat(_) => "text_type",
            Self::RenderFailure { .. } => "source_text",
            Self::Store(_) => "exception",
        }
    }

    /// Whether this is an ordinary rejection rather than a fault.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

impl From<PermsError> for ActionError {
    fn from(err: PermsError) -> Self {
        match err {
            PermsError::PermissionDenied { .. } => Self::denied(err.to_string()),
            PermsError::InvalidCredentials => Self::InvalidCredentials,
            PermsError::ChallengeExpired { .. } => Self::ChallengeExpired,
        }
    }
}

impl From<ValidationError> for ActionError {
    fn from(err: ValidationError) -> Self {
        Self::Invalid {
            field: err.field,
            message: err.message,
        }
    }
}

impl From<RenderError> for ActionError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::UnsupportedFormat(ext) => Self::UnsupportedFormat(ext),
            failure @ RenderError::RenderFailure { .. } => Self::RenderFailure {
                detail: failure.detail(),
                source: failure,
            },
        }
    }
}

/// Result type for actions.
pub type ActionResult<T> = std::result::Result<T, ActionError>;
