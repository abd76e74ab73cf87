//! Error types for rendering.

use thiserror::Error;

/// The opaque failure a renderer may report.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from [`RendererRegistry::render`](crate::RendererRegistry::render).
#[derive(Debug, Error)]
pub enum RenderError {
    /// No renderer is registered for the extension.
    #[error("extension `{0}` is not supported")]
    UnsupportedFormat(String),

    /// The renderer failed. The cause is kept as the error source.
    #[error("failed to render `{ext}` source")]
    RenderFailure {
        ext: String,
        #[source]
        source: BoxError,
    },
}

impl RenderError {
    /// Sanitized description including the renderer's own message, without
    /// anything deeper in the chain.
    pub fn detail(&self) -> String {
        match self {
            RenderError::UnsupportedFormat(_) => self.to_string(),
            RenderError::RenderFailure { source, .. } => format!("{self}: {source}"),
        }
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
