//! The renderer registry.

use std::collections::HashMap;
use std::fmt;

use cage_core::ConfigError;
use serde::Serialize;
use tracing::debug;

use crate::error::{BoxError, RenderError, Result};
use crate::markdown::Markdown;

/// Converts source text to HTML.
pub trait Renderer: Send + Sync {
    fn render(&self, source: &str) -> std::result::Result<String, BoxError>;
}

impl<F> Renderer for F
where
    F: Fn(&str) -> std::result::Result<String, BoxError> + Send + Sync,
{
    fn render(&self, source: &str) -> std::result::Result<String, BoxError> {
        self(source)
    }
}

/// Public description of a registered renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RendererInfo {
    pub ext: String,
    pub name: String,
    pub description: String,
}

struct Entry {
    info: RendererInfo,
    renderer: Box<dyn Renderer>,
}

/// Extension-keyed renderers in registration order.
#[derive(Default)]
pub struct RendererRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl RendererRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `md` already registered.
    pub fn with_builtins() -> cage_core::Result<Self> {
        let mut registry = Self::new();
        registry.register("md", "Markdown", "CommonMark with fenced code blocks", Markdown)?;
        Ok(registry)
    }

    /// Register a renderer. Extensions are unique and cannot be replaced.
    pub fn register(
        &mut self,
        ext: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        renderer: impl Renderer + 'static,
    ) -> cage_core::Result<()> {
        let ext = ext.into();
        if self.index.contains_key(&ext) {
            return Err(ConfigError::DuplicateRenderer(ext));
        }

        debug!(ext = %ext, "registering renderer");
        self.index.insert(ext.clone(), self.entries.len());
        self.entries.push(Entry {
            info: RendererInfo {
                ext,
                name: name.into(),
                description: description.into(),
            },
            renderer: Box::new(renderer),
        });
        Ok(())
    }

    /// Whether `ext` has a renderer.
    pub fn supports(&self, ext: &str) -> bool {
        self.index.contains_key(ext)
    }

    /// Registered renderers in registration order. Each call starts over.
    pub fn renderers(&self) -> impl Iterator<Item = &RendererInfo> + Clone + '_ {
        self.entries.iter().map(|entry| &entry.info)
    }

    /// Render `source` with the renderer registered for `ext`.
    pub fn render(&self, ext: &str, source: &str) -> Result<String> {
        let entry = self
            .index
            .get(ext)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| RenderError::UnsupportedFormat(ext.to_string()))?;

        entry
            .renderer
            .render(source)
            .map_err(|source| RenderError::RenderFailure {
                ext: ext.to_string(),
                source,
            })
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.info.ext))
            .finish()
    }
}
