//! # Cage Render
//!
//! Converts article source text into HTML.
//!
//! ## Overview
//!
//! A [`RendererRegistry`] maps a file-extension-like key (`md`) to a
//! [`Renderer`]. The registry is filled once at startup and then shared
//! read-only; registering the same extension twice is a configuration error.
//!
//! ## Key Types
//!
//! - [`RendererRegistry`] - Ordered extension -> renderer map
//! - [`Renderer`] - Anything that can turn source text into HTML
//! - [`RendererInfo`] - Listing entry: extension, name, description
//! - [`RenderError`] - Unsupported extension or a failed conversion
//!
//! ## Usage
//!
//! ```rust
//! use cage_render::RendererRegistry;
//!
//! let registry = RendererRegistry::with_builtins().unwrap();
//! let html = registry.render("md", "# hi").unwrap();
//! assert!(html.contains("<h1>hi</h1>"));
//! ```

pub mod error;
pub mod markdown;
pub mod registry;

pub use error::{BoxError, RenderError, Result};
pub use markdown::Markdown;
pub use registry::{Renderer, RendererInfo, RendererRegistry};
