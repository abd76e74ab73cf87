//! CommonMark rendering.

use pulldown_cmark::{html, Options, Parser};

use crate::error::BoxError;
use crate::registry::Renderer;

/// CommonMark with fenced code blocks, tables and strikethrough.
#[derive(Debug, Clone, Copy, Default)]
pub struct Markdown;

impl Markdown {
    fn options() -> Options {
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES
    }
}

impl Renderer for Markdown {
    fn render(&self, source: &str) -> Result<String, BoxError> {
        let parser = Parser::new_ext(source, Self::options());
        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}
