pub mod html;
pub mod text;

use crate::browser::Anchor;

/// Result of parsing a rendered page
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Cleaned visible text of the body
    pub content: String,
    /// Anchors in document order, hrefs resolved to absolute URLs
    pub anchors: Vec<Anchor>,
}

impl ParseResult {
    /// Creates a new parse result with the given content and anchors
    pub fn new(content: String, anchors: Vec<Anchor>) -> Self {
        Self { content, anchors }
    }

    /// Creates a new parse result with content only (no anchors)
    pub fn content_only(content: String) -> Self {
        Self {
            content,
            anchors: Vec::new(),
        }
    }
}
