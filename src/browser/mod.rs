pub mod snapshot;
pub mod web;

use crate::error::PageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An `<a>` element as the page renders it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Visible text (`textContent`)
    pub text: String,
    /// Absolute, resolved target URL
    pub href: String,
}

impl Anchor {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }
}

/// Notification that nodes were added to or removed from the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomMutation {
    /// Number of mutation records coalesced into this event
    pub records: u64,
}

/// Read access to a live page
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Current location of the page
    async fn location(&self) -> Result<String, PageError>;

    /// All anchors currently in the document, in document order
    async fn anchors(&self) -> Result<Vec<Anchor>, PageError>;
}
