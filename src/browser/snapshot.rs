use crate::browser::{Anchor, PageSource};
use crate::error::PageError;
use crate::parsers;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// A page backed by a static HTML document.
///
/// The document can be replaced to simulate client-side rendering; callers
/// that do so are expected to emit the matching `DomMutation` themselves.
pub struct SnapshotPage {
    state: RwLock<Snapshot>,
}

struct Snapshot {
    location: String,
    anchors: Vec<Anchor>,
}

impl SnapshotPage {
    /// Parse `html` as the document loaded at `location`
    pub fn new(location: &str, html: &str) -> Self {
        Self {
            state: RwLock::new(Snapshot {
                location: location.to_string(),
                anchors: parsers::html::parse(html, location).anchors,
            }),
        }
    }

    /// Replace the document body, keeping the location
    pub async fn set_html(&self, html: &str) {
        let mut state = self.state.write().await;
        state.anchors = parsers::html::parse(html, &state.location).anchors;
    }

    /// Navigate to a new location with a new document
    pub async fn navigate(&self, location: &str, html: &str) {
        let mut state = self.state.write().await;
        state.location = location.to_string();
        state.anchors = parsers::html::parse(html, location).anchors;
    }
}

#[async_trait]
impl PageSource for SnapshotPage {
    async fn location(&self) -> Result<String, PageError> {
        Ok(self.state.read().await.location.clone())
    }

    async fn anchors(&self) -> Result<Vec<Anchor>, PageError> {
        Ok(self.state.read().await.anchors.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_parsed_anchors() {
        let page = SnapshotPage::new(
            "https://example.com/",
            r#"<body><a href="/privacy">Privacy Policy</a></body>"#,
        );
        assert_eq!(page.location().await.unwrap(), "https://example.com/");
        let anchors = page.anchors().await.unwrap();
        assert_eq!(anchors, vec![Anchor::new("Privacy Policy", "https://example.com/privacy")]);

        page.set_html("<body></body>").await;
        assert!(page.anchors().await.unwrap().is_empty());

        page.navigate("https://other.org/", r#"<body><a href="p">Privacy</a></body>"#).await;
        assert_eq!(page.location().await.unwrap(), "https://other.org/");
        assert_eq!(page.anchors().await.unwrap()[0].href, "https://other.org/p");
    }
}
