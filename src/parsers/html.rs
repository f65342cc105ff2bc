use crate::browser::Anchor;
use crate::parsers::{ParseResult, text};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static BODY: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("body").ok());
static ANCHOR: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("a").ok());

/// Parses an HTML document into cleaned body text and resolved anchors.
///
/// `page_url` is the base for relative hrefs; anchors whose href cannot be
/// resolved are dropped, the same way a browser leaves `a.href` empty.
pub fn parse(html: &str, page_url: &str) -> ParseResult {
    let doc = Html::parse_document(html);
    let content = body_text(&doc);
    let anchors = anchors(&doc, page_url);

    ::log::debug!("HTML parser found {} anchors in {}", anchors.len(), page_url);
    ParseResult::new(content, anchors)
}

/// Parses HTML content but only extracts text (no anchors)
pub fn parse_text_only(html: &str) -> ParseResult {
    let doc = Html::parse_document(html);
    ParseResult::content_only(body_text(&doc))
}

fn body_text(doc: &Html) -> String {
    let Some(selector) = BODY.as_ref() else {
        return String::new();
    };
    let raw = doc
        .select(selector)
        .flat_map(|n| n.text())
        .collect::<Vec<_>>()
        .join(" ");
    text::clean_text(&raw)
}

fn anchors(doc: &Html, page_url: &str) -> Vec<Anchor> {
    let Some(selector) = ANCHOR.as_ref() else {
        return Vec::new();
    };
    let base = Url::parse(page_url).ok();

    doc.select(selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let resolved = resolve_href(base.as_ref(), href)?;
            Some(Anchor::new(anchor_text(&element), resolved))
        })
        .collect()
}

fn anchor_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn resolve_href(base: Option<&Url>, href: &str) -> Option<String> {
    let resolved = match base {
        Some(base) => base.join(href.trim()),
        None => Url::parse(href.trim()),
    };
    resolved.ok().map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_and_anchors() {
        let html = r#"<html><body>
            <p>Hello,   world!</p>
            <footer>
              <a href="/privacy">Privacy <b>Policy</b></a>
              <a href="https://other.org/terms">Terms</a>
            </footer>
        </body></html>"#;
        let result = parse(html, "https://www.example.com/shop/item");
        assert_eq!(result.content, "Hello, world! Privacy Policy Terms");
        assert_eq!(result.anchors.len(), 2);
        assert_eq!(result.anchors[0].href, "https://www.example.com/privacy");
        assert_eq!(result.anchors[0].text.trim(), "Privacy Policy");
        assert_eq!(result.anchors[1].href, "https://other.org/terms");
    }

    #[test]
    fn skips_anchors_without_href() {
        let html = r#"<body><a name="top">Privacy</a><a href="legal/privacy.html">Privacy</a></body>"#;
        let result = parse(html, "https://example.com/docs/");
        assert_eq!(result.anchors.len(), 1);
        assert_eq!(result.anchors[0].href, "https://example.com/docs/legal/privacy.html");
    }

    #[test]
    fn text_only() {
        let result = parse_text_only("<body><h1>Policy</h1>\n\n<p>We   collect</p></body>");
        assert_eq!(result.content, "Policy We collect");
        assert!(result.anchors.is_empty());
    }
}
