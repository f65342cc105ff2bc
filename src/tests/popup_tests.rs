use crate::Extension;
use crate::browser::snapshot::SnapshotPage;
use crate::cache::{FileStorage, MemoryStorage};
use crate::display::render_popup;
use crate::error::FetchError;
use crate::fetch::PolicyFetcher;
use crate::popup::PopupView;
use crate::results::{AnalysisPayload, ScrapeResponse, sample_analysis};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const PAGE: &str = "https://shop.example.net/cart";
const HTML: &str = r#"<body><a href="https://example.net/privacy">Privacy</a></body>"#;

struct AnalyzedFetcher;

#[async_trait]
impl PolicyFetcher for AnalyzedFetcher {
    async fn fetch(&self, url: &str) -> Result<ScrapeResponse, FetchError> {
        Ok(ScrapeResponse {
            url: url.to_string(),
            content: "We sell nothing.".into(),
            analysis: Some(AnalysisPayload::Bare(sample_analysis(4))),
            message: Some("Privacy policy analyzed".into()),
        })
    }
}

#[tokio::test]
async fn open_popup_follows_watcher_result() {
    let runtime = Extension::new(Arc::new(MemoryStorage::new())).start();
    let mut session = runtime.popup().open(Some(PAGE)).await;
    assert_eq!(session.domain(), "example.net");
    assert_eq!(session.view(), PopupView::NoPolicy);

    let (_tx, rx) = mpsc::channel(4);
    let handle = runtime
        .watcher(1, Arc::new(SnapshotPage::new(PAGE, HTML)), Arc::new(AnalyzedFetcher))
        .spawn(rx);

    let next = tokio::time::timeout(Duration::from_secs(5), session.next_view())
        .await
        .unwrap();
    assert_eq!(next, Some(PopupView::Ready(sample_analysis(4))));

    handle.shutdown().await.unwrap();
    session.close().await;
}

#[tokio::test]
async fn popup_for_other_domain_is_not_disturbed() {
    let runtime = Extension::new(Arc::new(MemoryStorage::new())).start();
    let session = runtime.popup().open(Some("https://unrelated.org/")).await;

    let (_tx, rx) = mpsc::channel(4);
    let handle = runtime
        .watcher(1, Arc::new(SnapshotPage::new(PAGE, HTML)), Arc::new(AnalyzedFetcher))
        .spawn(rx);
    tokio::time::timeout(Duration::from_secs(5), async {
        while runtime.cache.get("example.net").await.is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(session.view(), PopupView::NoPolicy);
    assert!(session.is_following_changes());
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn stored_analysis_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    {
        let runtime = Extension::new(Arc::new(FileStorage::open(&path).await.unwrap())).start();
        let (_tx, rx) = mpsc::channel(4);
        let handle = runtime
            .watcher(1, Arc::new(SnapshotPage::new(PAGE, HTML)), Arc::new(AnalyzedFetcher))
            .spawn(rx);
        tokio::time::timeout(Duration::from_secs(5), async {
            while runtime.cache.get("example.net").await.is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        handle.shutdown().await.unwrap();
        runtime.shutdown();
    }

    let runtime = Extension::new(Arc::new(FileStorage::open(&path).await.unwrap())).start();
    let session = runtime.popup().open(Some("https://example.net/")).await;
    let view = session.view();
    assert_eq!(view, PopupView::Ready(sample_analysis(4)));

    let rendered = render_popup(session.domain(), &view, false);
    assert!(rendered.contains("Example"));
    assert!(rendered.contains("★★★★☆"));
}
