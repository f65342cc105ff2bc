use crate::cache::{PolicyCache, StorageChange, changed_record};
use crate::domain::domain_from_url;
use crate::messages::{Message, Response};
use crate::results::{AnalysisResult, PolicyRecord};
use crate::router::RouterHandle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What the popup shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupView {
    Loading,
    Error(String),
    NoPolicy,
    Ready(AnalysisResult),
}

impl PopupView {
    fn from_record(record: Option<PolicyRecord>) -> Self {
        match record.and_then(|r| r.analysis) {
            Some(analysis) => PopupView::Ready(analysis),
            None => PopupView::NoPolicy,
        }
    }
}

/// Resolves the active tab's cached analysis for a popup
pub struct PopupController {
    cache: PolicyCache,
    router: RouterHandle,
}

impl PopupController {
    pub fn new(cache: PolicyCache, router: RouterHandle) -> Self {
        Self { cache, router }
    }

    /// Activate the popup for the tab currently at `active_tab_url`.
    ///
    /// A tab without a usable domain gets a permanent error view. Otherwise
    /// the cache is read directly, then through the router, and the session
    /// follows cache changes for that domain until it is closed.
    pub async fn open(&self, active_tab_url: Option<&str>) -> PopupSession {
        let domain = active_tab_url.map(domain_from_url).unwrap_or_default();
        if domain.is_empty() {
            ::log::warn!("Popup opened on a tab without a domain: {:?}", active_tab_url);
            let (_, view) = watch::channel(PopupView::Error("This page has no web domain".into()));
            return PopupSession {
                domain,
                view,
                listener: None,
            };
        }

        let (tx, mut view) = watch::channel(PopupView::Loading);
        // Subscribe first so a write racing the initial read is not lost
        let changes = self.cache.subscribe();

        let initial = self.resolve(&domain).await;
        ::log::debug!("Popup for {} resolved to {:?}", domain, initial);
        tx.send_replace(initial);
        let _ = view.borrow_and_update();

        let listener = tokio::spawn(follow_changes(domain.clone(), self.cache.clone(), changes, tx));
        PopupSession {
            domain,
            view,
            listener: Some(listener),
        }
    }

    async fn resolve(&self, domain: &str) -> PopupView {
        if let Some(analysis) = self.cache.get(domain).await.and_then(|r| r.analysis) {
            return PopupView::Ready(analysis);
        }

        let request = Message::GetPrivacyPolicy {
            domain: Some(domain.to_string()),
        };
        match self.router.send(&request, None).await {
            Ok(Response::Policy(record)) => PopupView::from_record(record),
            Ok(other) => {
                ::log::warn!("Unexpected reply to GET_PRIVACY_POLICY: {:?}", other);
                PopupView::NoPolicy
            }
            Err(e) => {
                ::log::error!("Error fetching analysis for {}: {}", domain, e);
                PopupView::Error(e.to_string())
            }
        }
    }
}

async fn follow_changes(
    domain: String,
    cache: PolicyCache,
    mut changes: broadcast::Receiver<StorageChange>,
    view: watch::Sender<PopupView>,
) {
    loop {
        let record = match changes.recv().await {
            Ok(change) if change.key == domain => changed_record(&change),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                ::log::debug!("Popup missed {} storage changes, re-reading {}", skipped, domain);
                cache.get(&domain).await
            }
            Err(RecvError::Closed) => break,
        };

        let Some(analysis) = record.and_then(|r| r.analysis) else {
            continue;
        };
        ::log::info!("Storage updated with new analysis for {}", domain);
        if view.send(PopupView::Ready(analysis)).is_err() {
            break;
        }
    }
}

/// One popup activation
pub struct PopupSession {
    domain: String,
    view: watch::Receiver<PopupView>,
    listener: Option<JoinHandle<()>>,
}

impl PopupSession {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn view(&self) -> PopupView {
        self.view.borrow().clone()
    }

    /// Wait for the next re-render. None once nothing can change anymore.
    pub async fn next_view(&mut self) -> Option<PopupView> {
        self.view.changed().await.ok()?;
        Some(self.view.borrow_and_update().clone())
    }

    pub fn is_following_changes(&self) -> bool {
        self.listener.as_ref().is_some_and(|l| !l.is_finished())
    }

    /// Tear down the popup and its change subscription
    pub async fn close(mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            let _ = listener.await;
        }
    }
}

impl Drop for PopupSession {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
