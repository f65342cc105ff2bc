pub mod badge;
pub mod browser;
pub mod cache;
pub mod config;
pub mod display;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod messages;
pub mod parsers;
pub mod popup;
pub mod results;
pub mod router;
pub mod scorer;
pub mod server;
pub mod utils;
pub mod watcher;

#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use results::{AnalysisResult, PolicyRecord};

use badge::{BadgeController, MemoryIndicator, TabIndicator};
use browser::PageSource;
use cache::{PolicyCache, StorageArea};
use fetch::PolicyFetcher;
use messages::TabId;
use popup::PopupController;
use router::{MessageRouter, RouterHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use watcher::{ContentWatcher, DEFAULT_DEBOUNCE};

/// Builder for the background side of the extension
pub struct Extension {
    storage: Arc<dyn StorageArea>,
    indicator: Arc<dyn TabIndicator>,
    debounce: Duration,
}

impl Extension {
    /// Create a builder over the given storage area
    pub fn new(storage: Arc<dyn StorageArea>) -> Self {
        Self {
            storage,
            indicator: Arc::new(MemoryIndicator::new()),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Use a different tab indicator
    pub fn with_indicator(mut self, indicator: Arc<dyn TabIndicator>) -> Self {
        self.indicator = indicator;
        self
    }

    /// Set the quiet window of watchers created by the runtime
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start the message router
    pub fn start(self) -> ExtensionRuntime {
        let cache = PolicyCache::new(self.storage);
        let badges = BadgeController::new(self.indicator);
        let (router, task) = MessageRouter::new(cache.clone(), badges.clone()).spawn();
        ExtensionRuntime {
            router,
            cache,
            badges,
            debounce: self.debounce,
            task,
        }
    }
}

/// A running background context
pub struct ExtensionRuntime {
    pub router: RouterHandle,
    pub cache: PolicyCache,
    pub badges: BadgeController,
    debounce: Duration,
    task: JoinHandle<()>,
}

impl ExtensionRuntime {
    /// A content watcher for `tab`, wired to this runtime's router
    pub fn watcher(
        &self,
        tab: TabId,
        page: Arc<dyn PageSource>,
        fetcher: Arc<dyn PolicyFetcher>,
    ) -> ContentWatcher {
        ContentWatcher::new(tab, page, fetcher, self.router.clone()).with_debounce(self.debounce)
    }

    /// A popup controller reading this runtime's cache
    pub fn popup(&self) -> PopupController {
        PopupController::new(self.cache.clone(), self.router.clone())
    }

    /// Stop the router task
    pub fn shutdown(self) {
        self.task.abort();
    }
}
