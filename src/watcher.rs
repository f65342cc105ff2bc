use crate::browser::{DomMutation, PageSource};
use crate::domain::domain_from_url;
use crate::fetch::PolicyFetcher;
use crate::messages::{ContentFetched, LinkSummary, LinksFound, Message, PageReport, Response, TabId, TabInfo};
use crate::results::AnalysisPayload;
use crate::router::RouterHandle;
use crate::scorer::rank_candidates;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Quiet window used when none is configured
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Trailing-edge debounce: every trigger pushes the deadline out by one
/// window, and only the last trigger of a burst fires.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the pending deadline if it has passed
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Dedup state of one watcher instance
#[derive(Debug, Default)]
pub struct WatcherState {
    /// Location whose policy was fetched and reported
    pub processed_location: Option<String>,
    /// Location for which PRIVACY_LINKS_FOUND was reported
    pub links_reported_for: Option<String>,
    pub scans: u64,
}

impl WatcherState {
    fn enter_location(&mut self, location: &str) {
        let stale = |seen: &Option<String>| seen.as_deref().is_some_and(|l| l != location);
        if stale(&self.processed_location) || stale(&self.links_reported_for) {
            ::log::debug!("Location changed to {}, resetting watcher state", location);
            self.clear();
        }
    }

    fn clear(&mut self) {
        self.processed_location = None;
        self.links_reported_for = None;
    }
}

/// What a finished watcher did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSummary {
    pub scans: u64,
}

/// A candidate fetch running on its own task
struct PendingFetch {
    location: String,
    task: JoinHandle<bool>,
}

/// Keeps one tab's best privacy policy candidate fresh while its document
/// changes. All per-page state lives in a `WatcherState` owned by the
/// watcher task and dropped on teardown.
pub struct ContentWatcher {
    tab: TabId,
    page: Arc<dyn PageSource>,
    fetcher: Arc<dyn PolicyFetcher>,
    router: RouterHandle,
    debounce: Duration,
}

impl ContentWatcher {
    pub fn new(
        tab: TabId,
        page: Arc<dyn PageSource>,
        fetcher: Arc<dyn PolicyFetcher>,
        router: RouterHandle,
    ) -> Self {
        Self {
            tab,
            page,
            fetcher,
            router,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Activate the watcher: scan immediately, then rescan after each burst
    /// of mutations has been quiet for the debounce window.
    pub fn spawn(self, mutations: mpsc::Receiver<DomMutation>) -> WatcherHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(mutations, shutdown_rx));
        WatcherHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(
        self,
        mut mutations: mpsc::Receiver<DomMutation>,
        mut shutdown: watch::Receiver<bool>,
    ) -> WatcherSummary {
        let mut state = WatcherState::default();
        let mut debouncer = Debouncer::new(self.debounce);
        let mut observing = true;

        ::log::info!("Starting initial privacy scan for tab {}", self.tab);
        let mut pending = self.scan(&mut state, &shutdown).await;

        loop {
            if is_torn_down(&shutdown) {
                break;
            }
            let deadline = debouncer.deadline();
            if !observing && deadline.is_none() && pending.is_none() {
                ::log::debug!("Mutation feed for tab {} closed", self.tab);
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                (location, reported) = settle(&mut pending), if pending.is_some() => {
                    pending = None;
                    if reported {
                        state.processed_location = Some(location);
                    }
                }
                mutation = mutations.recv(), if observing => match mutation {
                    Some(mutation) => {
                        ::log::trace!("Tab {} saw {} mutation records", self.tab, mutation.records);
                        debouncer.trigger(Instant::now());
                    }
                    None => observing = false,
                },
                // A due scan waits for the fetch in flight
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() && pending.is_none() => {
                    if debouncer.take_due(Instant::now()) {
                        pending = self.scan(&mut state, &shutdown).await;
                    }
                }
            }
        }

        // Detach any fetch in flight; it sees the teardown and drops its result
        drop(pending);
        debouncer.cancel();
        mutations.close();
        let summary = WatcherSummary { scans: state.scans };
        state.clear();
        ::log::debug!("Watcher for tab {} stopped after {} scans", self.tab, summary.scans);
        summary
    }

    async fn scan(&self, state: &mut WatcherState, shutdown: &watch::Receiver<bool>) -> Option<PendingFetch> {
        state.scans += 1;

        let location = match self.page.location().await {
            Ok(location) => location,
            Err(e) => {
                ::log::warn!("Tab {} location unavailable: {}", self.tab, e);
                return None;
            }
        };
        state.enter_location(&location);
        if state.processed_location.as_deref() == Some(location.as_str()) {
            ::log::trace!("Already processed {}", location);
            return None;
        }

        let anchors = match self.page.anchors().await {
            Ok(anchors) => anchors,
            Err(e) => {
                ::log::warn!("Tab {} anchors unavailable: {}", self.tab, e);
                return None;
            }
        };
        let ranked = rank_candidates(&anchors, &domain_from_url(&location));
        let sender = TabInfo::new(self.tab, location.clone());

        let Some(best) = ranked.into_iter().next() else {
            if state.links_reported_for.as_deref() == Some(location.as_str()) {
                ::log::debug!("Links vanished from {}, keeping earlier report", location);
                return None;
            }
            ::log::debug!("No privacy policy link on {}", location);
            report(
                &self.router,
                Message::NoPrivacyLink {
                    data: PageReport { url: location },
                },
                sender,
            )
            .await;
            return None;
        };

        ::log::info!("Found privacy policy on {}: {} ({})", location, best.href, best.text);
        state.links_reported_for = Some(location.clone());
        report(
            &self.router,
            Message::PrivacyLinksFound {
                data: LinksFound {
                    url: location.clone(),
                    links: vec![LinkSummary {
                        text: best.text,
                        href: best.href.clone(),
                    }],
                },
            },
            sender.clone(),
        )
        .await;

        let task = tokio::spawn(fetch_and_report(
            self.fetcher.clone(),
            self.router.clone(),
            best.href,
            sender,
            shutdown.clone(),
        ));
        Some(PendingFetch { location, task })
    }
}

/// Fetch `href` and report its content unless the watcher was torn down
/// meanwhile. True when the router accepted the content.
async fn fetch_and_report(
    fetcher: Arc<dyn PolicyFetcher>,
    router: RouterHandle,
    href: String,
    sender: TabInfo,
    shutdown: watch::Receiver<bool>,
) -> bool {
    let fetched = match fetcher.fetch(&href).await {
        Ok(fetched) => fetched,
        Err(e) => {
            ::log::error!("Failed to fetch privacy policy content from {}: {}", href, e);
            return false;
        }
    };
    if is_torn_down(&shutdown) {
        ::log::debug!("Discarding content for {}: watcher torn down", href);
        return false;
    }

    ::log::info!("Successfully fetched privacy policy content from {}", href);
    let message = Message::PrivacyContentFetched {
        data: ContentFetched {
            url: href,
            content: fetched.content,
            analysis: fetched.analysis.map(AnalysisPayload::into_result),
        },
    };
    report(&router, message, sender).await.is_some_and(|r| !r.is_error())
}

/// Resolves once the pending fetch finishes; never resolves without one
async fn settle(pending: &mut Option<PendingFetch>) -> (String, bool) {
    match pending.as_mut() {
        Some(fetch) => {
            let reported = match (&mut fetch.task).await {
                Ok(reported) => reported,
                Err(e) => {
                    ::log::error!("Policy fetch task failed: {}", e);
                    false
                }
            };
            (fetch.location.clone(), reported)
        }
        None => std::future::pending().await,
    }
}

async fn report(router: &RouterHandle, message: Message, sender: TabInfo) -> Option<Response> {
    let kind = message.kind();
    match router.send(&message, Some(sender)).await {
        Ok(response) => {
            if let Response::Error { error } = &response {
                ::log::warn!("Router rejected {}: {}", kind, error);
            }
            Some(response)
        }
        Err(e) => {
            ::log::warn!("Error sending {}: {}", kind, e);
            None
        }
    }
}

fn is_torn_down(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

/// Owner of a running watcher. Dropping it also tears the watcher down.
pub struct WatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<WatcherSummary>,
}

impl WatcherHandle {
    /// Stop observing and wait for the watcher loop to exit. A fetch in flight
    /// is left to finish on its own and its result is dropped.
    pub async fn shutdown(self) -> Option<WatcherSummary> {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(summary) => Some(summary),
            Err(e) => {
                ::log::error!("Watcher task failed: {}", e);
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
