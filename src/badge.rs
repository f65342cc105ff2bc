use crate::messages::TabId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-tab processing state for one page load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingState {
    NoPolicyFound,
    Processing,
    ContentReady,
}

impl ProcessingState {
    /// Whether `next` may follow `current` within one page load.
    ///
    /// `NoPolicyFound` and `Processing` exclude each other, `ContentReady`
    /// only follows `Processing`. Repeating a state is always allowed.
    pub fn can_follow(current: Option<Self>, next: Self) -> bool {
        use ProcessingState::*;
        match (current, next) {
            (None, NoPolicyFound | Processing) => true,
            (None, ContentReady) => false,
            (Some(current), next) if current == next => true,
            (Some(Processing), ContentReady) => true,
            _ => false,
        }
    }

    pub fn badge(self) -> Badge {
        match self {
            ProcessingState::NoPolicyFound => Badge::new("✓", Rgb(0x4C, 0xAF, 0x50)),
            ProcessingState::Processing => Badge::new("⚙️", Rgb(0x19, 0x76, 0xD2)),
            ProcessingState::ContentReady => Badge::new("❗", Rgb(0xFF, 0xA0, 0x00)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// What a tab shows on the toolbar icon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: &'static str,
    pub color: Rgb,
}

impl Badge {
    const fn new(text: &'static str, color: Rgb) -> Self {
        Self { text, color }
    }
}

/// Indicator state of one tab, as held by the indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabBadge {
    pub state: ProcessingState,
    /// Page URL the state was recorded for
    pub url: String,
}

/// The browser's tab-scoped indicator API
#[async_trait]
pub trait TabIndicator: Send + Sync {
    async fn set(&self, tab: TabId, badge: TabBadge);

    async fn get(&self, tab: TabId) -> Option<TabBadge>;

    async fn clear(&self, tab: TabId);
}

/// Indicator that keeps badges in memory
#[derive(Default)]
pub struct MemoryIndicator {
    tabs: Mutex<HashMap<TabId, TabBadge>>,
}

impl MemoryIndicator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TabIndicator for MemoryIndicator {
    async fn set(&self, tab: TabId, badge: TabBadge) {
        let rendered = badge.state.badge();
        ::log::debug!("Tab {} badge: {} {}", tab, rendered.text, rendered.color);
        self.tabs.lock().await.insert(tab, badge);
    }

    async fn get(&self, tab: TabId) -> Option<TabBadge> {
        self.tabs.lock().await.get(&tab).cloned()
    }

    async fn clear(&self, tab: TabId) {
        self.tabs.lock().await.remove(&tab);
    }
}

/// Maps processing states onto a tab indicator
#[derive(Clone)]
pub struct BadgeController {
    indicator: Arc<dyn TabIndicator>,
}

impl BadgeController {
    pub fn new(indicator: Arc<dyn TabIndicator>) -> Self {
        Self { indicator }
    }

    /// Show `state` on `tab` for the page at `url`.
    ///
    /// A different `url` than the one on record starts a new page load.
    /// Returns false when the transition is rejected.
    pub async fn apply(&self, tab: TabId, url: &str, state: ProcessingState) -> bool {
        let current = self
            .indicator
            .get(tab)
            .await
            .filter(|badge| badge.url == url)
            .map(|badge| badge.state);

        if current == Some(state) {
            return true;
        }
        if !ProcessingState::can_follow(current, state) {
            ::log::warn!(
                "Ignoring badge transition {:?} -> {:?} for tab {}",
                current,
                state,
                tab
            );
            return false;
        }

        self.indicator
            .set(
                tab,
                TabBadge {
                    state,
                    url: url.to_string(),
                },
            )
            .await;
        true
    }

    /// Current state of `tab`, if any
    pub async fn state(&self, tab: TabId) -> Option<ProcessingState> {
        self.indicator.get(tab).await.map(|badge| badge.state)
    }

    /// The tab started a new page load
    pub async fn tab_navigated(&self, tab: TabId) {
        self.indicator.clear(tab).await;
    }

    /// The tab is gone
    pub async fn tab_closed(&self, tab: TabId) {
        self.indicator.clear(tab).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProcessingState::*;

    fn controller() -> BadgeController {
        BadgeController::new(Arc::new(MemoryIndicator::new()))
    }

    const PAGE: &str = "https://example.com/";

    #[test]
    fn badge_presentation() {
        assert_eq!(NoPolicyFound.badge().color.to_string(), "#4CAF50");
        assert_eq!(Processing.badge().color.to_string(), "#1976D2");
        assert_eq!(ContentReady.badge().color.to_string(), "#FFA000");
        assert_eq!(NoPolicyFound.badge().text, "✓");
    }

    #[test]
    fn transition_table() {
        assert!(ProcessingState::can_follow(None, NoPolicyFound));
        assert!(ProcessingState::can_follow(None, Processing));
        assert!(!ProcessingState::can_follow(None, ContentReady));
        assert!(ProcessingState::can_follow(Some(Processing), ContentReady));
        assert!(!ProcessingState::can_follow(Some(NoPolicyFound), Processing));
        assert!(!ProcessingState::can_follow(Some(Processing), NoPolicyFound));
        assert!(!ProcessingState::can_follow(Some(ContentReady), Processing));
        assert!(ProcessingState::can_follow(Some(ContentReady), ContentReady));
    }

    #[tokio::test]
    async fn setting_same_state_twice_is_idempotent() {
        let badges = controller();
        assert!(badges.apply(1, PAGE, Processing).await);
        assert!(badges.apply(1, PAGE, Processing).await);
        assert_eq!(badges.state(1).await, Some(Processing));
    }

    #[tokio::test]
    async fn rejects_out_of_order_transitions() {
        let badges = controller();
        assert!(!badges.apply(1, PAGE, ContentReady).await);
        assert_eq!(badges.state(1).await, None);

        assert!(badges.apply(1, PAGE, NoPolicyFound).await);
        assert!(!badges.apply(1, PAGE, Processing).await);
        assert_eq!(badges.state(1).await, Some(NoPolicyFound));
    }

    #[tokio::test]
    async fn new_page_load_resets_state() {
        let badges = controller();
        assert!(badges.apply(1, PAGE, NoPolicyFound).await);
        assert!(badges.apply(1, "https://example.com/other", Processing).await);
        assert_eq!(badges.state(1).await, Some(Processing));

        badges.tab_navigated(1).await;
        assert_eq!(badges.state(1).await, None);
    }

    #[tokio::test]
    async fn tabs_are_independent() {
        let badges = controller();
        assert!(badges.apply(1, PAGE, Processing).await);
        assert!(badges.apply(2, PAGE, NoPolicyFound).await);
        assert!(badges.apply(1, PAGE, ContentReady).await);
        assert_eq!(badges.state(2).await, Some(NoPolicyFound));

        badges.tab_closed(1).await;
        assert_eq!(badges.state(1).await, None);
        assert_eq!(badges.state(2).await, Some(NoPolicyFound));
    }
}
