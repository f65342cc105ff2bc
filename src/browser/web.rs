use crate::browser::{Anchor, DomMutation, PageSource};
use crate::error::PageError;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Reads every anchor in one round trip; `a.href` is already resolved.
const ANCHORS_SCRIPT: &str = r#"
return Array.from(document.getElementsByTagName('a')).map(function (a) {
    return { text: a.textContent || '', href: a.href || '' };
});
"#;

/// Installs a subtree observer once per document and returns how many
/// mutation records it has seen so far.
const MUTATION_COUNTER_SCRIPT: &str = r#"
if (typeof window.__privacyPalMutations !== 'number') {
    window.__privacyPalMutations = 0;
    new MutationObserver(function (records) {
        window.__privacyPalMutations += records.length;
    }).observe(document.documentElement || document, { childList: true, subtree: true });
}
return window.__privacyPalMutations;
"#;

/// Well-known WebDriver endpoints tried when the configured one is down
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444",
];

/// Connects to the WebDriver instance, falling back to common local ports
pub async fn connect_to_webdriver(webdriver_url: &str) -> Result<Client, PageError> {
    match ClientBuilder::native().connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
        }
    }

    for url in FALLBACK_WEBDRIVER_URLS.iter() {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = ClientBuilder::native().connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(PageError::NoWebDriver)
}

/// A live browser tab driven over WebDriver
pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Open a new session against `webdriver_url`
    pub async fn connect(webdriver_url: &str) -> Result<Self, PageError> {
        Ok(Self::new(connect_to_webdriver(webdriver_url).await?))
    }

    /// Navigate the tab
    pub async fn open(&self, url: &str) -> Result<(), PageError> {
        self.client.goto(url).await?;
        Ok(())
    }

    /// Start polling the page's mutation counter.
    ///
    /// The returned receiver yields one event per poll that saw new records.
    /// A navigation resets the in-page counter, which is also reported as a
    /// mutation. The task ends when the receiver is dropped or the session
    /// goes away.
    pub fn watch_mutations(&self, poll: Duration) -> (mpsc::Receiver<DomMutation>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();

        let task = tokio::spawn(async move {
            let mut seen: u64 = 0;
            let mut interval = tokio::time::interval(poll);
            loop {
                interval.tick().await;
                if tx.is_closed() {
                    break;
                }

                let count = match client.execute(MUTATION_COUNTER_SCRIPT, Vec::new()).await {
                    Ok(value) => value.as_u64().unwrap_or(0),
                    Err(e) => {
                        if e.to_string().contains("Unable to find session") {
                            ::log::warn!("WebDriver session lost, stopping mutation polling");
                            break;
                        }
                        ::log::debug!("Mutation poll failed: {}", e);
                        continue;
                    }
                };

                let records = if count >= seen { count - seen } else { count.max(1) };
                seen = count;
                if records == 0 {
                    continue;
                }

                ::log::trace!("Observed {} DOM mutation records", records);
                if tx.send(DomMutation { records }).await.is_err() {
                    break;
                }
            }
        });

        (rx, task)
    }

    /// End the WebDriver session
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            ::log::warn!("Failed to close WebDriver client: {}", e);
        }
    }
}

#[async_trait]
impl PageSource for WebDriverPage {
    async fn location(&self) -> Result<String, PageError> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn anchors(&self) -> Result<Vec<Anchor>, PageError> {
        let value = self.client.execute(ANCHORS_SCRIPT, Vec::new()).await?;
        let anchors: Vec<Anchor> =
            serde_json::from_value(value).map_err(|e| PageError::ScriptResult(e.to_string()))?;
        Ok(anchors.into_iter().filter(|a| !a.href.is_empty()).collect())
    }
}
