use crate::utils::with_port;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Runtime configuration shared by the service and the scan front-end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalConfig {
    /// Base URL of the scraping service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Quiet window before a DOM change triggers a rescan
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// How often a live page's mutation counter is polled
    #[serde(default = "default_mutation_poll_ms")]
    pub mutation_poll_ms: u64,

    /// Where the policy cache is persisted
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// Bind address of the scraping service
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// HTTP timeout toward the scraping service, and render timeout inside it
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_mutation_poll_ms() -> u64 {
    250
}

fn default_storage_path() -> String {
    "privacy-pal-storage.json".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

impl Default for PalConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            debounce_ms: default_debounce_ms(),
            webdriver_url: default_webdriver_url(),
            mutation_poll_ms: default_mutation_poll_ms(),
            storage_path: default_storage_path(),
            listen_addr: default_listen_addr(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl PalConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `API_URL`, `WEBDRIVER_URL` and `PORT` from the environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any lookup; empty values are ignored
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_url) = get("API_URL") {
            self.api_url = api_url;
        }
        if let Some(webdriver_url) = get("WEBDRIVER_URL") {
            self.webdriver_url = webdriver_url;
        }
        if let Some(port) = get("PORT") {
            self.listen_addr = with_port(&self.listen_addr, port.trim());
        }
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn mutation_poll(&self) -> Duration {
        Duration::from_millis(self.mutation_poll_ms.max(10))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
