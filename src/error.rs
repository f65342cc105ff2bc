use thiserror::Error;

/// Failures talking to the scraping collaborator
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid scrape endpoint `{endpoint}`: {source}")]
    Endpoint {
        endpoint: String,
        source: url::ParseError,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scraper returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("scraper returned no content for {0}")]
    EmptyContent(String),
}

/// Failures of the storage facility behind the policy cache
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("refusing to store a record under an empty domain")]
    EmptyKey,
}

/// Failures reading from the page context
#[derive(Debug, Error)]
pub enum PageError {
    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    #[error("could not connect to any WebDriver server")]
    NoWebDriver,

    #[error("unexpected script result: {0}")]
    ScriptResult(String),

    #[error("timed out rendering {0}")]
    Timeout(String),
}

/// Failure of the external policy analyzer
#[derive(Debug, Error)]
#[error("failed to analyze privacy policy: {0}")]
pub struct AnalyzeError(pub String);

/// Boundary violations of the message protocol
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown message type")]
    UnknownType(String),

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("No tab ID found")]
    MissingSender,

    #[error("Invalid domain")]
    InvalidDomain,

    #[error("Failed to store content")]
    StoreFailed,
}

/// Failures delivering a message to the router
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("message router is not running")]
    Closed,

    #[error("message router dropped the reply")]
    NoReply,
}
