use crate::browser::web::connect_to_webdriver;
use crate::error::{AnalyzeError, PageError};
use crate::parsers;
use crate::results::{AnalysisPayload, AnalysisResult, ScrapeResponse};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use fantoccini::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

/// Characters of policy text handed to the analyzer
pub const ANALYSIS_INPUT_CHARS: usize = 14_000;

/// Renders a page and returns its HTML source
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, PageError>;
}

/// Scores cleaned policy text. Implementations call out to a language
/// model; none ships with this crate.
#[async_trait]
pub trait PolicyAnalyzer: Send + Sync {
    async fn analyze(&self, content: &str) -> Result<AnalysisResult, AnalyzeError>;
}

/// Renderer backed by one lazily connected WebDriver session.
///
/// Renders are serialized on the session. A lost session is reconnected
/// once per request.
pub struct WebDriverRenderer {
    webdriver_url: String,
    timeout: Duration,
    client: Mutex<Option<Client>>,
}

impl WebDriverRenderer {
    pub fn new(webdriver_url: &str, timeout: Duration) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            timeout,
            client: Mutex::new(None),
        }
    }

    async fn navigate(&self, client: &Client, url: &str) -> Result<String, PageError> {
        let load = async {
            client.goto(url).await?;
            Ok::<_, PageError>(client.source().await?)
        };
        match tokio::time::timeout(self.timeout, load).await {
            Ok(result) => result,
            Err(_) => Err(PageError::Timeout(url.to_string())),
        }
    }
}

#[async_trait]
impl PageRenderer for WebDriverRenderer {
    async fn render(&self, url: &str) -> Result<String, PageError> {
        let mut slot = self.client.lock().await;

        for attempt in 0..2 {
            let client = match slot.as_ref() {
                Some(client) => client.clone(),
                None => {
                    let client = connect_to_webdriver(&self.webdriver_url).await?;
                    *slot = Some(client.clone());
                    client
                }
            };

            match self.navigate(&client, url).await {
                Ok(html) => return Ok(html),
                Err(PageError::WebDriver(e)) if attempt == 0 && e.to_string().contains("Unable to find session") => {
                    ::log::warn!("Lost WebDriver session while rendering {}, reconnecting", url);
                    *slot = None;
                }
                Err(e) => return Err(e),
            }
        }
        Err(PageError::NoWebDriver)
    }
}

#[derive(Clone)]
pub struct ScrapeState {
    renderer: Arc<dyn PageRenderer>,
    analyzer: Option<Arc<dyn PolicyAnalyzer>>,
}

impl ScrapeState {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            renderer,
            analyzer: None,
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn PolicyAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeQuery {
    url: Option<String>,
}

/// Create the router for the scraping service
pub fn create_router(state: ScrapeState) -> Router {
    Router::new()
        .route("/scrape", get(scrape))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(addr: &str, state: ScrapeState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    ::log::info!("PrivacyPal scrape service running on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            ::log::info!("Shutting down scrape service");
        })
        .await
}

async fn health_check() -> &'static str {
    "ok"
}

async fn scrape(State(state): State<Arc<ScrapeState>>, Query(query): Query<ScrapeQuery>) -> Response {
    let Some(url) = query.url.filter(|u| !u.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "URL parameter is required" })),
        )
            .into_response();
    };

    match scrape_policy(&state, &url).await {
        Ok(body) => Json(body).into_response(),
        Err(message) => {
            ::log::error!("Scraping error for {}: {}", url, message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to scrape privacy policy",
                    "message": message,
                })),
            )
                .into_response()
        }
    }
}

async fn scrape_policy(state: &ScrapeState, url: &str) -> Result<ScrapeResponse, String> {
    let started = std::time::Instant::now();
    let html = state.renderer.render(url).await.map_err(|e| e.to_string())?;
    let content = parsers::html::parse_text_only(&html).content;
    ::log::debug!(
        "Rendered {} ({} chars) in {:.2} seconds",
        url,
        content.len(),
        started.elapsed().as_secs_f64()
    );

    let Some(analyzer) = &state.analyzer else {
        return Ok(ScrapeResponse {
            url: url.to_string(),
            content,
            analysis: None,
            message: None,
        });
    };

    let input = parsers::text::truncate_chars(&content, ANALYSIS_INPUT_CHARS);
    let summary = analyzer.analyze(input).await.map_err(|e| e.to_string())?;
    Ok(ScrapeResponse {
        url: url.to_string(),
        content,
        analysis: Some(AnalysisPayload::Wrapped {
            summary,
            analyzed_at: Some(chrono::Utc::now().to_rfc3339()),
        }),
        message: Some("Privacy policy analyzed".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::sample_analysis;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeRenderer;

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn render(&self, url: &str) -> Result<String, PageError> {
            if url.contains("broken") {
                return Err(PageError::Timeout(url.to_string()));
            }
            Ok("<html><body><h1>Privacy   Policy</h1>\n<p>We collect\n\nyour email.</p></body></html>".into())
        }
    }

    struct FakeAnalyzer {
        seen_chars: AtomicUsize,
    }

    #[async_trait]
    impl PolicyAnalyzer for FakeAnalyzer {
        async fn analyze(&self, content: &str) -> Result<AnalysisResult, AnalyzeError> {
            self.seen_chars.store(content.chars().count(), Ordering::SeqCst);
            Ok(sample_analysis(3))
        }
    }

    async fn spawn(state: ScrapeState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn returns_cleaned_content() {
        let base = spawn(ScrapeState::new(Arc::new(FakeRenderer))).await;
        let resp = reqwest::get(format!("{base}/scrape?url=https%3A%2F%2Fexample.com%2Fprivacy"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["url"], "https://example.com/privacy");
        assert_eq!(body["content"], "Privacy Policy We collect your email.");
        assert!(body.get("analysis").is_none());
    }

    #[tokio::test]
    async fn missing_url_is_bad_request() {
        let base = spawn(ScrapeState::new(Arc::new(FakeRenderer))).await;
        let resp = reqwest::get(format!("{base}/scrape")).await.unwrap();
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "URL parameter is required");
    }

    #[tokio::test]
    async fn render_failure_is_server_error() {
        let base = spawn(ScrapeState::new(Arc::new(FakeRenderer))).await;
        let resp = reqwest::get(format!("{base}/scrape?url=https%3A%2F%2Fbroken.example%2F"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Failed to scrape privacy policy");
        assert!(body["message"].as_str().unwrap().contains("broken.example"));
    }

    #[tokio::test]
    async fn attaches_analysis_when_configured() {
        let analyzer = Arc::new(FakeAnalyzer {
            seen_chars: AtomicUsize::new(0),
        });
        let state = ScrapeState::new(Arc::new(FakeRenderer)).with_analyzer(analyzer.clone());
        let base = spawn(state).await;

        let resp = reqwest::get(format!("{base}/scrape?url=https%3A%2F%2Fexample.com%2Fprivacy"))
            .await
            .unwrap();
        let body: ScrapeResponse = resp.json().await.unwrap();
        assert_eq!(body.analysis.map(AnalysisPayload::into_result), Some(sample_analysis(3)));
        assert_eq!(body.message.as_deref(), Some("Privacy policy analyzed"));
        assert_eq!(analyzer.seen_chars.load(Ordering::SeqCst), body.content.chars().count());
    }

    #[tokio::test]
    async fn health() {
        let base = spawn(ScrapeState::new(Arc::new(FakeRenderer))).await;
        let resp = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(resp.text().await.unwrap(), "ok");
    }
}
