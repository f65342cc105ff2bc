use crate::error::FetchError;
use crate::results::ScrapeResponse;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches a candidate policy page through the scraping collaborator
#[async_trait]
pub trait PolicyFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ScrapeResponse, FetchError>;
}

/// HTTP client for `GET <api_url>/scrape?url=<target>`
pub struct ScrapeClient {
    client: Client,
    endpoint: Url,
}

impl ScrapeClient {
    /// `api_url` is the service base, like `http://localhost:3000`
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let endpoint_str = format!("{}/scrape", api_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint_str).map_err(|source| FetchError::Endpoint {
            endpoint: endpoint_str.clone(),
            source,
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("privacy-pal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PolicyFetcher for ScrapeClient {
    async fn fetch(&self, url: &str) -> Result<ScrapeResponse, FetchError> {
        let mut request_url = self.endpoint.clone();
        request_url.query_pairs_mut().append_pair("url", url);

        ::log::debug!("Fetching policy content: {}", request_url);
        let resp = self.client.get(request_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: ScrapeResponse = resp.json().await?;
        if data.content.trim().is_empty() {
            return Err(FetchError::EmptyContent(url.to_string()));
        }
        Ok(data)
    }
}
