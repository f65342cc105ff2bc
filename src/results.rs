use serde::{Deserialize, Serialize};

/// One scored area of a privacy policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSection {
    /// 1 (very poor) to 5 (excellent)
    pub score: u8,

    /// One or two sentence explanation
    pub justification: String,

    /// Longer explanation shown on demand
    pub learn_more: String,
}

/// Scores produced by the external analysis collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub data_collection_and_retention: AnalysisSection,
    pub data_usage: AnalysisSection,
    pub user_rights_and_controls: AnalysisSection,
}

/// Analysis as the scraper may deliver it: bare, or wrapped with a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisPayload {
    Wrapped {
        summary: AnalysisResult,
        #[serde(default)]
        analyzed_at: Option<String>,
    },
    Bare(AnalysisResult),
}

impl AnalysisPayload {
    pub fn into_result(self) -> AnalysisResult {
        match self {
            AnalysisPayload::Wrapped { summary, .. } => summary,
            AnalysisPayload::Bare(result) => result,
        }
    }
}

/// Body of a successful `GET /scrape` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    /// URL that was scraped
    pub url: String,

    /// Cleaned text of the page
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisPayload>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Persisted result for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// URL of the policy page
    pub url: String,

    /// Cleaned policy text
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,

    /// Epoch milliseconds of the write
    pub timestamp: u64,
}

impl PolicyRecord {
    pub fn new(url: String, content: String, analysis: Option<AnalysisResult>, timestamp: u64) -> Self {
        Self {
            url,
            content,
            analysis,
            timestamp,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_analysis(score: u8) -> AnalysisResult {
    let section = |name: &str| AnalysisSection {
        score,
        justification: format!("{name} is handled reasonably."),
        learn_more: format!("The policy describes {name} in some detail."),
    };
    AnalysisResult {
        data_collection_and_retention: section("collection"),
        data_usage: section("usage"),
        user_rights_and_controls: section("rights"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wrapped_and_bare_analysis() {
        let analysis = serde_json::to_value(sample_analysis(4)).unwrap();

        let wrapped = serde_json::json!({
            "url": "https://example.com/privacy",
            "content": "text",
            "analysis": { "summary": analysis, "analyzed_at": "2025-01-01T00:00:00Z" },
            "message": "ok"
        });
        let response: ScrapeResponse = serde_json::from_value(wrapped).unwrap();
        assert_eq!(
            response.analysis.map(AnalysisPayload::into_result),
            Some(sample_analysis(4))
        );

        let bare = serde_json::json!({
            "url": "https://example.com/privacy",
            "content": "text",
            "analysis": analysis
        });
        let response: ScrapeResponse = serde_json::from_value(bare).unwrap();
        assert_eq!(
            response.analysis.map(AnalysisPayload::into_result),
            Some(sample_analysis(4))
        );
    }

    #[test]
    fn content_only_response() {
        let body = r#"{"url":"https://example.com/privacy","content":"We collect data."}"#;
        let response: ScrapeResponse = serde_json::from_str(body).unwrap();
        assert!(response.analysis.is_none());
        assert!(response.message.is_none());
        assert_eq!(response.content, "We collect data.");
    }
}
