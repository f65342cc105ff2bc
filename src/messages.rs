use crate::error::ProtocolError;
use crate::results::{AnalysisResult, PolicyRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type TabId = u32;

/// Identity of the tab a message was sent from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
}

impl TabInfo {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self { id, url: url.into() }
    }
}

/// Best candidate link as reported to the router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSummary {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageReport {
    /// Location of the page that was scanned
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinksFound {
    pub url: String,
    pub links: Vec<LinkSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFetched {
    /// URL of the policy page that was fetched
    pub url: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
}

/// The four messages the router understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    NoPrivacyLink { data: PageReport },
    PrivacyLinksFound { data: LinksFound },
    PrivacyContentFetched { data: ContentFetched },
    GetPrivacyPolicy {
        #[serde(default)]
        domain: Option<String>,
    },
}

const KNOWN_TYPES: [&str; 4] = [
    "NO_PRIVACY_LINK",
    "PRIVACY_LINKS_FOUND",
    "PRIVACY_CONTENT_FETCHED",
    "GET_PRIVACY_POLICY",
];

impl Message {
    /// Decode a wire message, separating unknown tags from malformed payloads
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default();
        if !KNOWN_TYPES.contains(&tag.as_str()) {
            return Err(ProtocolError::UnknownType(tag));
        }
        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Wire form of this message
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Tag name, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Message::NoPrivacyLink { .. } => "NO_PRIVACY_LINK",
            Message::PrivacyLinksFound { .. } => "PRIVACY_LINKS_FOUND",
            Message::PrivacyContentFetched { .. } => "PRIVACY_CONTENT_FETCHED",
            Message::GetPrivacyPolicy { .. } => "GET_PRIVACY_POLICY",
        }
    }

    /// Whether the message only makes sense coming from a tab
    pub fn is_tab_scoped(&self) -> bool {
        !matches!(self, Message::GetPrivacyPolicy { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Received,
    ContentStored,
}

/// Router reply. Every message gets exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ack { status: AckStatus },
    Error { error: String },
    Policy(Option<PolicyRecord>),
}

impl Response {
    pub fn received() -> Self {
        Response::Ack {
            status: AckStatus::Received,
        }
    }

    pub fn error(err: &ProtocolError) -> Self {
        Response::Error {
            error: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_every_known_kind() {
        let messages = [
            json!({ "type": "NO_PRIVACY_LINK", "data": { "url": "https://example.com/" } }),
            json!({
                "type": "PRIVACY_LINKS_FOUND",
                "data": {
                    "url": "https://example.com/",
                    "links": [{ "text": "Privacy Policy", "href": "https://example.com/privacy" }]
                }
            }),
            json!({
                "type": "PRIVACY_CONTENT_FETCHED",
                "data": { "url": "https://example.com/privacy", "content": "We collect..." }
            }),
            json!({ "type": "GET_PRIVACY_POLICY", "domain": "example.com" }),
        ];
        let kinds: Vec<&str> = messages
            .into_iter()
            .map(|m| Message::decode(m).unwrap().kind())
            .collect();
        assert_eq!(kinds, KNOWN_TYPES.to_vec());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = Message::decode(json!({ "type": "OPEN_POPUP" })).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownType("OPEN_POPUP".into()));
        assert_eq!(err.to_string(), "Unknown message type");

        let err = Message::decode(json!({ "data": {} })).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownType(tag) if tag.is_empty()));
    }

    #[test]
    fn malformed_payload_is_distinguished() {
        let err = Message::decode(json!({ "type": "NO_PRIVACY_LINK" })).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn wire_shape_matches_protocol() {
        let message = Message::PrivacyLinksFound {
            data: LinksFound {
                url: "https://example.com/".into(),
                links: vec![LinkSummary {
                    text: "Privacy".into(),
                    href: "https://example.com/p".into(),
                }],
            },
        };
        let value = message.to_value();
        assert_eq!(value["type"], "PRIVACY_LINKS_FOUND");
        assert_eq!(value["data"]["links"][0]["href"], "https://example.com/p");
    }

    #[test]
    fn responses_serialize_like_acks() {
        assert_eq!(serde_json::to_value(Response::received()).unwrap(), json!({ "status": "received" }));
        assert_eq!(serde_json::to_value(Response::Policy(None)).unwrap(), Value::Null);
        assert_eq!(
            serde_json::to_value(Response::error(&ProtocolError::MissingSender)).unwrap(),
            json!({ "error": "No tab ID found" })
        );
    }
}
