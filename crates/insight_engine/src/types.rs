use std::fmt;

use serde::{Deserialize, Serialize};

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    AnalysisCompleted {
        request_id: RequestId,
        result: Result<AnalyzeResponse, AnalysisError>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnalyzeRequest<'a> {
    pub content: &'a str,
}

/// Body returned by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub insights: Option<WireInsights>,
    #[serde(default, alias = "expertRole")]
    pub expert_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireInsights {
    List(Vec<WireInsight>),
    Rendered(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireInsight {
    pub content: String,
    pub rationale: String,
    pub impact: WireImpact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum WireImpact {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AnalysisError {
    pub kind: FailureKind,
    pub message: String,
}

impl AnalysisError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidEndpoint,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    MalformedPayload,
    Network,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidEndpoint => write!(f, "invalid endpoint"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::MalformedPayload => write!(f, "malformed payload"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Internal => write!(f, "internal error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_accepts_list_string_or_missing_insights() {
        let list: AnalyzeResponse = serde_json::from_str(
            r#"{"insights":[{"content":"c","rationale":"r","impact":"High"}],"expert_role":"Analyst","processing_time":0.4}"#,
        )
        .unwrap();
        assert_eq!(
            list.insights,
            Some(WireInsights::List(vec![WireInsight {
                content: "c".to_string(),
                rationale: "r".to_string(),
                impact: WireImpact::High,
            }]))
        );
        assert_eq!(list.expert_role.as_deref(), Some("Analyst"));

        let rendered: AnalyzeResponse =
            serde_json::from_str(r#"{"insights":"<p>ok</p>","expertRole":"Editor"}"#).unwrap();
        assert_eq!(rendered.insights, Some(WireInsights::Rendered("<p>ok</p>".to_string())));
        assert_eq!(rendered.expert_role.as_deref(), Some("Editor"));

        let missing: AnalyzeResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.insights, None);
    }

    #[test]
    fn unknown_impact_is_malformed() {
        let parsed = serde_json::from_str::<AnalyzeResponse>(
            r#"{"insights":[{"content":"c","rationale":"r","impact":"Huge"}]}"#,
        );
        assert!(parsed.is_err());
    }
}
