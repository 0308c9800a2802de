use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::types::AnalyzeRequest;
use crate::{AnalysisError, AnalyzeResponse, FailureKind};

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub connect_timeout: Duration,
    /// Upper bound for a whole analysis call, response body included.
    pub deadline: Duration,
    pub max_response_bytes: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            deadline: Duration::from_secs(30),
            max_response_bytes: 1024 * 1024,
        }
    }
}

/// Client for the remote analysis service.
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, endpoint: &str, content: &str)
        -> Result<AnalyzeResponse, AnalysisError>;
}

/// `{endpoint}/analyze`, ignoring trailing slashes on the endpoint.
pub fn analyze_url(endpoint: &str) -> Result<Url, AnalysisError> {
    let base = endpoint.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{base}/analyze"))
        .map_err(|err| AnalysisError::new(FailureKind::InvalidEndpoint, err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AnalysisError::new(
            FailureKind::InvalidEndpoint,
            format!("unsupported endpoint scheme {other}"),
        )),
    }
}

/// POSTs `{"content": ...}` as JSON and parses the JSON reply.
#[derive(Debug, Clone)]
pub struct ReqwestAnalyzer {
    settings: AnalysisSettings,
}

impl ReqwestAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, AnalysisError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.deadline)
            .build()
            .map_err(|err| AnalysisError::new(FailureKind::Network, err.to_string()))
    }

    fn too_large(&self, actual: u64) -> AnalysisError {
        AnalysisError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_response_bytes,
                actual: Some(actual),
            },
            "analysis response too large",
        )
    }
}

#[async_trait::async_trait]
impl Analyzer for ReqwestAnalyzer {
    async fn analyze(
        &self,
        endpoint: &str,
        content: &str,
    ) -> Result<AnalyzeResponse, AnalysisError> {
        let url = analyze_url(endpoint)?;
        let client = self.build_client()?;
        let body = serde_json::to_vec(&AnalyzeRequest { content })
            .map_err(|err| AnalysisError::new(FailureKind::Internal, err.to_string()))?;

        let response = client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("API error: {}", status.as_u16()),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_response_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_response_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            AnalysisError::new(
                FailureKind::MalformedPayload,
                format!("malformed analysis response: {err}"),
            )
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> AnalysisError {
    if err.is_timeout() {
        return AnalysisError::new(FailureKind::Timeout, err.to_string());
    }
    AnalysisError::new(FailureKind::Network, err.to_string())
}
