pub mod error;

pub use error::{Result, TranscriptError};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-request budget. Subtitle download on the provider side is slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Body returned by the provider on both success and failure status codes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub success: bool,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub segments: Vec<WireSegment>,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// One subtitle cue. Timestamps are `HH:MM:SS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSegment {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

pub struct TranscriptClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl TranscriptClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the provider for the transcript of a video URL.
    ///
    /// A provider-reported failure (`success: false`) is returned as `Ok` so the
    /// caller can treat it as "no transcript for this item". Only transport
    /// problems and unparseable bodies are errors.
    pub async fn fetch(&self, url: &str) -> Result<TranscriptResponse> {
        let body = serde_json::json!({ "url": url });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.classify(e))?;

        match serde_json::from_str::<TranscriptResponse>(&text) {
            Ok(parsed) => {
                tracing::debug!(
                    url,
                    status = status.as_u16(),
                    success = parsed.success,
                    segments = parsed.segments.len(),
                    "Transcript provider responded"
                );
                Ok(parsed)
            }
            Err(_) if !status.is_success() => Err(TranscriptError::Api {
                status: status.as_u16(),
                message: text,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn classify(&self, err: reqwest::Error) -> TranscriptError {
        if err.is_timeout() {
            TranscriptError::Timeout(self.timeout.as_secs())
        } else {
            err.into()
        }
    }
}
