// Collaborator seams for the research pipeline.
//
// CandidateSource supplies raw search results, TranscriptSource fetches one
// transcript per URL, InsightExtractor wraps the language model. The real
// clients implement these below; tests use the mocks in `testing`.

use ai_client::{ChatOptions, Completion, Message, OpenAi};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use transcript_client::{TranscriptClient, TranscriptError};
use vidscout_common::{Candidate, Criteria, Segment, Transcript};

// ---------------------------------------------------------------------------
// CandidateSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Raw candidates for a query, honouring the source-side filters in `criteria`.
    async fn candidates(&self, query: &str, criteria: &Criteria) -> Result<Vec<Candidate>>;
}

// ---------------------------------------------------------------------------
// TranscriptSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// `Ok` with a failed transcript when this one item has none (or timed out).
    /// `Err` only when the provider itself can't be reached.
    async fn transcript(&self, url: &str) -> Result<Transcript>;
}

#[async_trait]
impl TranscriptSource for TranscriptClient {
    async fn transcript(&self, url: &str) -> Result<Transcript> {
        let response = match self.fetch(url).await {
            Ok(response) => response,
            Err(TranscriptError::Network(e)) => {
                return Err(anyhow!("transcript provider unreachable: {e}"))
            }
            Err(e) => return Ok(Transcript::failed(url, e.to_string())),
        };

        let text = response.transcript.unwrap_or_default();
        if !response.success || text.trim().is_empty() {
            let reason = response
                .error
                .or(response.detail)
                .unwrap_or_else(|| "no transcript available".to_string());
            return Ok(Transcript::failed(url, reason));
        }

        let segments = response
            .segments
            .into_iter()
            .filter_map(|s| {
                Some(Segment {
                    start: s.start?,
                    end: s.end.unwrap_or_default(),
                    text: s.text?,
                })
            })
            .collect();

        let mut transcript = Transcript::success(url, response.video_id, text, segments);
        if response.word_count > 0 {
            transcript.word_count = response.word_count;
        }
        Ok(transcript)
    }
}

// ---------------------------------------------------------------------------
// InsightExtractor
// ---------------------------------------------------------------------------

#[async_trait]
pub trait InsightExtractor: Send + Sync {
    /// Structured extraction. The returned value is expected to match `schema`,
    /// but callers still validate it.
    async fn extract(&self, system: &str, user: &str, schema: Value) -> Result<Value>;

    /// Free-form completion over a message list.
    async fn converse(&self, messages: &[Message], options: ChatOptions) -> Result<Completion>;
}

#[async_trait]
impl InsightExtractor for OpenAi {
    async fn extract(&self, system: &str, user: &str, schema: Value) -> Result<Value> {
        let completion = self
            .structured_output(system, user, schema, ChatOptions::default())
            .await?;
        Ok(serde_json::from_str(&completion.text)?)
    }

    async fn converse(&self, messages: &[Message], options: ChatOptions) -> Result<Completion> {
        Ok(self.chat(messages, options).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const VIDEO: &str = "https://www.youtube.com/watch?v=abc123";

    /// Read one request, headers and body, so closing the socket can't reset it.
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let length = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Local provider answering every request with `status` and `body`.
    async fn provider(status: &'static str, content_type: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                read_request(&mut stream).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        format!("http://{addr}/get-transcript")
    }

    #[tokio::test]
    async fn unreachable_provider_is_an_error() {
        let client = TranscriptClient::new("http://127.0.0.1:1/get-transcript").unwrap();
        assert!(client.transcript(VIDEO).await.is_err());
    }

    #[tokio::test]
    async fn timeout_is_a_failed_transcript() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // accept and never answer
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let client =
            TranscriptClient::with_timeout(&format!("http://{addr}/get-transcript"), Duration::from_millis(50))
                .unwrap();
        let transcript = client.transcript(VIDEO).await.unwrap();

        assert!(!transcript.is_available());
        assert!(transcript.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn server_error_without_json_is_a_failed_transcript() {
        let url = provider("500 Internal Server Error", "text/plain", "upstream exploded").await;
        let client = TranscriptClient::new(&url).unwrap();

        let transcript = client.transcript(VIDEO).await.unwrap();

        assert_eq!(transcript.url, VIDEO);
        assert!(transcript.text.is_none());
        assert!(transcript.error.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn provider_reported_failure_is_a_failed_transcript() {
        let url = provider(
            "404 Not Found",
            "application/json",
            r#"{"success": false, "error": "No transcripts/subtitles found for this video"}"#,
        )
        .await;
        let client = TranscriptClient::new(&url).unwrap();

        let transcript = client.transcript(VIDEO).await.unwrap();

        assert_eq!(
            transcript.error.as_deref(),
            Some("No transcripts/subtitles found for this video")
        );
    }

    #[tokio::test]
    async fn blank_text_is_a_failed_transcript() {
        let url = provider("200 OK", "application/json", r#"{"success": true, "transcript": "   "}"#).await;
        let client = TranscriptClient::new(&url).unwrap();

        let transcript = client.transcript(VIDEO).await.unwrap();

        assert!(!transcript.is_available());
        assert_eq!(transcript.error.as_deref(), Some("no transcript available"));
    }

    #[tokio::test]
    async fn success_keeps_segments_in_order() {
        let url = provider(
            "200 OK",
            "application/json",
            r#"{"success": true, "transcript": "first line second line", "video_id": "abc123", "word_count": 4,
                "segments": [
                    {"index": 1, "start": "00:00:01", "end": "00:00:04", "text": "first line"},
                    {"index": 2, "start": "00:00:04", "end": "00:00:07", "text": "second line"}
                ]}"#,
        )
        .await;
        let client = TranscriptClient::new(&url).unwrap();

        let transcript = client.transcript(VIDEO).await.unwrap();

        assert!(transcript.is_available());
        assert_eq!(transcript.video_id.as_deref(), Some("abc123"));
        assert_eq!(transcript.word_count, 4);
        let starts: Vec<&str> = transcript.segments.iter().map(|s| s.start.as_str()).collect();
        assert_eq!(starts, vec!["00:00:01", "00:00:04"]);
    }
}
