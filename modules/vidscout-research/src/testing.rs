// Test mocks for the research pipeline.
//
// One mock per collaborator seam:
// - MockCandidateSource (CandidateSource): fixed candidate list, or a failure
// - MockTranscriptSource (TranscriptSource): URL→transcript map, records call order
// - MockExtractor (InsightExtractor): canned responses per call kind, records calls

use std::collections::HashMap;
use std::sync::Mutex;

use ai_client::{ChatOptions, Completion, Message};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use vidscout_common::{Candidate, Criteria, Segment, Transcript};

use crate::insights::ITEM_SYSTEM_PROMPT;
use crate::synthesis::SYNTHESIS_SYSTEM_PROMPT;
use crate::traits::{CandidateSource, InsightExtractor, TranscriptSource};

// ---------------------------------------------------------------------------
// MockCandidateSource
// ---------------------------------------------------------------------------

pub struct MockCandidateSource {
    candidates: Vec<Candidate>,
    failure: Option<String>,
}

impl MockCandidateSource {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            failure: None,
        }
    }

    /// Every call fails as if the backend were down.
    pub fn failing(message: &str) -> Self {
        Self {
            candidates: Vec::new(),
            failure: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl CandidateSource for MockCandidateSource {
    async fn candidates(&self, _query: &str, _criteria: &Criteria) -> Result<Vec<Candidate>> {
        match &self.failure {
            Some(message) => bail!("{message}"),
            None => Ok(self.candidates.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockTranscriptSource
// ---------------------------------------------------------------------------

/// Unregistered URLs get a failed transcript.
#[derive(Default)]
pub struct MockTranscriptSource {
    transcripts: HashMap<String, Transcript>,
    unreachable: bool,
    calls: Mutex<Vec<String>>,
}

impl MockTranscriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, url: &str, text: &str) -> Self {
        self.with_transcript(Transcript::success(url, None, text, Vec::new()))
    }

    pub fn with_segments(self, url: &str, segments: &[(&str, &str)]) -> Self {
        let segments: Vec<Segment> = segments
            .iter()
            .map(|(start, text)| Segment {
                start: start.to_string(),
                end: String::new(),
                text: text.to_string(),
            })
            .collect();
        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.with_transcript(Transcript::success(url, None, text, segments))
    }

    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcripts.insert(transcript.url.clone(), transcript);
        self
    }

    /// Every call fails as if the provider could not be reached.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// URLs requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptSource for MockTranscriptSource {
    async fn transcript(&self, url: &str) -> Result<Transcript> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.unreachable {
            bail!("transcript provider unreachable");
        }
        Ok(self
            .transcripts
            .get(url)
            .cloned()
            .unwrap_or_else(|| Transcript::failed(url, "no transcript available")))
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Item,
    Synthesis,
    Other,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub user: String,
}

/// Per-item calls are answered by the first registered needle found in the
/// user prompt. Anything without a canned response fails.
#[derive(Default)]
pub struct MockExtractor {
    items: Vec<(String, Value)>,
    synthesis: Option<Value>,
    chat: Option<(String, u32)>,
    calls: Mutex<Vec<RecordedCall>>,
    chat_messages: Mutex<Vec<Vec<Message>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_item(mut self, needle: &str, response: Value) -> Self {
        self.items.push((needle.to_string(), response));
        self
    }

    pub fn on_synthesis(mut self, response: Value) -> Self {
        self.synthesis = Some(response);
        self
    }

    pub fn on_chat(mut self, answer: &str, tokens_used: u32) -> Self {
        self.chat = Some((answer.to_string(), tokens_used));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> usize {
        self.calls().iter().filter(|c| c.kind == kind).count()
    }

    pub fn chat_messages(&self) -> Vec<Vec<Message>> {
        self.chat_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl InsightExtractor for MockExtractor {
    async fn extract(&self, system: &str, user: &str, _schema: Value) -> Result<Value> {
        let kind = if system == ITEM_SYSTEM_PROMPT {
            CallKind::Item
        } else if system == SYNTHESIS_SYSTEM_PROMPT {
            CallKind::Synthesis
        } else {
            CallKind::Other
        };
        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            user: user.to_string(),
        });

        match kind {
            CallKind::Item => self
                .items
                .iter()
                .find(|(needle, _)| user.contains(needle.as_str()))
                .map(|(_, response)| response.clone())
                .ok_or_else(|| anyhow!("no canned item response")),
            CallKind::Synthesis => self
                .synthesis
                .clone()
                .ok_or_else(|| anyhow!("no canned synthesis response")),
            CallKind::Other => bail!("unexpected extraction call"),
        }
    }

    async fn converse(&self, messages: &[Message], _options: ChatOptions) -> Result<Completion> {
        self.chat_messages.lock().unwrap().push(messages.to_vec());
        let (text, tokens_used) = self
            .chat
            .clone()
            .ok_or_else(|| anyhow!("no canned chat response"))?;
        Ok(Completion { text, tokens_used })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A long-form candidate that passes every filter, with the given view count.
pub fn candidate(url: &str, title: &str, views: u64) -> Candidate {
    let mut c = Candidate::new(url, title);
    c.channel = "Test Channel".to_string();
    c.views = views;
    c.like_count = views / 40;
    c.duration_sec = 900;
    c.published_text = "3 months ago".to_string();
    c
}
