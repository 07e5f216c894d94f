use serde::{Deserialize, Serialize};

use crate::insights::Analysis;

// --- Candidates ---

/// A video returned by the candidate source, before ranking. Identity is `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub views: u64,
    /// Relative upload age as shown on search pages, e.g. "3 months ago".
    #[serde(default, alias = "published_at_text")]
    pub published_text: String,
    #[serde(default)]
    pub duration_sec: u64,
    #[serde(default, alias = "is_shorts")]
    pub is_short: bool,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl Candidate {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            channel: String::new(),
            views: 0,
            published_text: String::new(),
            duration_sec: 0,
            is_short: false,
            is_live: false,
            like_count: 0,
            description: None,
            video_id: None,
        }
    }
}

/// A candidate plus its 0–100 score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    #[serde(default)]
    pub score: f64,
}

impl std::ops::Deref for ScoredCandidate {
    type Target = Candidate;

    fn deref(&self) -> &Candidate {
        &self.candidate
    }
}

// --- Criteria ---

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_MIN_DURATION_SEC: u64 = 360;
pub const DEFAULT_MAX_DURATION_SEC: u64 = 2400;
pub const DEFAULT_RECENCY_YEARS: u32 = 3;
pub const DEFAULT_PAGES_TO_CRAWL: u32 = 2;

/// Filter and ranking preferences for one research request.
///
/// Callers are responsible for `min_duration_sec <= max_duration_sec`; nothing
/// here enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub language: String,
    pub min_duration_sec: u64,
    pub max_duration_sec: u64,
    pub recency_years: u32,
    pub exclude_shorts: bool,
    pub require_transcript: bool,
    pub pages_to_crawl: u32,
}

impl Default for Criteria {
    fn default() -> Self {
        CriteriaInput::default().resolve(DEFAULT_PAGES_TO_CRAWL)
    }
}

/// Partial criteria as sent by callers. Missing fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaInput {
    pub language: Option<String>,
    pub min_duration_sec: Option<u64>,
    pub max_duration_sec: Option<u64>,
    pub recency_years: Option<u32>,
    pub exclude_shorts: Option<bool>,
    pub require_transcript: Option<bool>,
    pub pages_to_crawl: Option<u32>,
}

impl CriteriaInput {
    pub fn resolve(self, default_pages: u32) -> Criteria {
        Criteria {
            language: self
                .language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            min_duration_sec: self.min_duration_sec.unwrap_or(DEFAULT_MIN_DURATION_SEC),
            max_duration_sec: self.max_duration_sec.unwrap_or(DEFAULT_MAX_DURATION_SEC),
            recency_years: self.recency_years.unwrap_or(DEFAULT_RECENCY_YEARS),
            exclude_shorts: self.exclude_shorts.unwrap_or(true),
            require_transcript: self.require_transcript.unwrap_or(true),
            pages_to_crawl: self.pages_to_crawl.unwrap_or(default_pages),
        }
    }
}

// --- Transcripts ---

/// One timestamped subtitle cue. Timestamps are `HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: String,
    pub end: String,
    pub text: String,
}

/// Outcome of a transcript fetch. Exactly one of `text` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub url: String,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Chronological; provider order is preserved.
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Transcript {
    pub fn success(
        url: impl Into<String>,
        video_id: Option<String>,
        text: impl Into<String>,
        segments: Vec<Segment>,
    ) -> Self {
        let text = text.into();
        let word_count = text.split_whitespace().count() as u32;
        Self {
            url: url.into(),
            video_id,
            text: Some(text),
            segments,
            word_count,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            video_id: None,
            text: None,
            segments: Vec::new(),
            word_count: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

// --- Aggregate ---

/// Everything one research request produced. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub query: String,
    pub criteria: Criteria,
    /// Best candidates by score, bounded for reference display.
    pub candidates: Vec<ScoredCandidate>,
    pub top5: Vec<ScoredCandidate>,
    /// Positionally aligned with `top5`.
    pub transcripts: Vec<Transcript>,
    pub transcripts_obtained: usize,
    pub analysis: Analysis,
}

// --- Chat ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One prior turn of the caller-held conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// An item the answer refers to. `index` is 0-based into the item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub index: usize,
    pub title: String,
    pub url: String,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    #[serde(rename = "tokensUsed")]
    pub tokens_used: u32,
}
