use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Metadata of an actor run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Input for the streamers/youtube-scraper actor in search mode.
#[derive(Debug, Clone, Serialize)]
pub struct YouTubeSearchInput {
    #[serde(rename = "searchQueries")]
    pub search_queries: Vec<String>,
    #[serde(rename = "maxResults")]
    pub max_results: u32,
    #[serde(rename = "maxResultsShorts")]
    pub max_results_shorts: u32,
    #[serde(rename = "maxResultStreams")]
    pub max_result_streams: u32,
}

/// A single video row from the YouTube scraper dataset.
///
/// The actor's output drifts between versions, so everything but the URL is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YouTubeVideo {
    pub url: Option<String>,
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "channelName")]
    pub channel_name: Option<String>,
    #[serde(rename = "viewCount")]
    pub view_count: Option<u64>,
    pub likes: Option<u64>,
    /// `HH:MM:SS` or `MM:SS`.
    pub duration: Option<String>,
    /// Upload date, usually ISO 8601.
    pub date: Option<String>,
    /// Description text.
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub video_type: Option<String>,
    #[serde(rename = "isLive", default)]
    pub is_live: Option<bool>,
}

impl YouTubeVideo {
    pub fn is_short(&self) -> bool {
        self.video_type.as_deref() == Some("shorts")
            || self.url.as_deref().is_some_and(|u| u.contains("/shorts/"))
    }

    pub fn is_stream(&self) -> bool {
        self.is_live.unwrap_or(false) || self.video_type.as_deref() == Some("stream")
    }

    /// Render the upload date the way YouTube search pages do ("3 months ago").
    /// Falls back to the raw value when it is not a parseable timestamp.
    pub fn published_text(&self, now: DateTime<Utc>) -> String {
        let Some(raw) = self.date.as_deref() else {
            return String::new();
        };
        let Ok(published) = DateTime::parse_from_rfc3339(raw) else {
            return raw.to_string();
        };

        let days = (now - published.with_timezone(&Utc)).num_days().max(0);
        let (count, unit) = match days {
            0 => return "today".to_string(),
            1..=6 => (days, "day"),
            7..=29 => (days / 7, "week"),
            30..=364 => (days / 30, "month"),
            _ => (days / 365, "year"),
        };
        let plural = if count == 1 { "" } else { "s" };
        format!("{count} {unit}{plural} ago")
    }
}
