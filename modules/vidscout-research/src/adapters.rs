use anyhow::Result;
use apify_client::{ApifyClient, YouTubeVideo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use vidscout_common::{Candidate, Criteria};

use crate::parsers::{parse_duration, parse_relative_age};
use crate::traits::CandidateSource;

/// Search results requested per "page" of the original crawl.
pub const RESULTS_PER_PAGE: u32 = 20;

/// Candidate source backed by the Apify YouTube search scraper.
pub struct ApifyCandidateSource {
    client: ApifyClient,
}

impl ApifyCandidateSource {
    pub fn new(client: ApifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandidateSource for ApifyCandidateSource {
    async fn candidates(&self, query: &str, criteria: &Criteria) -> Result<Vec<Candidate>> {
        let max_results = criteria.pages_to_crawl.max(1) * RESULTS_PER_PAGE;
        let videos = self
            .client
            .search_youtube(query, max_results, !criteria.exclude_shorts)
            .await?;

        let now = Utc::now();
        let fetched = videos.len();
        let candidates: Vec<Candidate> = videos
            .into_iter()
            .filter_map(|v| video_to_candidate(v, now))
            .filter(|c| within_recency(c, criteria.recency_years))
            .collect();

        info!(query, fetched, kept = candidates.len(), "Converted search results to candidates");
        Ok(candidates)
    }
}

/// Map one dataset row to a candidate. Rows without a URL or title are dropped.
pub fn video_to_candidate(video: YouTubeVideo, now: DateTime<Utc>) -> Option<Candidate> {
    let is_short = video.is_short();
    let is_live = video.is_stream();
    let published_text = video.published_text(now);

    let url = video.url.filter(|u| !u.trim().is_empty())?;
    let title = video.title.filter(|t| !t.trim().is_empty())?;

    let mut candidate = Candidate::new(url, title);
    candidate.channel = video.channel_name.unwrap_or_default();
    candidate.views = video.view_count.unwrap_or(0);
    candidate.like_count = video.likes.unwrap_or(0);
    candidate.duration_sec = video.duration.as_deref().map(parse_duration).unwrap_or(0);
    candidate.published_text = published_text;
    candidate.is_short = is_short;
    candidate.is_live = is_live;
    candidate.description = video.text.filter(|t| !t.is_empty());
    candidate.video_id = video.id;
    Some(candidate)
}

/// Unknown ages pass; known ages must be within `recency_years`.
pub fn within_recency(candidate: &Candidate, recency_years: u32) -> bool {
    parse_relative_age(&candidate.published_text)
        .years()
        .is_none_or(|years| years <= recency_years as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn row() -> YouTubeVideo {
        YouTubeVideo {
            url: Some("https://www.youtube.com/watch?v=abc123".into()),
            id: Some("abc123".into()),
            title: Some("Covered Calls for Beginners".into()),
            channel_name: Some("Options Desk".into()),
            view_count: Some(120_000),
            likes: Some(3_400),
            duration: Some("14:05".into()),
            date: Some("2025-03-01T00:00:00Z".into()),
            text: Some("Everything about covered calls".into()),
            ..Default::default()
        }
    }

    #[test]
    fn converts_dataset_row() {
        let c = video_to_candidate(row(), now()).unwrap();
        assert_eq!(c.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(c.channel, "Options Desk");
        assert_eq!(c.views, 120_000);
        assert_eq!(c.like_count, 3_400);
        assert_eq!(c.duration_sec, 845);
        assert_eq!(c.published_text, "3 months ago");
        assert_eq!(c.video_id.as_deref(), Some("abc123"));
        assert!(!c.is_short);
    }

    #[test]
    fn rows_without_url_or_title_are_skipped() {
        let mut no_url = row();
        no_url.url = None;
        assert!(video_to_candidate(no_url, now()).is_none());

        let mut blank_title = row();
        blank_title.title = Some("  ".into());
        assert!(video_to_candidate(blank_title, now()).is_none());
    }

    #[test]
    fn shorts_are_flagged() {
        let mut short = row();
        short.url = Some("https://www.youtube.com/shorts/xyz".into());
        assert!(video_to_candidate(short, now()).unwrap().is_short);
    }

    #[test]
    fn recency_filter_keeps_unknown_ages() {
        let mut c = Candidate::new("u", "t");
        c.published_text = "5 years ago".into();
        assert!(!within_recency(&c, 3));
        c.published_text = "2 years ago".into();
        assert!(within_recency(&c, 3));
        c.published_text = "sometime".into();
        assert!(within_recency(&c, 3));
    }
}
