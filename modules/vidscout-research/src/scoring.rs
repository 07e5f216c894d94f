use vidscout_common::{Candidate, Criteria, ScoredCandidate};

use crate::parsers::{parse_relative_age, Age};

/// Sub-score weights (sum to 100).
pub const WEIGHT_RELEVANCE: f64 = 40.0;
pub const WEIGHT_POPULARITY: f64 = 20.0;
pub const WEIGHT_FRESHNESS: f64 = 15.0;
pub const WEIGHT_DURATION_FIT: f64 = 15.0;
pub const WEIGHT_QUALITY: f64 = 10.0;

pub const PENALTY_SHORT: f64 = -20.0;
pub const PENALTY_LIVE: f64 = -20.0;
/// Applied to anything under a minute.
pub const PENALTY_TOO_SHORT: f64 = -10.0;

/// Freshness when the upload age can't be read.
pub const NEUTRAL_FRESHNESS: f64 = 0.5;

/// Normalised sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub relevance: f64,
    pub popularity: f64,
    pub freshness: f64,
    pub duration_fit: f64,
    pub quality: f64,
    /// Sum of penalties, zero or negative.
    pub penalty: f64,
}

impl ScoreBreakdown {
    pub fn of(candidate: &Candidate, query: &str, criteria: &Criteria) -> Self {
        let mut penalty = 0.0;
        if candidate.is_short {
            penalty += PENALTY_SHORT;
        }
        if candidate.is_live {
            penalty += PENALTY_LIVE;
        }
        if candidate.duration_sec < 60 {
            penalty += PENALTY_TOO_SHORT;
        }

        Self {
            relevance: relevance(
                &candidate.title,
                candidate.description.as_deref().unwrap_or(""),
                query,
            ),
            popularity: popularity(candidate.views),
            freshness: freshness(parse_relative_age(&candidate.published_text)),
            duration_fit: duration_fit(
                candidate.duration_sec,
                criteria.min_duration_sec,
                criteria.max_duration_sec,
            ),
            quality: quality(candidate.like_count, candidate.views),
            penalty,
        }
    }

    /// Weighted total plus penalties, clamped to [0, 100].
    pub fn total(&self) -> f64 {
        let weighted = self.relevance * WEIGHT_RELEVANCE
            + self.popularity * WEIGHT_POPULARITY
            + self.freshness * WEIGHT_FRESHNESS
            + self.duration_fit * WEIGHT_DURATION_FIT
            + self.quality * WEIGHT_QUALITY;
        (weighted + self.penalty).clamp(0.0, 100.0)
    }
}

/// Deterministic 0–100 score for one candidate.
pub fn score(candidate: &Candidate, query: &str, criteria: &Criteria) -> f64 {
    ScoreBreakdown::of(candidate, query, criteria).total()
}

pub fn score_all(candidates: Vec<Candidate>, query: &str, criteria: &Criteria) -> Vec<ScoredCandidate> {
    candidates
        .into_iter()
        .map(|candidate| {
            let score = score(&candidate, query, criteria);
            ScoredCandidate { candidate, score }
        })
        .collect()
}

/// Full-phrase title match is 1.0; otherwise the share of query words longer
/// than two characters that partially match a title word. A description
/// containing the phrase adds 0.3.
pub fn relevance(title: &str, description: &str, query: &str) -> f64 {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return 0.0;
    }
    let title = title.to_lowercase();

    let mut relevance = if title.contains(&query) {
        1.0
    } else {
        let query_words: Vec<&str> = query.split_whitespace().filter(|w| w.chars().count() > 2).collect();
        let title_words: Vec<&str> = title.split_whitespace().collect();
        let matched = query_words
            .iter()
            .filter(|q| title_words.iter().any(|t| t.contains(**q) || q.contains(*t)))
            .count();
        if query_words.is_empty() {
            0.0
        } else {
            matched as f64 / query_words.len() as f64
        }
    };

    if description.to_lowercase().contains(&query) {
        relevance = (relevance + 0.3).min(1.0);
    }
    relevance
}

/// `log10(views + 1) / 6`, saturating around a million views.
pub fn popularity(views: u64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    ((views as f64 + 1.0).log10() / 6.0).min(1.0)
}

pub fn freshness(age: Age) -> f64 {
    match age {
        Age::Unknown => NEUTRAL_FRESHNESS,
        Age::Years(y) if y <= 1.0 => 1.0,
        Age::Years(y) if y <= 3.0 => 0.7,
        Age::Years(y) if y <= 5.0 => 0.4,
        Age::Years(_) => 0.2,
    }
}

/// 1.0 inside `[min, max]`, 0.5 inside `[0.8·min, 1.2·max]`, else 0.
/// An unknown (zero) duration never fits.
pub fn duration_fit(duration_sec: u64, min_sec: u64, max_sec: u64) -> f64 {
    if duration_sec == 0 {
        return 0.0;
    }
    if (min_sec..=max_sec).contains(&duration_sec) {
        return 1.0;
    }
    let d = duration_sec as f64;
    if d >= min_sec as f64 * 0.8 && d <= max_sec as f64 * 1.2 {
        0.5
    } else {
        0.0
    }
}

/// Like ratio per thousand views, scaled so 50 likes per 1000 views is 1.0.
pub fn quality(likes: u64, views: u64) -> f64 {
    if views == 0 || likes == 0 {
        return 0.0;
    }
    ((likes as f64 / views as f64) * 1000.0 / 50.0).min(1.0)
}
