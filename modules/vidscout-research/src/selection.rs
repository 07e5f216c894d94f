use anyhow::Result;
use tracing::{info, warn};
use vidscout_common::{Candidate, Criteria, ScoredCandidate, Transcript};

use crate::infra::sequence::try_collect_in_order;
use crate::scoring::score_all;
use crate::traits::TranscriptSource;

/// Number of items carried forward to extraction.
pub const TOP_K: usize = 5;

/// Outcome of ranking plus transcript-gated selection.
#[derive(Debug, Clone)]
pub struct Selection {
    /// `min(TOP_K, candidates)` items. Never shorter because of missing transcripts.
    pub top: Vec<ScoredCandidate>,
    /// Positionally aligned with `top`.
    pub transcripts: Vec<Transcript>,
    /// Every candidate, best first.
    pub ranking: Vec<ScoredCandidate>,
}

impl Selection {
    pub fn transcripts_obtained(&self) -> usize {
        self.transcripts.iter().filter(|t| t.is_available()).count()
    }
}

/// Sort best first. Equal scores keep their input order.
pub fn rank(mut scored: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    // sort_by is stable
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Score, rank, take the top items and fetch their transcripts in series.
///
/// With `require_transcript`, each top slot whose transcript is missing is
/// backfilled from the rest of the ranking. One cursor walks the remainder for
/// all slots, so a candidate rejected for one slot is never tried again. A slot
/// that can't be filled keeps its original candidate and failed transcript.
///
/// A transcript source that can't be reached at all fails the whole call.
pub async fn select(
    candidates: Vec<Candidate>,
    query: &str,
    criteria: &Criteria,
    source: &dyn TranscriptSource,
) -> Result<Selection> {
    let ranking = rank(score_all(candidates, query, criteria));
    let mut top: Vec<ScoredCandidate> = ranking.iter().take(TOP_K).cloned().collect();

    info!(
        ranked = ranking.len(),
        top = top.len(),
        best_score = top.first().map(|c| c.score).unwrap_or(0.0),
        "Ranked candidates"
    );

    let mut transcripts = try_collect_in_order(top.iter(), |_, candidate| async move {
        fetch_logged(source, candidate).await
    })
    .await?;

    if criteria.require_transcript {
        let mut cursor = top.len();
        for slot in 0..top.len() {
            if transcripts[slot].is_available() {
                continue;
            }

            let mut filled = false;
            while let Some(replacement) = ranking.get(cursor) {
                cursor += 1;
                let transcript = fetch_logged(source, replacement).await?;
                if transcript.is_available() {
                    info!(
                        slot,
                        replaced = %top[slot].url,
                        with = %replacement.url,
                        "Replaced top item lacking a transcript"
                    );
                    top[slot] = replacement.clone();
                    transcripts[slot] = transcript;
                    filled = true;
                    break;
                }
            }

            if !filled {
                warn!(slot, url = %top[slot].url, "No replacement with a transcript left in ranking");
            }
        }
    }

    let selection = Selection {
        top,
        transcripts,
        ranking,
    };
    info!(
        transcripts_obtained = selection.transcripts_obtained(),
        wanted = selection.top.len(),
        "Transcript selection complete"
    );
    Ok(selection)
}

async fn fetch_logged(source: &dyn TranscriptSource, candidate: &ScoredCandidate) -> Result<Transcript> {
    let transcript = source.transcript(&candidate.url).await?;
    if let Some(error) = &transcript.error {
        warn!(url = %candidate.url, error = %error, "Transcript unavailable");
    }
    Ok(transcript)
}
