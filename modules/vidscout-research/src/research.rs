use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};
use vidscout_common::{
    Analysis, Candidate, Criteria, CriteriaInput, PerItemInsights, ResearchError, ResearchResult,
    ScoredCandidate, Transcript, DEFAULT_PAGES_TO_CRAWL,
};

use crate::insights::{extract_all, transcribed, EXTRACTOR_NOT_CONFIGURED};
use crate::selection::select;
use crate::synthesis::{flatten_themes, synthesize};
use crate::traits::{CandidateSource, InsightExtractor, TranscriptSource};

/// Ranked candidates kept on the result for reference.
pub const CANDIDATE_WINDOW: usize = 30;

const NO_TRANSCRIPTS: &str = "No valid transcripts to analyze";

/// Runs one research request end to end: candidates, ranking, transcript
/// selection, per-item extraction and cross-item synthesis.
///
/// Holds only read-only collaborators, so one instance serves every request.
pub struct Researcher {
    candidates: Option<Arc<dyn CandidateSource>>,
    transcripts: Arc<dyn TranscriptSource>,
    extractor: Option<Arc<dyn InsightExtractor>>,
    default_pages: u32,
}

impl Researcher {
    pub fn new(
        candidates: Option<Arc<dyn CandidateSource>>,
        transcripts: Arc<dyn TranscriptSource>,
        extractor: Option<Arc<dyn InsightExtractor>>,
    ) -> Self {
        Self {
            candidates,
            transcripts,
            extractor,
            default_pages: DEFAULT_PAGES_TO_CRAWL,
        }
    }

    pub fn with_default_pages(mut self, pages: u32) -> Self {
        self.default_pages = pages;
        self
    }

    pub fn extractor(&self) -> Option<&dyn InsightExtractor> {
        self.extractor.as_deref()
    }

    pub fn default_pages(&self) -> u32 {
        self.default_pages
    }

    pub async fn research(
        &self,
        query: &str,
        criteria: CriteriaInput,
    ) -> Result<ResearchResult, ResearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResearchError::Validation("query is required".into()));
        }
        let criteria = criteria.resolve(self.default_pages);
        info!(query, ?criteria, "Starting research");

        let source = self
            .candidates
            .as_deref()
            .ok_or_else(|| ResearchError::SourceUnavailable("candidate source not configured".into()))?;
        let raw = source
            .candidates(query, &criteria)
            .await
            .map_err(|e| ResearchError::SourceUnavailable(format!("{e:#}")))?;
        let fetched = raw.len();

        let candidates = intake(raw, &criteria);
        info!(fetched, kept = candidates.len(), "Candidate intake complete");
        if candidates.is_empty() {
            return Err(ResearchError::NoCandidates(query.to_string()));
        }

        let selection = select(candidates, query, &criteria, self.transcripts.as_ref())
            .await
            .map_err(|e| ResearchError::SourceUnavailable(format!("{e:#}")))?;

        let transcripts_obtained = selection.transcripts_obtained();
        if transcripts_obtained < selection.top.len() {
            warn!(
                transcripts_obtained,
                wanted = selection.top.len(),
                "Fewer transcripts than top items"
            );
        }

        let analysis = self.analyze(&selection.top, &selection.transcripts).await;

        let mut ranking = selection.ranking;
        ranking.truncate(CANDIDATE_WINDOW);

        Ok(ResearchResult {
            query: query.to_string(),
            criteria,
            candidates: ranking,
            top5: selection.top,
            transcripts: selection.transcripts,
            transcripts_obtained,
            analysis,
        })
    }

    /// Per-item extraction then synthesis. Never fails: every problem here
    /// degrades to empty insight sections with `error` set.
    async fn analyze(&self, top: &[ScoredCandidate], transcripts: &[Transcript]) -> Analysis {
        let items = transcribed(top, transcripts);
        if items.is_empty() {
            warn!("{NO_TRANSCRIPTS}");
            return Analysis {
                error: Some(NO_TRANSCRIPTS.to_string()),
                ..Default::default()
            };
        }
        let labels: Vec<String> = items.iter().map(|(c, _)| c.title.clone()).collect();

        let per_item = extract_all(self.extractor(), top, transcripts).await;

        let Some(extractor) = self.extractor() else {
            return Analysis {
                per_item,
                error: Some(EXTRACTOR_NOT_CONFIGURED.to_string()),
                ..Default::default()
            };
        };

        match synthesize(extractor, &per_item, &labels).await {
            Ok(synthesis) => Analysis {
                consensus_points: flatten_themes(&synthesis.themes),
                themes: synthesis.themes,
                quantitative_consensus: synthesis.quantitative_consensus,
                contradictions: synthesis.contradictions,
                error: all_failed(&per_item).then(|| "Insight extraction failed for every item".to_string()),
                per_item,
            },
            Err(e) => {
                warn!(error = %e, "Synthesis failed, returning empty insights");
                Analysis {
                    per_item,
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        }
    }
}

fn all_failed(per_item: &[PerItemInsights]) -> bool {
    !per_item.is_empty() && per_item.iter().all(PerItemInsights::is_failed)
}

/// Drop repeated URLs (first wins) and, when excluded, shorts.
pub fn intake(candidates: Vec<Candidate>, criteria: &Criteria) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| !(criteria.exclude_shorts && c.is_short))
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}
