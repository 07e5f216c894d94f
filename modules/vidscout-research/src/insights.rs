use ai_client::{truncate_chars, StructuredOutput};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};
use vidscout_common::{
    PerItemInsights, Pitfall, QuantitativePoint, ResearchError, ScoredCandidate, StrategicPoint,
    TacticalPoint, Transcript,
};

use crate::infra::sequence::collect_in_order;
use crate::traits::InsightExtractor;

/// Characters of transcript text sent per item. The rest is never seen.
pub const TRANSCRIPT_CHAR_BUDGET: usize = 15_000;

pub const EXTRACTOR_NOT_CONFIGURED: &str = "language model not configured";

pub const ITEM_SYSTEM_PROMPT: &str = r#"You extract layered insights from a single video transcript.

Return three tiers:
1. strategic: high-level principles, why something matters. Rate importance "high" or "medium".
2. tactical: concrete how-to steps with the exact parameters mentioned.
3. pitfalls: common mistakes and what happens if they are ignored.

Also return quantitative: every specific number the speaker gives (percentages, amounts, time periods, ratios, counts, ranges), with what it measures, the literal value, what it applies to and the exact quote.

Also return terms: key terms or jargon defined in the video.

Every strategic, tactical and pitfall entry carries a short evidence quote from the transcript. Aim for 3-5 entries per tier and prefer teachable statements with exact numbers."#;

/// Model output for one item.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ItemExtraction {
    #[serde(default)]
    pub strategic: Vec<StrategicPoint>,
    #[serde(default)]
    pub tactical: Vec<TacticalPoint>,
    #[serde(default)]
    pub pitfalls: Vec<Pitfall>,
    #[serde(default)]
    pub quantitative: Vec<QuantitativePoint>,
    /// Key terms or definitions.
    #[serde(default)]
    pub terms: Vec<String>,
}

impl ItemExtraction {
    fn into_insights(self, url: &str) -> PerItemInsights {
        PerItemInsights {
            url: url.to_string(),
            strategic: self.strategic,
            tactical: self.tactical,
            pitfalls: self.pitfalls,
            quantitative: self.quantitative,
            terms: self.terms,
            error: None,
        }
    }
}

/// Top items that actually have transcript text, in top order.
pub fn transcribed<'a>(
    top: &'a [ScoredCandidate],
    transcripts: &'a [Transcript],
) -> Vec<(&'a ScoredCandidate, &'a Transcript)> {
    top.iter()
        .zip(transcripts)
        .filter(|(_, t)| t.is_available())
        .collect()
}

pub fn item_prompt(title: &str, text: &str) -> String {
    format!(
        "Extract key points from this transcript.\n\nVideo title: {title}\n\n---\n\n{}",
        truncate_chars(text, TRANSCRIPT_CHAR_BUDGET)
    )
}

/// One extraction call for one transcript.
pub async fn extract_item(
    extractor: &dyn InsightExtractor,
    candidate: &ScoredCandidate,
    transcript: &Transcript,
) -> Result<PerItemInsights, ResearchError> {
    let text = transcript.text.as_deref().unwrap_or_default();
    let value = extractor
        .extract(
            ITEM_SYSTEM_PROMPT,
            &item_prompt(&candidate.title, text),
            ItemExtraction::openai_schema(),
        )
        .await
        .map_err(|e| ResearchError::Extraction(format!("{e:#}")))?;

    let extraction: ItemExtraction = serde_json::from_value(value)
        .map_err(|e| ResearchError::Extraction(format!("malformed item extraction: {e}")))?;

    Ok(extraction.into_insights(&candidate.url))
}

/// Extract every transcribed top item in series.
///
/// Always yields one record per transcribed item. Failures become empty records
/// carrying the error, and a missing extractor fails every record the same way.
pub async fn extract_all(
    extractor: Option<&dyn InsightExtractor>,
    top: &[ScoredCandidate],
    transcripts: &[Transcript],
) -> Vec<PerItemInsights> {
    let items = transcribed(top, transcripts);

    let Some(extractor) = extractor else {
        warn!(items = items.len(), "Skipping insight extraction: {EXTRACTOR_NOT_CONFIGURED}");
        return items
            .into_iter()
            .map(|(c, _)| PerItemInsights::failed(&c.url, EXTRACTOR_NOT_CONFIGURED))
            .collect();
    };

    collect_in_order(items, |index, (candidate, transcript)| async move {
        match extract_item(extractor, candidate, transcript).await {
            Ok(insights) => {
                info!(
                    item = index + 1,
                    strategic = insights.strategic.len(),
                    tactical = insights.tactical.len(),
                    pitfalls = insights.pitfalls.len(),
                    metrics = insights.quantitative.len(),
                    "Extracted item insights"
                );
                insights
            }
            Err(e) => {
                warn!(item = index + 1, url = %candidate.url, error = %e, "Item extraction failed");
                PerItemInsights::failed(&candidate.url, e.to_string())
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExtractor;
    use serde_json::json;
    use vidscout_common::Candidate;

    fn top(n: usize) -> Vec<ScoredCandidate> {
        (0..n)
            .map(|i| ScoredCandidate {
                candidate: Candidate::new(format!("https://yt/{i}"), format!("Video {i}")),
                score: 50.0,
            })
            .collect()
    }

    #[test]
    fn prompt_is_truncated_to_budget() {
        let text = "é".repeat(TRANSCRIPT_CHAR_BUDGET + 500);
        let prompt = item_prompt("t", &text);
        assert_eq!(prompt.matches('é').count(), TRANSCRIPT_CHAR_BUDGET);
    }

    #[test]
    fn schema_is_strict() {
        let schema = ItemExtraction::openai_schema();
        assert_eq!(schema["additionalProperties"], json!(false));
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 5);
        let strategic_item = &schema["properties"]["strategic"]["items"];
        assert_eq!(strategic_item["additionalProperties"], json!(false));
        assert!(strategic_item["properties"]["importance"].is_object());
    }

    #[tokio::test]
    async fn failures_are_isolated_per_item() {
        let extractor = MockExtractor::new().on_item(
            "alpha",
            json!({
                "strategic": [{"principle": "Size positions small", "evidence": "never more than 2%", "importance": "high"}],
                "tactical": [], "pitfalls": [], "quantitative": [], "terms": ["delta"]
            }),
        );
        let items = top(3);
        let transcripts = vec![
            Transcript::success("https://yt/0", None, "alpha transcript", vec![]),
            Transcript::failed("https://yt/1", "no captions"),
            Transcript::success("https://yt/2", None, "beta transcript", vec![]),
        ];

        let results = extract_all(Some(&extractor), &items, &transcripts).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://yt/0");
        assert_eq!(results[0].strategic.len(), 1);
        assert_eq!(results[0].terms, vec!["delta".to_string()]);
        assert_eq!(results[1].url, "https://yt/2");
        assert!(results[1].is_failed());
        assert_eq!(results[1].insight_count(), 0);
    }

    #[tokio::test]
    async fn unconfigured_extractor_fails_every_record() {
        let items = top(2);
        let transcripts = vec![
            Transcript::success("https://yt/0", None, "text", vec![]),
            Transcript::success("https://yt/1", None, "text", vec![]),
        ];

        let results = extract_all(None, &items, &transcripts).await;

        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.error.as_deref() == Some(EXTRACTOR_NOT_CONFIGURED)));
    }

    #[tokio::test]
    async fn malformed_output_is_an_extraction_error() {
        let extractor = MockExtractor::new().on_item("alpha", json!({"strategic": "not a list"}));
        let items = top(1);
        let transcript = Transcript::success("https://yt/0", None, "alpha", vec![]);

        let err = extract_item(&extractor, &items[0], &transcript).await.unwrap_err();
        assert!(matches!(err, ResearchError::Extraction(_)));
    }
}
