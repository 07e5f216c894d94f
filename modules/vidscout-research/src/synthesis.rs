//! Cross-item synthesis.
//!
//! One extractor call groups the per-item highlights into themes, metric
//! consensus and points of debate. The response is then normalised locally so
//! support counts and item references hold regardless of what the model says.

use std::collections::HashSet;

use ai_client::StructuredOutput;
use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;
use vidscout_common::{
    ConsensusPoint, Contradiction, Highlight, Importance, PerItemInsights, PitfallConsensus,
    PointKind, QuantitativeConsensusEntry, ResearchError, Synthesis, TacticalConsensus, Theme,
    Viewpoint,
};

use crate::traits::InsightExtractor;

pub const MAX_THEMES: usize = 5;
pub const MAX_QUANTITATIVE: usize = 10;
pub const MAX_CONTRADICTIONS: usize = 5;

/// Legacy weight for tactical points.
pub const TACTICAL_WEIGHT: u8 = 3;

pub const SYNTHESIS_SYSTEM_PROMPT: &str = r#"You merge insights from several videos into one layered summary.

Input: for each video, its 0-based video_index, its title and its highlights.

1. Group semantically equivalent points across videos into 3-5 themes. Each theme has a strategic principle, tactical implementations and common pitfalls.
2. support_count is the number of distinct videos behind a point. A video repeating itself counts once. A tactic or pitfall never has more support than its theme.
3. List the supporting video indices for every theme, tactic, pitfall and metric.
4. Aggregate 5-10 quantitative metrics: every literal value observed, plus the most common value or range as the consensus.
5. Record contradictions where videos disagree, with each position and who holds it.

Importance is "critical", "high" or "medium"."#;

// ---------------------------------------------------------------------------
// Model input/output shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    video_index: usize,
    video_title: &'a str,
    highlights: Vec<Highlight>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SynthesisResponse {
    #[serde(default)]
    pub themes: Vec<WireTheme>,
    #[serde(default)]
    pub quantitative_consensus: Vec<WireQuantitative>,
    #[serde(default)]
    pub contradictions: Vec<WireContradiction>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct WireTheme {
    /// High-level concept, e.g. "Risk management is critical".
    pub strategic_principle: String,
    #[serde(default)]
    pub support_count: i64,
    /// "critical", "high" or "medium"
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub supporting_videos: Vec<i64>,
    #[serde(default)]
    pub tactical_implementations: Vec<WireTactic>,
    #[serde(default)]
    pub common_pitfalls: Vec<WirePitfall>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct WireTactic {
    pub action: String,
    #[serde(default)]
    pub specifics: String,
    #[serde(default)]
    pub support_count: i64,
    #[serde(default)]
    pub supporting_videos: Vec<i64>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct WirePitfall {
    pub warning: String,
    #[serde(default)]
    pub consequence: String,
    #[serde(default)]
    pub support_count: i64,
    #[serde(default)]
    pub supporting_videos: Vec<i64>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct WireQuantitative {
    /// What is measured, e.g. "Risk per trade".
    pub metric: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub consensus: String,
    #[serde(default)]
    pub support_count: i64,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub supporting_videos: Vec<i64>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct WireContradiction {
    pub topic: String,
    #[serde(default)]
    pub debate_type: String,
    #[serde(default)]
    pub viewpoints: Vec<WireViewpoint>,
    #[serde(default)]
    pub insight: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct WireViewpoint {
    pub position: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub supporting_videos: Vec<i64>,
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Merge per-item insights into cross-item consensus.
///
/// `labels[i]` names `per_item[i]`. Items without highlights are not sent, but
/// indices still refer to positions in `per_item`. With nothing to send, the
/// extractor is not called and the result is empty.
pub async fn synthesize(
    extractor: &dyn InsightExtractor,
    per_item: &[PerItemInsights],
    labels: &[String],
) -> Result<Synthesis, ResearchError> {
    let input: Vec<SynthesisInput<'_>> = per_item
        .iter()
        .enumerate()
        .map(|(i, item)| SynthesisInput {
            video_index: i,
            video_title: labels.get(i).map(String::as_str).unwrap_or(""),
            highlights: item.highlights(),
        })
        .filter(|input| !input.highlights.is_empty())
        .collect();

    if input.is_empty() {
        info!("No highlights to synthesize");
        return Ok(Synthesis::default());
    }

    let payload =
        serde_json::to_string_pretty(&input).context("failed to encode synthesis input")?;
    let user = format!("Synthesize consensus from these video highlights:\n\n{payload}");

    let value = extractor
        .extract(SYNTHESIS_SYSTEM_PROMPT, &user, SynthesisResponse::openai_schema())
        .await
        .map_err(|e| ResearchError::Extraction(format!("{e:#}")))?;

    let response: SynthesisResponse = serde_json::from_value(value)
        .map_err(|e| ResearchError::Extraction(format!("malformed synthesis: {e}")))?;

    let synthesis = enforce(response, per_item.len());
    info!(
        themes = synthesis.themes.len(),
        metrics = synthesis.quantitative_consensus.len(),
        contradictions = synthesis.contradictions.len(),
        "Synthesized cross-item consensus"
    );
    Ok(synthesis)
}

// ---------------------------------------------------------------------------
// Local enforcement
// ---------------------------------------------------------------------------

/// Normalise a model response over `item_count` analysed items.
pub fn enforce(response: SynthesisResponse, item_count: usize) -> Synthesis {
    let themes: Vec<Theme> = response
        .themes
        .into_iter()
        .filter(|t| !t.strategic_principle.trim().is_empty())
        .map(|t| theme_from_wire(t, item_count))
        .collect();

    let mut themes = merge_equivalent_themes(themes, item_count);
    themes.truncate(MAX_THEMES);

    let mut quantitative_consensus: Vec<QuantitativeConsensusEntry> = response
        .quantitative_consensus
        .into_iter()
        .filter(|q| !q.metric.trim().is_empty())
        .map(|q| {
            let supporting_items = valid_items(&q.supporting_videos, item_count);
            QuantitativeConsensusEntry {
                metric: q.metric.trim().to_string(),
                values: dedupe_values(q.values),
                consensus: q.consensus,
                support_count: support(&supporting_items, q.support_count, item_count),
                context: q.context,
                supporting_items,
            }
        })
        .collect();
    quantitative_consensus.truncate(MAX_QUANTITATIVE);

    let mut contradictions: Vec<Contradiction> = response
        .contradictions
        .into_iter()
        .filter(|c| !c.topic.trim().is_empty())
        .map(|c| Contradiction {
            topic: c.topic.trim().to_string(),
            debate_type: c.debate_type,
            viewpoints: c
                .viewpoints
                .into_iter()
                .map(|v| Viewpoint {
                    position: v.position,
                    reasoning: v.reasoning,
                    supporting_items: valid_items(&v.supporting_videos, item_count),
                })
                .collect(),
            insight: c.insight,
        })
        .collect();
    contradictions.truncate(MAX_CONTRADICTIONS);

    Synthesis {
        themes,
        quantitative_consensus,
        contradictions,
    }
}

fn theme_from_wire(wire: WireTheme, item_count: usize) -> Theme {
    let supporting_items = valid_items(&wire.supporting_videos, item_count);
    let support_count = support(&supporting_items, wire.support_count, item_count);

    let tactical_implementations = wire
        .tactical_implementations
        .into_iter()
        .filter(|t| !t.action.trim().is_empty())
        .map(|t| {
            let supporting_items = valid_items(&t.supporting_videos, item_count);
            TacticalConsensus {
                action: t.action,
                specifics: t.specifics,
                support_count: support(&supporting_items, t.support_count, item_count),
                supporting_items,
            }
        })
        .collect();

    let common_pitfalls = wire
        .common_pitfalls
        .into_iter()
        .filter(|p| !p.warning.trim().is_empty())
        .map(|p| {
            let supporting_items = valid_items(&p.supporting_videos, item_count);
            PitfallConsensus {
                warning: p.warning,
                consequence: p.consequence,
                support_count: support(&supporting_items, p.support_count, item_count),
                supporting_items,
            }
        })
        .collect();

    let mut theme = Theme {
        principle: wire.strategic_principle.trim().to_string(),
        support_count,
        importance: Importance::parse(&wire.importance),
        supporting_items,
        tactical_implementations,
        common_pitfalls,
    };
    clamp_children(&mut theme);
    theme
}

/// Themes whose principles differ only by case or spacing become one theme.
fn merge_equivalent_themes(themes: Vec<Theme>, item_count: usize) -> Vec<Theme> {
    let mut merged: Vec<(String, Theme)> = Vec::new();

    for theme in themes {
        let key = normalize(&theme.principle);
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => {
                let reported = existing.support_count.max(theme.support_count);
                existing.supporting_items =
                    union(&existing.supporting_items, &theme.supporting_items);
                existing.support_count =
                    support(&existing.supporting_items, reported as i64, item_count);
                existing.importance = existing.importance.max(theme.importance);
                existing
                    .tactical_implementations
                    .extend(theme.tactical_implementations);
                existing.common_pitfalls.extend(theme.common_pitfalls);
                clamp_children(existing);
            }
            None => merged.push((key, theme)),
        }
    }

    merged.into_iter().map(|(_, theme)| theme).collect()
}

fn clamp_children(theme: &mut Theme) {
    let cap = theme.support_count;
    for tactic in &mut theme.tactical_implementations {
        tactic.support_count = tactic.support_count.min(cap);
    }
    for pitfall in &mut theme.common_pitfalls {
        pitfall.support_count = pitfall.support_count.min(cap);
    }
}

/// Distinct supporting items when listed, otherwise the reported count.
/// Never more than `item_count`.
fn support(items: &[usize], reported: i64, item_count: usize) -> usize {
    let count = if items.is_empty() {
        usize::try_from(reported.max(0)).unwrap_or(0)
    } else {
        items.len()
    };
    count.min(item_count)
}

/// In-range indices, first occurrence kept.
fn valid_items(raw: &[i64], item_count: usize) -> Vec<usize> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|&i| usize::try_from(i).ok())
        .filter(|&i| i < item_count)
        .filter(|&i| seen.insert(i))
        .collect()
}

fn union(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut seen = HashSet::new();
    a.iter().chain(b).copied().filter(|i| seen.insert(*i)).collect()
}

fn dedupe_values(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Legacy flattening
// ---------------------------------------------------------------------------

/// One strategic record per theme, followed by one tactical record per
/// implementation pointing back at its theme.
pub fn flatten_themes(themes: &[Theme]) -> Vec<ConsensusPoint> {
    themes
        .iter()
        .flat_map(|theme| {
            let strategic = ConsensusPoint {
                summary: theme.principle.clone(),
                support_count: theme.support_count,
                weight: theme.importance.weight(),
                kind: PointKind::Strategic,
                parent: None,
            };
            let tactics = theme
                .tactical_implementations
                .iter()
                .map(|tactic| ConsensusPoint {
                    summary: tactic.action.clone(),
                    support_count: tactic.support_count,
                    weight: TACTICAL_WEIGHT,
                    kind: PointKind::Tactical,
                    parent: Some(theme.principle.clone()),
                });
            std::iter::once(strategic).chain(tactics)
        })
        .collect()
}
