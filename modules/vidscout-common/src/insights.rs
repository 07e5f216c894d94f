use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Per-item insights
// =============================================================================

/// A high-level principle: why something matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StrategicPoint {
    pub principle: String,
    /// Short supporting quote from the transcript.
    pub evidence: String,
    /// "high" or "medium"
    pub importance: String,
}

/// A concrete how-to step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TacticalPoint {
    pub action: String,
    /// Exact parameters or steps.
    pub specifics: String,
    pub evidence: String,
}

/// A common mistake and what it costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Pitfall {
    pub warning: String,
    pub consequence: String,
    pub evidence: String,
}

/// A number, range or parameter stated in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuantitativePoint {
    /// What is being measured, e.g. "risk per trade".
    pub metric: String,
    /// The literal value or range, e.g. "1-2%".
    pub value: String,
    pub context: String,
    pub quote: String,
}

/// Flattened strategic/tactical point used as synthesis input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub point: String,
    pub evidence: String,
}

/// Extraction result for one transcribed item. Never null: a failed extraction
/// is an all-empty record with `error` set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerItemInsights {
    pub url: String,
    pub strategic: Vec<StrategicPoint>,
    pub tactical: Vec<TacticalPoint>,
    pub pitfalls: Vec<Pitfall>,
    pub quantitative: Vec<QuantitativePoint>,
    pub terms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PerItemInsights {
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn insight_count(&self) -> usize {
        self.strategic.len() + self.tactical.len() + self.pitfalls.len()
    }

    /// Strategic then tactical points, each with its evidence.
    pub fn highlights(&self) -> Vec<Highlight> {
        let strategic = self.strategic.iter().map(|s| Highlight {
            point: s.principle.clone(),
            evidence: s.evidence.clone(),
        });
        let tactical = self.tactical.iter().map(|t| Highlight {
            point: t.action.clone(),
            evidence: t.evidence.clone(),
        });
        strategic.chain(tactical).collect()
    }
}

// =============================================================================
// Synthesized consensus
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    #[default]
    Medium,
    High,
    Critical,
}

impl Importance {
    /// Lenient parse of model output. Anything unrecognised is `Medium`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Importance::Critical,
            "high" => Importance::High,
            _ => Importance::Medium,
        }
    }

    /// Weight used by the legacy flat consensus list.
    pub fn weight(self) -> u8 {
        match self {
            Importance::Critical => 5,
            Importance::High => 4,
            Importance::Medium => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticalConsensus {
    pub action: String,
    pub specifics: String,
    pub support_count: usize,
    /// 0-based indices into the analysed items.
    pub supporting_items: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitfallConsensus {
    pub warning: String,
    pub consequence: String,
    pub support_count: usize,
    pub supporting_items: Vec<usize>,
}

/// A cross-item strategic grouping with nested tactics and pitfalls.
///
/// `support_count` never exceeds the number of analysed items, and each child's
/// count never exceeds the theme's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub principle: String,
    pub support_count: usize,
    pub importance: Importance,
    pub supporting_items: Vec<usize>,
    pub tactical_implementations: Vec<TacticalConsensus>,
    pub common_pitfalls: Vec<PitfallConsensus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitativeConsensusEntry {
    pub metric: String,
    /// Raw values as observed, in order, exact duplicates removed.
    pub values: Vec<String>,
    pub consensus: String,
    pub support_count: usize,
    pub context: String,
    pub supporting_items: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub position: String,
    pub reasoning: String,
    pub supporting_items: Vec<usize>,
}

/// A point where sources disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contradiction {
    pub topic: String,
    pub debate_type: String,
    pub viewpoints: Vec<Viewpoint>,
    pub insight: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Strategic,
    Tactical,
}

/// Legacy flat consensus record, projected mechanically from themes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusPoint {
    pub summary: String,
    pub support_count: usize,
    pub weight: u8,
    #[serde(rename = "type")]
    pub kind: PointKind,
    /// Parent theme principle, for tactical points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Output of one cross-item synthesis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Synthesis {
    pub themes: Vec<Theme>,
    pub quantitative_consensus: Vec<QuantitativeConsensusEntry>,
    pub contradictions: Vec<Contradiction>,
}

impl Synthesis {
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
            && self.quantitative_consensus.is_empty()
            && self.contradictions.is_empty()
    }
}

/// The insight half of a research result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    pub themes: Vec<Theme>,
    pub quantitative_consensus: Vec<QuantitativeConsensusEntry>,
    pub contradictions: Vec<Contradiction>,
    /// Legacy flattening of `themes`.
    pub consensus_points: Vec<ConsensusPoint>,
    pub per_item: Vec<PerItemInsights>,
    /// Why the insight sections are empty, when they are.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_parse_is_lenient() {
        assert_eq!(Importance::parse("Critical"), Importance::Critical);
        assert_eq!(Importance::parse(" high "), Importance::High);
        assert_eq!(Importance::parse("medium"), Importance::Medium);
        assert_eq!(Importance::parse("very important"), Importance::Medium);
    }

    #[test]
    fn importance_weights() {
        assert_eq!(Importance::Critical.weight(), 5);
        assert_eq!(Importance::High.weight(), 4);
        assert_eq!(Importance::Medium.weight(), 3);
    }

    #[test]
    fn highlights_list_strategic_before_tactical() {
        let insights = PerItemInsights {
            url: "u".into(),
            strategic: vec![StrategicPoint {
                principle: "Manage risk first".into(),
                evidence: "never risk more than 2%".into(),
                importance: "high".into(),
            }],
            tactical: vec![TacticalPoint {
                action: "Set a stop loss".into(),
                specifics: "below support".into(),
                evidence: "I always set a stop".into(),
            }],
            ..Default::default()
        };

        let highlights = insights.highlights();
        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights[0].point, "Manage risk first");
        assert_eq!(highlights[1].point, "Set a stop loss");
    }

    #[test]
    fn failed_record_is_empty_but_present() {
        let failed = PerItemInsights::failed("u", "timeout");
        assert!(failed.is_failed());
        assert_eq!(failed.insight_count(), 0);
        assert!(failed.highlights().is_empty());
    }

    #[test]
    fn analysis_deserialises_from_partial_json() {
        let analysis: Analysis = serde_json::from_str(r#"{"themes": []}"#).unwrap();
        assert!(analysis.per_item.is_empty());
        assert!(analysis.error.is_none());
    }
}
