//! Follow-up questions over a finished research result.

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::LazyLock;

use ai_client::{truncate_chars, ChatOptions, Message};
use regex::Regex;
use tracing::info;
use vidscout_common::{
    Analysis, ChatAnswer, ChatRole, ChatTurn, Citation, ResearchError, ScoredCandidate, Transcript,
};

use crate::traits::InsightExtractor;

/// Hard cap on assembled context, marker included.
pub const CONTEXT_CHAR_LIMIT: usize = 8_000;
pub const TRUNCATION_MARKER: &str = "\n\n[Context truncated for length]";

/// Prior turns replayed to the model.
pub const HISTORY_TURNS: usize = 6;
pub const SEGMENTS_PER_ITEM: usize = 10;
pub const EXCERPT_CHARS: usize = 500;
pub const MAX_SUGGESTIONS: usize = 6;

const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 1_000;

/// Heuristic: matches "Video 3" or "item 3" anywhere in free text. It can miss
/// citations phrased differently and can pick up numbers that were not meant
/// as references.
static CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:video|item)\s+(\d+)").expect("valid regex"));

fn system_prompt(item_count: usize) -> String {
    format!(
        r#"You are a research assistant answering questions about {item_count} YouTube videos on one topic.

You have their transcripts, the insights extracted from them (themes, metrics, points of debate) and their metadata.

Rules:
1. Answer only from the video content provided. If the answer is not there, say so.
2. Cite the videos you rely on as "Video N".
3. Include timestamps as [HH:MM:SS] when you refer to a specific moment.
4. When videos disagree, give both positions.

Cite like: [Video 2 at 00:03:45] or [Video 1: Title].
Example: "According to Video 1 at [00:03:45], they recommend risking only 1% per trade.""#
    )
}

/// Build the bounded context block, in fixed section order.
pub fn build_context(
    transcripts: &[Transcript],
    items: &[ScoredCandidate],
    insights: &Analysis,
) -> String {
    let total = items.len();
    let mut context = String::from("=== VIDEO SUMMARIES ===\n\n");

    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(context, "Video {}: \"{}\"", i + 1, item.title);
        let _ = writeln!(context, "Channel: {}", item.channel);
        let _ = writeln!(
            context,
            "Views: {}, Duration: {}:{:02}",
            group_thousands(item.views),
            item.duration_sec / 60,
            item.duration_sec % 60
        );
        let _ = writeln!(context, "Score: {:.1}/100\n", item.score);
    }

    if !insights.themes.is_empty() {
        context.push_str("\n=== KEY THEMES ===\n\n");
        for (i, theme) in insights.themes.iter().enumerate() {
            let _ = writeln!(
                context,
                "{}. {} ({}/{total} videos)",
                i + 1,
                theme.principle,
                theme.support_count
            );
            if !theme.tactical_implementations.is_empty() {
                context.push_str("   Tactics:\n");
                for tactic in theme.tactical_implementations.iter().take(3) {
                    let _ = writeln!(context, "   - {}", tactic.action);
                }
            }
        }
    }

    if !insights.quantitative_consensus.is_empty() {
        context.push_str("\n=== KEY METRICS ===\n\n");
        for metric in &insights.quantitative_consensus {
            let _ = writeln!(
                context,
                "{}: {} ({}/{total} videos)",
                metric.metric, metric.consensus, metric.support_count
            );
        }
    }

    if !insights.contradictions.is_empty() {
        context.push_str("\n=== POINTS OF DEBATE ===\n\n");
        for (i, debate) in insights.contradictions.iter().enumerate() {
            let _ = writeln!(context, "{}. {}", i + 1, debate.topic);
            for (label, viewpoint) in ('A'..='Z').zip(&debate.viewpoints) {
                let _ = writeln!(context, "   Viewpoint {label}: {}", viewpoint.position);
            }
        }
    }

    context.push_str("\n=== TRANSCRIPT EXCERPTS (with timestamps) ===\n\n");
    for (i, transcript) in transcripts.iter().enumerate() {
        if !transcript.segments.is_empty() {
            let _ = writeln!(context, "Video {} (timestamped):", i + 1);
            for segment in transcript.segments.iter().take(SEGMENTS_PER_ITEM) {
                if !segment.text.is_empty() && !segment.start.is_empty() {
                    let _ = writeln!(context, "[{}] {}", segment.start, segment.text);
                }
            }
            context.push('\n');
        } else if let Some(text) = transcript.text.as_deref().filter(|t| !t.is_empty()) {
            let _ = write!(
                context,
                "Video {} excerpt:\n{}...\n\n",
                i + 1,
                truncate_chars(text, EXCERPT_CHARS)
            );
        }
    }

    cap_context(context)
}

fn cap_context(context: String) -> String {
    if context.chars().count() <= CONTEXT_CHAR_LIMIT {
        return context;
    }
    let keep = CONTEXT_CHAR_LIMIT - TRUNCATION_MARKER.chars().count();
    format!("{}{TRUNCATION_MARKER}", truncate_chars(&context, keep))
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Item references in `answer`, first mention first, one per item.
/// Numbers outside `1..=items.len()` are ignored.
pub fn extract_citations(answer: &str, items: &[ScoredCandidate]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    CITATION
        .captures_iter(answer)
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .filter_map(|n| n.checked_sub(1))
        .filter(|&index| index < items.len() && seen.insert(index))
        .map(|index| {
            let item = &items[index];
            Citation {
                index,
                title: item.title.clone(),
                url: item.url.clone(),
                channel: item.channel.clone(),
            }
        })
        .collect()
}

/// Answer one question grounded in a research result.
pub async fn answer(
    extractor: Option<&dyn InsightExtractor>,
    question: &str,
    transcripts: &[Transcript],
    items: &[ScoredCandidate],
    history: &[ChatTurn],
    insights: &Analysis,
) -> Result<ChatAnswer, ResearchError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ResearchError::Validation("question is required".into()));
    }
    if items.is_empty() && transcripts.is_empty() {
        return Err(ResearchError::Validation("research data is required".into()));
    }
    let extractor = extractor.ok_or(ResearchError::ExtractorUnavailable)?;

    let context = build_context(transcripts, items, insights);

    let mut messages = vec![
        Message::system(system_prompt(items.len())),
        Message::user(format!("Context about the videos:\n\n{context}")),
    ];
    let recent = &history[history.len().saturating_sub(HISTORY_TURNS)..];
    messages.extend(recent.iter().map(|turn| match turn.role {
        ChatRole::User => Message::user(&turn.content),
        ChatRole::Assistant => Message::assistant(&turn.content),
    }));
    messages.push(Message::user(question));

    let options = ChatOptions {
        temperature: Some(CHAT_TEMPERATURE),
        max_tokens: Some(CHAT_MAX_TOKENS),
    };
    let completion = extractor
        .converse(&messages, options)
        .await
        .map_err(|e| ResearchError::Extraction(format!("{e:#}")))?;

    let citations = extract_citations(&completion.text, items);
    info!(
        context_chars = context.chars().count(),
        history = recent.len(),
        citations = citations.len(),
        tokens = completion.tokens_used,
        "Answered follow-up question"
    );

    Ok(ChatAnswer {
        answer: completion.text,
        citations,
        tokens_used: completion.tokens_used,
    })
}

/// Generic starter questions plus up to two drawn from the insights.
pub fn suggest_questions(query: &str, insights: &Analysis) -> Vec<String> {
    let mut suggestions = vec![
        format!("What are the main strategies mentioned for {query}?"),
        "What specific numbers or metrics are recommended?".to_string(),
        "Where do the experts disagree?".to_string(),
        "What are the common mistakes to avoid?".to_string(),
        "What tools or resources are recommended?".to_string(),
    ];

    if let Some(theme) = insights.themes.first() {
        suggestions.push(format!("Tell me more about {}", theme.principle.to_lowercase()));
    }
    if let Some(debate) = insights.contradictions.first() {
        suggestions.push(format!(
            "Explain the different viewpoints on {}",
            debate.topic.to_lowercase()
        ));
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExtractor;
    use vidscout_common::{Candidate, Contradiction, Importance, Segment, TacticalConsensus, Theme, Viewpoint};

    fn items(n: usize) -> Vec<ScoredCandidate> {
        (0..n)
            .map(|i| {
                let mut c = Candidate::new(format!("https://yt/{i}"), format!("Title {i}"));
                c.channel = format!("Channel {i}");
                c.views = 1_234_567;
                c.duration_sec = 754;
                ScoredCandidate { candidate: c, score: 81.25 }
            })
            .collect()
    }

    fn theme(principle: &str, tactics: usize) -> Theme {
        Theme {
            principle: principle.into(),
            support_count: 2,
            importance: Importance::High,
            supporting_items: vec![0, 1],
            tactical_implementations: (0..tactics)
                .map(|i| TacticalConsensus {
                    action: format!("Tactic {i}"),
                    specifics: String::new(),
                    support_count: 1,
                    supporting_items: vec![0],
                })
                .collect(),
            common_pitfalls: vec![],
        }
    }

    fn debate() -> Contradiction {
        Contradiction {
            topic: "Weekly Expiries".into(),
            debate_type: "timeframe".into(),
            viewpoints: vec![
                Viewpoint { position: "Weekly is better".into(), reasoning: String::new(), supporting_items: vec![0] },
                Viewpoint { position: "Monthly is safer".into(), reasoning: String::new(), supporting_items: vec![1] },
            ],
            insight: String::new(),
        }
    }

    #[test]
    fn sections_appear_in_order() {
        let insights = Analysis {
            themes: vec![theme("Sell premium", 5)],
            contradictions: vec![debate()],
            ..Default::default()
        };
        let segments = (0..12)
            .map(|i| Segment { start: format!("00:00:{i:02}"), end: String::new(), text: format!("line {i}") })
            .collect();
        let transcripts = vec![
            Transcript::success("https://yt/0", None, "full text", segments),
            Transcript::success("https://yt/1", None, "plain transcript body", vec![]),
        ];

        let context = build_context(&transcripts, &items(2), &insights);

        let summaries = context.find("=== VIDEO SUMMARIES ===").unwrap();
        let themes = context.find("=== KEY THEMES ===").unwrap();
        let debate = context.find("=== POINTS OF DEBATE ===").unwrap();
        let excerpts = context.find("=== TRANSCRIPT EXCERPTS").unwrap();
        assert!(summaries < themes && themes < debate && debate < excerpts);
        assert!(!context.contains("=== KEY METRICS ==="));

        assert!(context.contains("Video 1: \"Title 0\""));
        assert!(context.contains("Views: 1,234,567, Duration: 12:34"));
        assert!(context.contains("Score: 81.2/100") || context.contains("Score: 81.3/100"));
        assert!(context.contains("1. Sell premium (2/2 videos)"));
        assert!(context.contains("   - Tactic 2"));
        assert!(!context.contains("Tactic 3"));
        assert!(context.contains("   Viewpoint B: Monthly is safer"));
        assert!(context.contains("[00:00:09] line 9"));
        assert!(!context.contains("line 10"));
        assert!(context.contains("Video 2 excerpt:\nplain transcript body..."));
    }

    #[test]
    fn context_is_capped_with_marker() {
        let long = "word ".repeat(5_000);
        let transcripts: Vec<Transcript> = (0..30)
            .map(|i| Transcript::success(format!("https://yt/{i}"), None, long.clone(), vec![]))
            .collect();

        let context = build_context(&transcripts, &items(30), &Analysis::default());

        assert_eq!(context.chars().count(), CONTEXT_CHAR_LIMIT);
        assert!(context.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn short_context_is_untouched() {
        let context = build_context(&[], &items(1), &Analysis::default());
        assert!(context.chars().count() < CONTEXT_CHAR_LIMIT);
        assert!(!context.contains("[Context truncated"));
    }

    #[test]
    fn citations_dedupe_and_ignore_out_of_range() {
        let answer = "Video 2 says so, video 1 agrees [Video 2 at 00:01:00]. Item 3 too. Video 9 and Video 0 don't exist.";
        let citations = extract_citations(answer, &items(3));

        let indices: Vec<usize> = citations.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 0, 2]);
        assert_eq!(citations[0].title, "Title 1");
        assert_eq!(citations[0].channel, "Channel 1");
    }

    #[test]
    fn suggestions_add_insight_questions_and_cap() {
        let insights = Analysis {
            themes: vec![theme("Risk Management First", 0)],
            contradictions: vec![debate()],
            ..Default::default()
        };
        let suggestions = suggest_questions("covered calls", &insights);

        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(suggestions[0], "What are the main strategies mentioned for covered calls?");
        assert_eq!(suggestions[5], "Tell me more about risk management first");
    }

    #[test]
    fn suggestions_without_insights() {
        let suggestions = suggest_questions("x", &Analysis::default());
        assert_eq!(suggestions.len(), 5);

        let only_debate = Analysis { contradictions: vec![debate()], ..Default::default() };
        let suggestions = suggest_questions("x", &only_debate);
        assert_eq!(suggestions[5], "Explain the different viewpoints on weekly expiries");
    }

    #[tokio::test]
    async fn unconfigured_extractor_is_unavailable() {
        let err = answer(None, "why?", &[], &items(1), &[], &Analysis::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::ExtractorUnavailable));
    }

    #[tokio::test]
    async fn missing_question_is_validation() {
        let extractor = MockExtractor::new();
        let err = answer(Some(&extractor), "  ", &[], &items(1), &[], &Analysis::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::Validation(_)));
    }

    #[tokio::test]
    async fn replays_last_turns_and_extracts_citations() {
        let extractor = MockExtractor::new().on_chat("Video 1 at [00:00:05] covers it.", 321);
        let history: Vec<ChatTurn> = (0..9)
            .map(|i| ChatTurn {
                role: if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant },
                content: format!("turn {i}"),
            })
            .collect();

        let reply = answer(Some(&extractor), "What about stops?", &[], &items(2), &history, &Analysis::default())
            .await
            .unwrap();

        assert_eq!(reply.tokens_used, 321);
        assert_eq!(reply.citations.len(), 1);
        assert_eq!(reply.citations[0].url, "https://yt/0");

        let sent = extractor.chat_messages();
        let messages = &sent[0];
        // system + context + 6 history + question
        assert_eq!(messages.len(), 9);
        assert_eq!(messages[2].content, "turn 3");
        assert_eq!(messages[8].content, "What about stops?");
    }

    #[tokio::test]
    async fn extractor_failure_propagates() {
        let extractor = MockExtractor::new();
        let err = answer(Some(&extractor), "why?", &[], &items(1), &[], &Analysis::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::Extraction(_)));
    }
}
