//! Intent matching over a [`PatternTable`].
//!
//! Two policies are supported. `FirstMatch` returns the first pattern that
//! matches in table order. `BestMatch` evaluates every pattern and keeps the
//! most specific one: the match with the most literal (non-captured)
//! characters in its span. Ties go to the longer span, then to table order.

use crate::entities::{ContextRules, Entities};
use crate::patterns::{Intent, PatternTable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    FirstMatch,
    #[default]
    BestMatch,
}

#[derive(Debug, Clone)]
pub struct IntentMatch<I> {
    pub intent: I,
    pub entities: Entities,
    /// Normalized text the match was made against.
    pub text: String,
    pub pattern_index: usize,
    /// Matched span over text length, capped at 1.0. Informational only.
    pub confidence: f32,
}

struct Candidate {
    intent_index: usize,
    pattern_index: usize,
    specificity: usize,
    span_len: usize,
    groups: Vec<Option<String>>,
}

pub struct IntentMatcher<I> {
    table: PatternTable<I>,
    context: ContextRules,
    policy: MatchPolicy,
}

impl<I: Intent> IntentMatcher<I> {
    pub fn new(table: PatternTable<I>, context: ContextRules) -> Self {
        Self {
            table,
            context,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn table(&self) -> &PatternTable<I> {
        &self.table
    }

    pub fn match_intent(&self, text: &str) -> Option<IntentMatch<I>> {
        if text.trim().is_empty() {
            return None;
        }

        let best = match self.policy {
            MatchPolicy::FirstMatch => self.candidates(text).next(),
            MatchPolicy::BestMatch => self.candidates(text).fold(None, |best, candidate| {
                match best {
                    Some(current) if !outranks(&candidate, &current) => Some(current),
                    _ => Some(candidate),
                }
            }),
        }?;

        let entry = &self.table.entries()[best.intent_index];
        let text_len = text.chars().count().max(1);
        let confidence = (best.span_len as f32 / text_len as f32).min(1.0);

        tracing::debug!(
            intent = entry.intent.as_str(),
            pattern = best.pattern_index,
            specificity = best.specificity,
            "intent matched"
        );

        Some(IntentMatch {
            intent: entry.intent,
            entities: Entities {
                groups: best.groups,
                context: self.context.extract(text),
            },
            text: text.to_string(),
            pattern_index: best.pattern_index,
            confidence,
        })
    }

    fn candidates<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Candidate> + 'a {
        self.table
            .entries()
            .iter()
            .enumerate()
            .flat_map(move |(intent_index, entry)| {
                entry
                    .patterns
                    .iter()
                    .enumerate()
                    .filter_map(move |(pattern_index, pattern)| {
                        let captures = pattern.captures(text)?;
                        let whole = captures.get(0)?;
                        let span_len = whole.as_str().chars().count();
                        let groups: Vec<Option<String>> = captures
                            .iter()
                            .skip(1)
                            .map(|g| g.map(|m| m.as_str().to_string()))
                            .collect();
                        let captured: usize = groups
                            .iter()
                            .flatten()
                            .map(|g| g.chars().count())
                            .sum();
                        Some(Candidate {
                            intent_index,
                            pattern_index,
                            specificity: span_len.saturating_sub(captured),
                            span_len,
                            groups,
                        })
                    })
            })
    }
}

/// Strictly better than `current`. Candidates arrive in table order, so
/// equal candidates keep the earlier one.
fn outranks(candidate: &Candidate, current: &Candidate) -> bool {
    (candidate.specificity, candidate.span_len) > (current.specificity, current.span_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum AppIntent {
        Launch,
        Search,
        List,
    }

    impl Intent for AppIntent {
        fn as_str(&self) -> &'static str {
            match self {
                AppIntent::Launch => "launch",
                AppIntent::Search => "search",
                AppIntent::List => "list",
            }
        }
    }

    fn matcher(policy: MatchPolicy) -> IntentMatcher<AppIntent> {
        let table = PatternTable::builder()
            .intent(
                AppIntent::Launch,
                &[r"(?:open|launch|start)\s+(.+)", r"(.+?)(?:\s+please)?$"],
            )
            .intent(AppIntent::Search, &[r"(?:find|search)\s+(?:for\s+)?(.+)"])
            .intent(
                AppIntent::List,
                &[r"(?:list|show)\s+(?:all\s+)?(?:my\s+)?(?:apps|applications|programs)"],
            )
            .build()
            .unwrap();
        let context = ContextRules::new().rule("urgency", &[("high", &["now", "asap"])]);
        IntentMatcher::new(table, context).with_policy(policy)
    }

    #[test]
    fn test_best_match_prefers_literal_pattern_over_catch_all() {
        let m = matcher(MatchPolicy::BestMatch)
            .match_intent("list applications")
            .unwrap();
        assert_eq!(m.intent, AppIntent::List);
        assert!(m.entities.groups.is_empty());
    }

    #[test]
    fn test_first_match_keeps_table_order() {
        let m = matcher(MatchPolicy::FirstMatch)
            .match_intent("list applications")
            .unwrap();
        assert_eq!(m.intent, AppIntent::Launch);
        assert_eq!(m.entities.group(0), Some("list applications"));
    }

    #[test]
    fn test_captures_target_and_context() {
        let m = matcher(MatchPolicy::BestMatch)
            .match_intent("open firefox now")
            .unwrap();
        assert_eq!(m.intent, AppIntent::Launch);
        assert_eq!(m.entities.target(), Some("firefox now"));
        assert!(m.entities.has_context("urgency", "high"));
    }

    #[test]
    fn test_tie_goes_to_earlier_definition() {
        let table = PatternTable::builder()
            .intent(AppIntent::Search, &[r"go (.+)"])
            .intent(AppIntent::Launch, &[r"go (.+)"])
            .build()
            .unwrap();
        let matcher = IntentMatcher::new(table, ContextRules::new());
        let m = matcher.match_intent("go home").unwrap();
        assert_eq!(m.intent, AppIntent::Search);
    }

    #[test]
    fn test_blank_text_never_matches() {
        let matcher = matcher(MatchPolicy::BestMatch);
        assert!(matcher.match_intent("").is_none());
        assert!(matcher.match_intent("   ").is_none());
    }

    #[test]
    fn test_confidence_is_span_ratio() {
        let m = matcher(MatchPolicy::BestMatch)
            .match_intent("search for gimp")
            .unwrap();
        assert_eq!(m.intent, AppIntent::Search);
        assert!((m.confidence - 1.0).abs() < f32::EPSILON);
    }
}
