//! Normalize → match → record, shared by every component.

use crate::entities::ContextRules;
use crate::history::{CommandHistory, HistoryEntry};
use crate::matcher::{IntentMatch, IntentMatcher, MatchPolicy};
use crate::normalizer::Normalizer;
use crate::patterns::{Intent, PatternTable};
use parking_lot::Mutex;

pub struct IntentEngine<I> {
    normalizer: Normalizer,
    matcher: IntentMatcher<I>,
    history: Mutex<CommandHistory>,
}

impl<I: Intent> IntentEngine<I> {
    pub fn new(normalizer: Normalizer, table: PatternTable<I>, context: ContextRules) -> Self {
        Self {
            normalizer,
            matcher: IntentMatcher::new(table, context),
            history: Mutex::new(CommandHistory::default()),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.matcher = self.matcher.with_policy(policy);
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.matcher.policy()
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }

    /// Match without touching the history.
    pub fn classify(&self, raw: &str) -> Option<IntentMatch<I>> {
        self.matcher.match_intent(&self.normalize(raw))
    }

    /// Normalize and match `raw`, recording the outcome in the history.
    pub fn resolve(&self, raw: &str) -> Option<IntentMatch<I>> {
        let matched = self.classify(raw);
        self.history
            .lock()
            .record(raw, matched.as_ref().map(|m| m.intent.as_str()));
        matched
    }

    pub fn recent_history(&self, count: usize) -> Vec<HistoryEntry> {
        self.history.lock().recent(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum FileIntent {
        Create,
        Delete,
    }

    impl Intent for FileIntent {
        fn as_str(&self) -> &'static str {
            match self {
                FileIntent::Create => "create_file",
                FileIntent::Delete => "delete_file",
            }
        }
    }

    fn engine() -> IntentEngine<FileIntent> {
        let table = PatternTable::builder()
            .intent(
                FileIntent::Create,
                &[
                    r"(?:create|make|new)\s+(?:a\s+)?file\s+(?:named\s+|called\s+)?(.+)",
                    r"touch\s+(.+)",
                ],
            )
            .intent(FileIntent::Delete, &[r"(?:delete|remove)\s+(?:file\s+)?(.+)"])
            .build()
            .unwrap();
        IntentEngine::new(Normalizer::standard().unwrap(), table, ContextRules::new())
    }

    #[test]
    fn test_phrasings_resolve_to_same_intent() {
        let engine = engine();
        for phrase in [
            "create a file named notes.txt",
            "touch notes.txt",
            "make a file called notes.txt",
            "Could you please create file notes.txt",
        ] {
            let m = engine.resolve(phrase).unwrap();
            assert_eq!(m.intent, FileIntent::Create, "{}", phrase);
            assert_eq!(m.entities.target(), Some("notes.txt"), "{}", phrase);
        }
    }

    #[test]
    fn test_history_records_outcome() {
        let engine = engine();
        engine.resolve("delete old.log");
        engine.resolve("   ");
        let recent = engine.recent_history(2);
        assert_eq!(recent[0].resolved, None);
        assert_eq!(recent[1].resolved.as_deref(), Some("delete_file"));
    }

    #[test]
    fn test_classify_leaves_history_untouched() {
        let engine = engine();
        assert!(engine.classify("touch a.txt").is_some());
        assert!(engine.recent_history(10).is_empty());
    }
}
