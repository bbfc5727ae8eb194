//! Ordered intent → regex tables.

use regex::{Regex, RegexBuilder};
use std::fmt::Debug;
use std::hash::Hash;

/// A component's intent vocabulary, usually a fieldless enum.
pub trait Intent: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    fn as_str(&self) -> &'static str;
}

#[derive(Debug)]
pub struct IntentPatterns<I> {
    pub intent: I,
    pub patterns: Vec<Regex>,
}

/// Intents in definition order, each with its patterns in list order.
/// All patterns are compiled case-insensitive.
#[derive(Debug)]
pub struct PatternTable<I> {
    entries: Vec<IntentPatterns<I>>,
}

impl<I: Intent> PatternTable<I> {
    pub fn builder() -> PatternTableBuilder<I> {
        PatternTableBuilder {
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[IntentPatterns<I>] {
        &self.entries
    }

    pub fn intents(&self) -> impl Iterator<Item = I> + '_ {
        self.entries.iter().map(|entry| entry.intent)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct PatternTableBuilder<I> {
    entries: Vec<(I, Vec<String>)>,
}

impl<I: Intent> PatternTableBuilder<I> {
    pub fn intent(mut self, intent: I, patterns: &[&str]) -> Self {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        match self.entries.iter_mut().find(|(existing, _)| *existing == intent) {
            Some((_, existing)) => existing.extend(patterns),
            None => self.entries.push((intent, patterns)),
        }
        self
    }

    pub fn build(self) -> Result<PatternTable<I>, regex::Error> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for (intent, sources) in self.entries {
            let patterns = sources
                .iter()
                .map(|source| RegexBuilder::new(source).case_insensitive(true).build())
                .collect::<Result<Vec<_>, _>>()?;
            entries.push(IntentPatterns { intent, patterns });
        }
        Ok(PatternTable { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Demo {
        Open,
        Close,
    }

    impl Intent for Demo {
        fn as_str(&self) -> &'static str {
            match self {
                Demo::Open => "open",
                Demo::Close => "close",
            }
        }
    }

    #[test]
    fn test_builder_keeps_definition_order() {
        let table = PatternTable::builder()
            .intent(Demo::Close, &[r"close (.+)"])
            .intent(Demo::Open, &[r"open (.+)", r"launch (.+)"])
            .build()
            .unwrap();

        let order: Vec<Demo> = table.intents().collect();
        assert_eq!(order, vec![Demo::Close, Demo::Open]);
        assert_eq!(table.entries()[1].patterns.len(), 2);
    }

    #[test]
    fn test_repeated_intent_appends_patterns() {
        let table = PatternTable::builder()
            .intent(Demo::Open, &[r"open (.+)"])
            .intent(Demo::Open, &[r"start (.+)"])
            .build()
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].patterns.len(), 2);
    }

    #[test]
    fn test_patterns_are_case_insensitive() {
        let table = PatternTable::builder()
            .intent(Demo::Open, &[r"open (.+)"])
            .build()
            .unwrap();
        assert!(table.entries()[0].patterns[0].is_match("OPEN Firefox"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let result = PatternTable::builder().intent(Demo::Open, &[r"open (.+"]).build();
        assert!(result.is_err());
    }
}
