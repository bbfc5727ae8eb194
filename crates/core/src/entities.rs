//! Per-command entities: captured groups plus keyword-derived context.

use std::collections::BTreeMap;

pub type Context = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entities {
    pub groups: Vec<Option<String>>,
    pub context: Context,
}

impl Entities {
    /// Capture group `index` (0-based over the pattern's groups), trimmed.
    /// Empty captures count as absent.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups
            .get(index)
            .and_then(|g| g.as_deref())
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    /// First non-empty capture group.
    pub fn target(&self) -> Option<&str> {
        (0..self.groups.len()).find_map(|i| self.group(i))
    }

    pub fn context(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    pub fn has_context(&self, key: &str, value: &str) -> bool {
        self.context(key) == Some(value)
    }
}

struct ContextRule {
    key: String,
    values: Vec<(String, Vec<String>)>,
}

/// Keyword categories scanned independently of the regex match. For each
/// category the first value with a keyword contained in the text is recorded.
#[derive(Default)]
pub struct ContextRules {
    rules: Vec<ContextRule>,
}

impl ContextRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, key: &str, values: &[(&str, &[&str])]) -> Self {
        self.rules.push(ContextRule {
            key: key.to_string(),
            values: values
                .iter()
                .map(|(value, keywords)| {
                    (
                        value.to_string(),
                        keywords.iter().map(|k| k.to_string()).collect(),
                    )
                })
                .collect(),
        });
        self
    }

    pub fn extract(&self, text: &str) -> Context {
        let mut context = Context::new();
        for rule in &self.rules {
            let hit = rule
                .values
                .iter()
                .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k.as_str())));
            if let Some((value, _)) = hit {
                context.insert(rule.key.clone(), value.clone());
            }
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_trims_and_skips_empty() {
        let entities = Entities {
            groups: vec![Some("  ".to_string()), None, Some(" notes.txt ".to_string())],
            context: Context::new(),
        };
        assert_eq!(entities.group(0), None);
        assert_eq!(entities.group(1), None);
        assert_eq!(entities.group(2), Some("notes.txt"));
        assert_eq!(entities.target(), Some("notes.txt"));
    }

    #[test]
    fn test_first_matching_value_wins_per_category() {
        let rules = ContextRules::new()
            .rule(
                "priority",
                &[
                    ("critical", &["critical", "emergency"]),
                    ("high", &["important", "asap"]),
                ],
            )
            .rule("direction", &[("left", &["left"]), ("right", &["right"])]);

        let context = rules.extract("important emergency on the right");
        assert_eq!(context.get("priority").map(String::as_str), Some("critical"));
        assert_eq!(context.get("direction").map(String::as_str), Some("right"));
    }

    #[test]
    fn test_no_keywords_yields_empty_context() {
        let rules = ContextRules::new().rule("urgency", &[("high", &["asap"])]);
        assert!(rules.extract("open firefox").is_empty());
    }
}
