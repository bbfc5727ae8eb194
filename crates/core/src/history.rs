use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
pub const DEFAULT_HISTORY_TRIM: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub input: String,
    /// Intent or component the input resolved to.
    pub resolved: Option<String>,
    pub timestamp: i64,
}

/// Bounded command log. Once `capacity` is exceeded the oldest entries are
/// dropped until `trim_to` remain.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    trim_to: usize,
}

impl CommandHistory {
    pub fn new(capacity: usize, trim_to: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            trim_to: trim_to.min(capacity).max(1),
        }
    }

    pub fn record(&mut self, input: &str, resolved: Option<&str>) {
        self.entries.push_back(HistoryEntry {
            input: input.to_string(),
            resolved: resolved.map(str::to_string),
            timestamp: chrono::Utc::now().timestamp(),
        });
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.trim_to;
            self.entries.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn recent(&self, count: usize) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .take(count)
            .cloned()
            .collect()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, DEFAULT_HISTORY_TRIM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_to_newest_entries() {
        let mut history = CommandHistory::new(10, 5);
        for i in 0..11 {
            history.record(&format!("cmd {}", i), Some("launch"));
        }
        assert_eq!(history.len(), 5);
        let recent = history.recent(5);
        assert_eq!(recent[0].input, "cmd 10");
        assert_eq!(recent[4].input, "cmd 6");
    }

    #[test]
    fn test_records_unresolved_input() {
        let mut history = CommandHistory::default();
        history.record("gibberish", None);
        assert_eq!(history.recent(1)[0].resolved, None);
    }
}
