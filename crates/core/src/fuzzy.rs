//! Shared fuzzy lookup of named records.
//!
//! Resolution runs four tiers and stops at the first that produces a hit:
//! exact name, case-insensitive name, substring in either direction, and
//! character-set similarity at or above a threshold.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact,
    CaseInsensitive,
    Substring,
    Similarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// First record in iteration order that qualifies for the tier.
    FirstQualifying,
    /// Highest-scoring record in the tier, earliest on ties.
    BestScore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyOptions {
    pub threshold: f64,
    pub tie_break: TieBreak,
}

impl FuzzyOptions {
    pub const fn new(threshold: f64, tie_break: TieBreak) -> Self {
        Self {
            threshold,
            tie_break,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch<T> {
    pub item: T,
    pub tier: MatchTier,
    pub score: f64,
}

/// Jaccard index of the lowercase character sets of `a` and `b`.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let left: HashSet<char> = a.to_lowercase().chars().collect();
    let right: HashSet<char> = b.to_lowercase().chars().collect();
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f64 / union as f64
}

/// 1.0 for equal names, 0.8 when one contains the other, Jaccard otherwise.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        1.0
    } else if !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a)) {
        0.8
    } else {
        jaccard(&a, &b)
    }
}

/// Length of the shorter name over the longer, counted in characters.
fn overlap_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = (a.chars().count(), b.chars().count());
    a.min(b) as f64 / a.max(b) as f64
}

pub fn resolve<T, I, F>(
    query: &str,
    items: I,
    key: F,
    options: FuzzyOptions,
) -> Option<FuzzyMatch<T>>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> &str,
{
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    let items: Vec<T> = items.into_iter().collect();
    let query_lower = query.to_lowercase();

    if let Some(index) = items.iter().position(|item| key(item) == query) {
        return take(items, index, MatchTier::Exact, 1.0);
    }

    if let Some(index) = items
        .iter()
        .position(|item| key(item).to_lowercase() == query_lower)
    {
        return take(items, index, MatchTier::CaseInsensitive, 1.0);
    }

    let substring_hits = items.iter().enumerate().filter_map(|(index, item)| {
        let name = key(item).to_lowercase();
        if name.is_empty() {
            return None;
        }
        if name.contains(&query_lower) || query_lower.contains(&name) {
            Some((index, overlap_ratio(&name, &query_lower)))
        } else {
            None
        }
    });
    if let Some((index, score)) = pick(substring_hits, options.tie_break) {
        return take(items, index, MatchTier::Substring, score);
    }

    let similar = items.iter().enumerate().filter_map(|(index, item)| {
        let score = jaccard(key(item), &query_lower);
        (score >= options.threshold).then_some((index, score))
    });
    let (index, score) = pick(similar, options.tie_break)?;
    take(items, index, MatchTier::Similarity, score)
}

/// Names scoring above `floor` on [`name_similarity`], best first.
pub fn suggest<T, I, F>(query: &str, items: I, key: F, floor: f64, limit: usize) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> &str,
{
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(f64, T)> = items
        .into_iter()
        .filter_map(|item| {
            let score = name_similarity(key(&item), query);
            (score > floor).then_some((score, item))
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(limit).map(|(_, item)| item).collect()
}

fn pick(mut hits: impl Iterator<Item = (usize, f64)>, tie_break: TieBreak) -> Option<(usize, f64)> {
    match tie_break {
        TieBreak::FirstQualifying => hits.next(),
        TieBreak::BestScore => hits.fold(None, |best, hit| match best {
            Some(current) if current.1 >= hit.1 => Some(current),
            _ => Some(hit),
        }),
    }
}

fn take<T>(items: Vec<T>, index: usize, tier: MatchTier, score: f64) -> Option<FuzzyMatch<T>> {
    items
        .into_iter()
        .nth(index)
        .map(|item| FuzzyMatch { item, tier, score })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[&str] = &["notes_old.txt", "notes.txt", "Notes.md", "report.pdf"];

    fn find(query: &str, options: FuzzyOptions) -> Option<FuzzyMatch<&'static str>> {
        resolve(query, NAMES.iter().copied(), |n| *n, options)
    }

    #[test]
    fn test_exact_beats_substring() {
        let hit = find("notes.txt", FuzzyOptions::new(0.4, TieBreak::FirstQualifying)).unwrap();
        assert_eq!(hit.item, "notes.txt");
        assert_eq!(hit.tier, MatchTier::Exact);
    }

    #[test]
    fn test_case_insensitive_tier() {
        let hit = find("NOTES.MD", FuzzyOptions::new(0.4, TieBreak::FirstQualifying)).unwrap();
        assert_eq!(hit.item, "Notes.md");
        assert_eq!(hit.tier, MatchTier::CaseInsensitive);
    }

    #[test]
    fn test_substring_tie_break_policies() {
        let first = find("notes", FuzzyOptions::new(0.4, TieBreak::FirstQualifying)).unwrap();
        assert_eq!(first.item, "notes_old.txt");
        assert_eq!(first.tier, MatchTier::Substring);

        let best = find("notes", FuzzyOptions::new(0.4, TieBreak::BestScore)).unwrap();
        assert_eq!(best.tier, MatchTier::Substring);
        assert_eq!(best.item, "Notes.md");
        assert!((best.score - 5.0 / 8.0).abs() < 1e-9);

        let best = find("notes.t", FuzzyOptions::new(0.4, TieBreak::BestScore)).unwrap();
        assert_eq!(best.item, "notes.txt");
    }

    #[test]
    fn test_substring_score_is_overlap_ratio() {
        assert!((overlap_ratio("fire", "firefox") - 4.0 / 7.0).abs() < 1e-9);
        assert_eq!(overlap_ratio("é", "é"), 1.0);
        let hit = resolve(
            "term",
            ["gnome-terminal", "terminal", "xterm"],
            |n| *n,
            FuzzyOptions::new(0.4, TieBreak::BestScore),
        )
        .unwrap();
        assert_eq!(hit.item, "xterm");
    }

    #[test]
    fn test_similarity_threshold() {
        let hit = find("reprot", FuzzyOptions::new(0.6, TieBreak::BestScore)).unwrap();
        assert_eq!(hit.item, "report.pdf");
        assert_eq!(hit.tier, MatchTier::Similarity);

        assert!(find("xyz", FuzzyOptions::new(0.6, TieBreak::BestScore)).is_none());
    }

    #[test]
    fn test_empty_query_never_resolves() {
        assert!(find("  ", FuzzyOptions::new(0.0, TieBreak::BestScore)).is_none());
    }

    #[test]
    fn test_similarity_helpers() {
        assert_eq!(name_similarity("Firefox", "firefox"), 1.0);
        assert_eq!(name_similarity("fire", "firefox"), 0.8);
        assert!((jaccard("abc", "abd") - 0.5).abs() < 1e-9);
        assert_eq!(jaccard("", ""), 1.0);
    }

    #[test]
    fn test_suggest_orders_by_score() {
        let suggestions = suggest("note", NAMES.iter().copied(), |n| *n, 0.4, 3);
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions.iter().all(|s| s.to_lowercase().contains("note")));
        assert!(!suggestions.contains(&"report.pdf"));
    }
}
