//! Input normalization applied before intent matching.

use regex::{Regex, RegexBuilder};
use std::borrow::Cow;

/// Filler phrases removed by most components.
pub const DEFAULT_FILLERS: &[&str] = &["please", "can you", "would you", "could you"];

/// How filler phrases are located in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillerStyle {
    /// Only whole words are removed (`\bplease\b`).
    WordBoundary,
    /// Any occurrence is removed, including inside longer words.
    Substring,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    filler: Option<Regex>,
}

impl Normalizer {
    pub fn new(fillers: &[&str], style: FillerStyle) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = fillers
            .iter()
            .map(|phrase| {
                phrase
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .filter(|alt| !alt.is_empty())
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { filler: None });
        }

        let joined = alternatives.join("|");
        let pattern = match style {
            FillerStyle::WordBoundary => format!(r"\b(?:{})\b", joined),
            FillerStyle::Substring => format!("(?:{})", joined),
        };
        let filler = RegexBuilder::new(&pattern).case_insensitive(true).build()?;
        Ok(Self {
            filler: Some(filler),
        })
    }

    /// Word-bounded removal of [`DEFAULT_FILLERS`].
    pub fn standard() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_FILLERS, FillerStyle::WordBoundary)
    }

    pub fn normalize(&self, text: &str) -> String {
        let stripped = match &self.filler {
            Some(filler) => filler.replace_all(text, " "),
            None => Cow::Borrowed(text),
        };
        stripped
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fillers_and_collapses_whitespace() {
        let normalizer = Normalizer::standard().unwrap();
        assert_eq!(
            normalizer.normalize("  Could   you PLEASE open   Firefox "),
            "open firefox"
        );
    }

    #[test]
    fn test_empty_input() {
        let normalizer = Normalizer::standard().unwrap();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("   \t \n"), "");
    }

    #[test]
    fn test_word_boundary_keeps_embedded_words() {
        let normalizer = Normalizer::standard().unwrap();
        assert_eq!(normalizer.normalize("pleased to meet you"), "pleased to meet you");
    }

    #[test]
    fn test_substring_style_removes_inside_words() {
        let normalizer = Normalizer::new(&["please"], FillerStyle::Substring).unwrap();
        assert_eq!(normalizer.normalize("pleased"), "d");
    }

    #[test]
    fn test_multiword_filler_tolerates_extra_spaces() {
        let normalizer = Normalizer::new(&["i want to"], FillerStyle::WordBoundary).unwrap();
        assert_eq!(normalizer.normalize("I  want\tto open files"), "open files");
    }

    #[test]
    fn test_no_fillers_only_lowercases() {
        let normalizer = Normalizer::new(&[], FillerStyle::WordBoundary).unwrap();
        assert_eq!(normalizer.normalize("Please Stay"), "please stay");
    }
}
