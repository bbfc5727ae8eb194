pub mod component;
pub mod engine;
pub mod entities;
pub mod error;
pub mod format;
pub mod fuzzy;
pub mod history;
pub mod matcher;
pub mod metrics;
pub mod normalizer;
pub mod patterns;

pub use component::{Component, ComponentState, IntentHandler};
pub use engine::IntentEngine;
pub use entities::{Context, ContextRules, Entities};
pub use error::{ShellError, ShellResult};
pub use fuzzy::{FuzzyMatch, FuzzyOptions, MatchTier, TieBreak};
pub use history::{CommandHistory, HistoryEntry};
pub use matcher::{IntentMatch, IntentMatcher, MatchPolicy};
pub use metrics::{Metrics, MetricsSnapshot};
pub use normalizer::{FillerStyle, Normalizer};
pub use patterns::{Intent, PatternTable};
