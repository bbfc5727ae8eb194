use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Server error: {0}")]
    Server(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("No response within {0}s")]
    Timeout(u64),
    #[error("Circuit breaker open: model server unavailable")]
    CircuitOpen,
    #[error("Server launch failed: {0}")]
    Launch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Ready,
    Unavailable,
}

/// Conversational fallback for input no component claims.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Last known readiness.
    fn is_ready(&self) -> bool;

    /// Generate a reply, forwarding text deltas to `deltas` as they arrive.
    /// Returns the accumulated reply.
    async fn complete(
        &self,
        prompt: &str,
        deltas: Option<mpsc::Sender<String>>,
    ) -> Result<String, ProviderError>;
}
