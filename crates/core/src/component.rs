//! The contract between the router and the components.

use crate::engine::IntentEngine;
use crate::error::ShellResult;
use crate::matcher::IntentMatch;
use crate::patterns::Intent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Object-safe surface the router dispatches to.
#[async_trait]
pub trait Component: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handle one utterance. Always produces display text.
    async fn process_command(&self, raw: &str) -> String;
}

/// A component built on an [`IntentEngine`]. Implementors provide the
/// intent handlers; matching, help fallback and error rendering are shared.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    type Intent: Intent;

    /// Route name, e.g. `files`.
    const NAME: &'static str;
    /// Human name used in rendered errors, e.g. `file manager`.
    const TITLE: &'static str;

    fn engine(&self) -> &IntentEngine<Self::Intent>;

    async fn execute(&self, matched: &IntentMatch<Self::Intent>, raw: &str) -> ShellResult<String>;

    /// Reply for input that matched no intent.
    fn help(&self, raw: &str) -> String;

    /// `None` when no intent matched.
    async fn dispatch(&self, raw: &str) -> Option<ShellResult<String>> {
        let matched = self.engine().resolve(raw)?;
        Some(self.execute(&matched, raw).await)
    }
}

#[async_trait]
impl<H: IntentHandler> Component for H {
    fn name(&self) -> &'static str {
        H::NAME
    }

    async fn process_command(&self, raw: &str) -> String {
        match self.dispatch(raw).await {
            None => self.help(raw),
            Some(Ok(reply)) => reply,
            Some(Err(err)) => {
                tracing::warn!(component = H::NAME, error = %err, "command failed");
                err.render(H::TITLE)
            }
        }
    }
}

/// Lifecycle of a supervised component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    #[default]
    Inactive,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl ComponentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentState::Inactive => "inactive",
            ComponentState::Starting => "starting",
            ComponentState::Running => "running",
            ComponentState::Stopping => "stopping",
            ComponentState::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ContextRules;
    use crate::error::ShellError;
    use crate::normalizer::Normalizer;
    use crate::patterns::PatternTable;
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum EchoIntent {
        Echo,
        Fail,
    }

    impl Intent for EchoIntent {
        fn as_str(&self) -> &'static str {
            match self {
                EchoIntent::Echo => "echo",
                EchoIntent::Fail => "fail",
            }
        }
    }

    struct Echo {
        engine: IntentEngine<EchoIntent>,
    }

    impl Echo {
        fn new() -> Self {
            let table = PatternTable::builder()
                .intent(EchoIntent::Echo, &[r"echo\s+(.+)"])
                .intent(EchoIntent::Fail, &[r"missing\s+(.+)"])
                .build()
                .unwrap();
            Self {
                engine: IntentEngine::new(
                    Normalizer::standard().unwrap(),
                    table,
                    ContextRules::new(),
                ),
            }
        }
    }

    #[async_trait]
    impl IntentHandler for Echo {
        type Intent = EchoIntent;
        const NAME: &'static str = "echo";
        const TITLE: &'static str = "echo service";

        fn engine(&self) -> &IntentEngine<EchoIntent> {
            &self.engine
        }

        async fn execute(
            &self,
            matched: &IntentMatch<EchoIntent>,
            _raw: &str,
        ) -> ShellResult<String> {
            let target = matched.entities.target().unwrap_or_default().to_string();
            match matched.intent {
                EchoIntent::Echo => Ok(target),
                EchoIntent::Fail => Err(ShellError::not_found("thing", target)),
            }
        }

        fn help(&self, raw: &str) -> String {
            format!("help: '{}'", raw.trim())
        }
    }

    #[tokio::test]
    async fn test_process_command_paths() {
        let component: Arc<dyn Component> = Arc::new(Echo::new());
        assert_eq!(component.name(), "echo");
        assert_eq!(component.process_command("please echo hi").await, "hi");
        assert_eq!(component.process_command("   ").await, "help: ''");
        assert_eq!(
            component.process_command("missing widget").await,
            "🔍 **Thing not found:** 'widget'"
        );
    }

    #[tokio::test]
    async fn test_dispatch_exposes_typed_error() {
        let echo = Echo::new();
        let result = echo.dispatch("missing widget").await.unwrap();
        assert!(result.unwrap_err().is_not_found());
        assert!(echo.dispatch("nothing here").await.is_none());
    }
}
