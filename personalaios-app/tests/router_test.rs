use async_trait::async_trait;
use personalaios_app::router::{CommandRouter, RouteTable, Target, MODEL_NOT_READY};
use personalaios_components::{ComponentRegistry, SessionManager};
use personalaios_core::{CommandHistory, Component, MatchPolicy, Metrics};
use personalaios_executor::{DryRunRunner, SystemControl};
use personalaios_memory::StorageLayout;
use personalaios_providers::{LanguageModel, ProviderError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Echo(&'static str);

#[async_trait]
impl Component for Echo {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn process_command(&self, raw: &str) -> String {
        format!("{} handled: {}", self.0, raw)
    }
}

struct Crashing;

#[async_trait]
impl Component for Crashing {
    fn name(&self) -> &'static str {
        "files"
    }

    async fn process_command(&self, _raw: &str) -> String {
        panic!("disk on fire")
    }
}

struct Stuck;

#[async_trait]
impl Component for Stuck {
    fn name(&self) -> &'static str {
        "windows"
    }

    async fn process_command(&self, _raw: &str) -> String {
        tokio::time::sleep(Duration::from_secs(60)).await;
        String::new()
    }
}

struct FakeModel {
    ready: bool,
    reply: Result<Vec<&'static str>, u16>,
}

#[async_trait]
impl LanguageModel for FakeModel {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn complete(
        &self,
        _prompt: &str,
        deltas: Option<mpsc::Sender<String>>,
    ) -> Result<String, ProviderError> {
        let parts = self.reply.clone().map_err(ProviderError::Server)?;
        for part in &parts {
            if let Some(tx) = &deltas {
                let _ = tx.send(part.to_string()).await;
            }
        }
        Ok(parts.concat())
    }
}

fn registry(components: Vec<Arc<dyn Component>>) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    for component in components {
        registry.register(component);
    }
    registry
}

fn router(components: Vec<Arc<dyn Component>>) -> CommandRouter {
    CommandRouter::new(RouteTable::standard().unwrap(), registry(components), Metrics::new())
}

#[tokio::test]
async fn test_routes_to_highest_scoring_component() {
    let router = router(vec![
        Arc::new(Echo("files")),
        Arc::new(Echo("windows")),
        Arc::new(Echo("workspaces")),
    ]);

    let routed = router.handle("  move window to workspace 3 ", None).await;
    assert_eq!(routed.target, Target::Component("workspaces"));
    assert_eq!(routed.reply, "workspaces handled: move window to workspace 3");

    let routed = router.handle("delete the old folder", None).await;
    assert_eq!(routed.target, Target::Component("files"));
    assert_eq!(router.metrics().snapshot().commands_routed, 2);
}

#[tokio::test]
async fn test_unregistered_route_falls_through_to_model() {
    // Only files is registered, so a settings phrase is unrouted.
    let router = router(vec![Arc::new(Echo("files"))]);
    let routed = router.handle("set theme to dark", None).await;
    assert_eq!(routed.target, Target::ModelUnavailable);
    assert_eq!(routed.reply, MODEL_NOT_READY);
    assert_eq!(router.metrics().snapshot().commands_unrouted, 1);
}

#[tokio::test]
async fn test_model_not_ready() {
    let router = router(vec![]).with_model(Arc::new(FakeModel {
        ready: false,
        reply: Ok(vec!["never"]),
    }));
    let routed = router.handle("tell me a joke", None).await;
    assert_eq!(routed.reply, "**AI Engine not ready.** Please wait for initialization.");
    assert_eq!(router.metrics().snapshot().llm_requests, 0);
}

#[tokio::test]
async fn test_model_reply_streams() {
    let router = router(vec![]).with_model(Arc::new(FakeModel {
        ready: true,
        reply: Ok(vec!["Paris ", "is the capital."]),
    }));

    let (tx, mut rx) = mpsc::channel(8);
    let routed = router.handle("what is the capital of france", Some(tx)).await;
    assert_eq!(routed.target, Target::Model);
    assert!(routed.streamed);
    assert_eq!(routed.reply, "Paris is the capital.");

    let mut fragments = Vec::new();
    while let Some(fragment) = rx.recv().await {
        fragments.push(fragment);
    }
    assert_eq!(fragments, vec!["Paris ", "is the capital."]);
    assert_eq!(router.metrics().snapshot().llm_requests, 1);
}

#[tokio::test]
async fn test_model_failure_is_rendered() {
    let router = router(vec![]).with_model(Arc::new(FakeModel {
        ready: true,
        reply: Err(503),
    }));
    let routed = router.handle("hello there", None).await;
    assert_eq!(routed.reply, "❌ **AI Error:** Server error: 503");
    assert!(!routed.streamed);
    assert_eq!(router.metrics().snapshot().llm_failures, 1);
}

#[tokio::test]
async fn test_panicking_component_is_contained_and_marked_failed() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = Arc::new(
        SessionManager::new(
            SystemControl::new(Arc::new(DryRunRunner::new())),
            &StorageLayout::new(dir.path()),
            MatchPolicy::default(),
        )
        .await
        .unwrap(),
    );
    sessions.start_all().unwrap();

    let router = router(vec![Arc::new(Crashing)]).with_sessions(sessions.clone());
    let routed = router.handle("create a file named a.txt", None).await;

    assert_eq!(routed.target, Target::Component("files"));
    assert!(routed.reply.starts_with("❌ **Component Error:**"), "{}", routed.reply);
    assert!(routed.reply.contains("disk on fire"));
    assert_eq!(router.metrics().snapshot().dispatch_failures, 1);

    let record = sessions.component("file_manager").unwrap();
    assert_eq!(record.state, personalaios_core::ComponentState::Failed);

    // The monitor brings it back.
    assert_eq!(sessions.monitor_tick(), vec!["file_manager"]);
}

#[tokio::test]
async fn test_slow_component_times_out() {
    let router = router(vec![Arc::new(Stuck)]).with_dispatch_timeout(Duration::from_millis(50));
    let routed = router.handle("maximize the window", None).await;
    assert_eq!(
        routed.reply,
        "❌ **Component Error:** windows did not respond within 0s"
    );
    assert_eq!(router.metrics().snapshot().dispatch_failures, 1);
}

#[tokio::test]
async fn test_history_is_bounded() {
    let router = router(vec![Arc::new(Echo("files"))]).with_history(CommandHistory::new(10, 5));
    for i in 0..11 {
        router.handle(&format!("find file {}", i), None).await;
    }
    assert_eq!(router.history_len(), 5);

    let recent = router.recent(1);
    assert_eq!(recent[0].input, "find file 10");
    assert_eq!(recent[0].resolved.as_deref(), Some("files"));
}
