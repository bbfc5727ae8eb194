//! Startup: build the runner, the component suite, the router and the model
//! client from a validated configuration.

use crate::config::Config;
use crate::events::ShellEvent;
use crate::jobs::{self, ModelJob};
use crate::repl::{ExitReason, Repl};
use crate::router::{CommandRouter, RouteTable};
use anyhow::{Context, Result};
use personalaios_components::{ComponentSuite, SuiteOptions};
use personalaios_core::Metrics;
use personalaios_executor::{CommandRunner, DryRunRunner, SystemRunner};
use personalaios_interfaces::Interface;
use personalaios_memory::StorageLayout;
use personalaios_providers::LocalModelClient;
use personalaios_tasks::Supervisor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);
const EVENT_BUFFER: usize = 64;

pub struct Shell {
    pub config: Config,
    pub layout: StorageLayout,
    pub suite: ComponentSuite,
    pub router: Arc<CommandRouter>,
    pub model: Arc<LocalModelClient>,
    pub supervisor: Arc<Supervisor>,
    pub metrics: Arc<Metrics>,
    runner: Arc<dyn CommandRunner>,
}

impl Shell {
    pub async fn build(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let layout = config.layout();
        let runner: Arc<dyn CommandRunner> = if config.dry_run {
            tracing::info!("Dry run: desktop commands are recorded, not executed");
            Arc::new(DryRunRunner::new())
        } else {
            Arc::new(SystemRunner::new(config.command_timeout()))
        };

        let options = SuiteOptions {
            files_root: config.files_root(),
            policy: config.match_policy,
            ..SuiteOptions::default()
        };
        let suite = ComponentSuite::build(runner.clone(), &layout, options)
            .await
            .context("Failed to initialize components")?;
        let started = suite
            .sessions
            .start_all()
            .context("Session failed to start")?;
        tracing::info!("Started {} session components", started.len());

        let metrics = Metrics::new();
        let model = Arc::new(LocalModelClient::new(config.model.clone()));
        let table = RouteTable::standard().context("Invalid route table")?;
        let router = CommandRouter::new(table, suite.registry(), metrics.clone())
            .with_sessions(suite.sessions.clone())
            .with_model(model.clone())
            .with_dispatch_timeout(config.dispatch_timeout());

        Ok(Self {
            config,
            layout,
            suite,
            router: Arc::new(router),
            model,
            supervisor: Arc::new(Supervisor::new()),
            metrics,
            runner,
        })
    }

    /// Register every background job. Their events arrive on the returned
    /// receiver.
    pub async fn start_background(&self) -> Result<mpsc::Receiver<ShellEvent>> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let engine_dir = std::env::current_dir().context("Cannot read working directory")?;

        jobs::spawn_model_readiness(
            &self.supervisor,
            ModelJob {
                model: self.model.clone(),
                runner: self.runner.clone(),
                engine_dir,
            },
            tx.clone(),
        )
        .await?;
        jobs::spawn_notification_scheduler(&self.supervisor, &self.suite, tx.clone()).await?;
        jobs::spawn_session_monitor(
            &self.supervisor,
            &self.suite,
            self.metrics.clone(),
            tx.clone(),
        )
        .await?;
        jobs::spawn_status_refresh(&self.supervisor, &self.suite, tx).await?;
        for _ in 0..4 {
            self.metrics.inc_tasks_spawned();
        }
        Ok(rx)
    }

    pub fn repl(&self) -> Repl {
        Repl::new(self.router.clone(), self.supervisor.clone())
            .with_status(self.suite.status.clone())
            .with_sessions(self.suite.sessions.clone())
    }

    /// Start the background jobs, run the REPL on `ui` until the user leaves,
    /// then shut everything down.
    pub async fn run(&self, ui: &dyn Interface) -> Result<ExitReason> {
        let events = self.start_background().await?;
        let reason = self.repl().with_events(events).run(ui).await;
        self.shutdown().await;
        Ok(reason)
    }

    pub async fn shutdown(&self) {
        self.supervisor.shutdown(SHUTDOWN_GRACE).await;
        if let Err(e) = self.suite.sessions.save().await {
            tracing::warn!("Could not save session: {}", e);
        }
        if let Err(e) = self.suite.sessions.release().await {
            tracing::warn!("Could not release session lock: {}", e);
        }
        tracing::info!("Shell stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Target;

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            data_dir: Some(dir.join("data")),
            files_root: Some(dir.to_path_buf()),
            dry_run: true,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.dispatch_timeout_secs = 0;
        assert!(Shell::build(config).await.is_err());
    }

    #[tokio::test]
    async fn test_build_routes_to_components() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Shell::build(test_config(dir.path())).await.unwrap();

        let routed = shell.router.handle("create a file named notes.txt", None).await;
        assert_eq!(routed.target, Target::Component("files"));
        assert!(routed.reply.contains("Created file"));
        assert!(dir.path().join("notes.txt").exists());

        shell.shutdown().await;
        assert!(!shell.layout.file("session", "session.lock").exists());
    }
}
