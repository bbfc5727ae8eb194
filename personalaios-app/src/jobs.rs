//! Background jobs registered with the supervisor at startup.

use crate::events::ShellEvent;
use anyhow::Result;
use chrono::Local;
use personalaios_components::ComponentSuite;
use personalaios_core::Metrics;
use personalaios_executor::CommandRunner;
use personalaios_providers::{LanguageModel, LaunchPlan, LocalModelClient, ModelStatus};
use personalaios_tasks::{run_every, Supervisor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const MODEL_JOB: &str = "model-readiness";
pub const NOTIFICATION_JOB: &str = "notification-scheduler";
pub const SESSION_JOB: &str = "session-monitor";
pub const STATUS_JOB: &str = "status-refresh";

const NOTIFICATION_PERIOD: Duration = Duration::from_secs(1);
const SESSION_PERIOD: Duration = Duration::from_secs(5);
const STATUS_PERIOD: Duration = Duration::from_secs(30);

/// Deliver due scheduled notifications and dismiss stale ones.
pub async fn spawn_notification_scheduler(
    supervisor: &Supervisor,
    suite: &ComponentSuite,
    events: mpsc::Sender<ShellEvent>,
) -> Result<()> {
    let notifications = suite.notifications.clone();
    supervisor
        .spawn_job(NOTIFICATION_JOB, "Deliver scheduled notifications", move |cancel| async move {
            run_every(NOTIFICATION_JOB, NOTIFICATION_PERIOD, cancel, || {
                let notifications = notifications.clone();
                let events = events.clone();
                async move {
                    let delivered = notifications.tick(Local::now()).await;
                    if delivered > 0 {
                        let _ = events.send(ShellEvent::NotificationsDelivered(delivered)).await;
                    }
                    Ok(())
                }
            })
            .await;
            Ok(())
        })
        .await?;
    Ok(())
}

/// Restart failed components while their restart budget lasts.
pub async fn spawn_session_monitor(
    supervisor: &Supervisor,
    suite: &ComponentSuite,
    metrics: Arc<Metrics>,
    events: mpsc::Sender<ShellEvent>,
) -> Result<()> {
    let sessions = suite.sessions.clone();
    supervisor
        .spawn_job(SESSION_JOB, "Restart failed components", move |cancel| async move {
            run_every(SESSION_JOB, SESSION_PERIOD, cancel, || {
                let restarted = sessions.monitor_tick();
                let metrics = metrics.clone();
                let events = events.clone();
                async move {
                    if restarted.is_empty() {
                        return Ok(());
                    }
                    for key in &restarted {
                        tracing::info!(component = key, "component restarted by monitor");
                        metrics.inc_component_restarts();
                    }
                    let _ = events.send(ShellEvent::ComponentsRestarted(restarted)).await;
                    Ok(())
                }
            })
            .await;
            Ok(())
        })
        .await?;
    Ok(())
}

/// Sample the indicators periodically and surface new alerts.
pub async fn spawn_status_refresh(
    supervisor: &Supervisor,
    suite: &ComponentSuite,
    events: mpsc::Sender<ShellEvent>,
) -> Result<()> {
    let status = suite.status.clone();
    supervisor
        .spawn_job(STATUS_JOB, "Refresh system indicators", move |cancel| async move {
            run_every(STATUS_JOB, STATUS_PERIOD, cancel, || {
                let status = status.clone();
                let events = events.clone();
                async move {
                    for alert in status.refresh().await {
                        let _ = events.send(ShellEvent::Alert(alert)).await;
                    }
                    Ok(())
                }
            })
            .await;
            Ok(())
        })
        .await?;
    Ok(())
}

pub struct ModelJob {
    pub model: Arc<LocalModelClient>,
    pub runner: Arc<dyn CommandRunner>,
    /// Directory searched for a server binary and model when autostarting.
    pub engine_dir: PathBuf,
}

/// Optionally start a local engine, wait for it to come up, then keep
/// polling its health and report every change.
pub async fn spawn_model_readiness(
    supervisor: &Supervisor,
    job: ModelJob,
    events: mpsc::Sender<ShellEvent>,
) -> Result<()> {
    let ModelJob { model, runner, engine_dir } = job;
    supervisor
        .spawn_job(MODEL_JOB, "Wait for and watch the model server", move |cancel| async move {
            let settings = model.settings().clone();
            let _server = if settings.autostart {
                start_engine(&engine_dir, runner.as_ref()).await
            } else {
                None
            };

            let status = model
                .wait_until_ready(
                    settings.ready_attempts,
                    Duration::from_secs(settings.ready_interval_secs),
                    &cancel,
                )
                .await;
            if cancel.is_cancelled() {
                return Ok(());
            }
            let _ = events.send(ShellEvent::Model(status)).await;

            let period = Duration::from_secs(settings.health_poll_secs.max(1));
            run_every(MODEL_JOB, period, cancel, || {
                let model = model.clone();
                let events = events.clone();
                async move {
                    let was_ready = model.is_ready();
                    let status = model.check_readiness().await;
                    if (status == ModelStatus::Ready) != was_ready {
                        let _ = events.send(ShellEvent::Model(status)).await;
                    }
                    Ok(())
                }
            })
            .await;
            Ok(())
        })
        .await?;
    Ok(())
}

async fn start_engine(
    dir: &std::path::Path,
    runner: &dyn CommandRunner,
) -> Option<tokio::process::Child> {
    let Some(plan) = LaunchPlan::discover(dir, runner).await else {
        tracing::warn!("No local model engine found in {}", dir.display());
        return None;
    };
    match plan.launch() {
        Ok(child) => Some(child),
        Err(e) => {
            tracing::warn!("Could not start {}: {}", plan.engine(), e);
            None
        }
    }
}
