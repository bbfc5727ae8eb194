//! Supervision of long-running background jobs.
//!
//! Every job receives its own [`CancellationToken`], a child of the
//! supervisor's root token, so a single job can be stopped or the whole set
//! shut down together.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Job not found: {0}")]
    NotFound(String),
    #[error("Job already running: {0}")]
    AlreadyRunning(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub name: String,
    pub description: String,
    pub status: JobStatus,
    pub started_at: i64,
    pub updated_at: i64,
    pub error: Option<String>,
}

struct JobHandle {
    info: JobInfo,
    cancel: CancellationToken,
    handle: Option<JoinHandle<Result<(), String>>>,
}

impl JobHandle {
    /// Collect the result of a finished task into `info`.
    async fn reap(&mut self) {
        let finished = self.handle.as_ref().map(|h| h.is_finished()).unwrap_or(false);
        if !finished {
            return;
        }
        let Some(handle) = self.handle.take() else {
            return;
        };
        let (status, error) = match handle.await {
            Ok(Ok(())) if self.cancel.is_cancelled() => (JobStatus::Cancelled, None),
            Ok(Ok(())) => (JobStatus::Completed, None),
            Ok(Err(error)) => (JobStatus::Failed, Some(error)),
            Err(e) if e.is_cancelled() => (JobStatus::Cancelled, None),
            Err(e) => (JobStatus::Failed, Some(e.to_string())),
        };
        if let Some(error) = &error {
            tracing::warn!("Job {} failed: {}", self.info.name, error);
        }
        self.info.status = status;
        self.info.error = error;
        self.info.updated_at = chrono::Utc::now().timestamp();
    }
}

pub struct Supervisor {
    jobs: Arc<RwLock<HashMap<String, Arc<Mutex<JobHandle>>>>>,
    root: CancellationToken,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            root: CancellationToken::new(),
        }
    }

    /// Token cancelled by [`Supervisor::shutdown`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Spawn `job` under `name`. A finished job with the same name is replaced.
    pub async fn spawn_job<F, Fut>(
        &self,
        name: &str,
        description: &str,
        job: F,
    ) -> Result<CancellationToken, TaskError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let mut jobs = self.jobs.write().await;
        if let Some(existing) = jobs.get(name) {
            let mut guard = existing.lock().await;
            guard.reap().await;
            if guard.info.status == JobStatus::Running {
                return Err(TaskError::AlreadyRunning(name.to_string()));
            }
        }

        let cancel = self.root.child_token();
        let now = chrono::Utc::now().timestamp();
        let handle = tokio::spawn(job(cancel.clone()));

        jobs.insert(
            name.to_string(),
            Arc::new(Mutex::new(JobHandle {
                info: JobInfo {
                    name: name.to_string(),
                    description: description.to_string(),
                    status: JobStatus::Running,
                    started_at: now,
                    updated_at: now,
                    error: None,
                },
                cancel: cancel.clone(),
                handle: Some(handle),
            })),
        );

        tracing::info!("Spawned job: {}", name);
        Ok(cancel)
    }

    pub async fn status(&self, name: &str) -> Result<JobInfo, TaskError> {
        let jobs = self.jobs.read().await;
        let job = jobs
            .get(name)
            .ok_or_else(|| TaskError::NotFound(name.to_string()))?;
        let mut guard = job.lock().await;
        guard.reap().await;
        Ok(guard.info.clone())
    }

    /// All jobs, sorted by name.
    pub async fn list(&self) -> Vec<JobInfo> {
        let jobs = self.jobs.read().await;
        let mut result = Vec::with_capacity(jobs.len());
        for job in jobs.values() {
            let mut guard = job.lock().await;
            guard.reap().await;
            result.push(guard.info.clone());
        }
        result.sort_by(|a, b| a.name.cmp(&b.name));
        result
    }

    /// Signal the job's token and wait up to `grace` before aborting it.
    pub async fn cancel(&self, name: &str, grace: Duration) -> Result<(), TaskError> {
        let jobs = self.jobs.read().await;
        let job = jobs
            .get(name)
            .ok_or_else(|| TaskError::NotFound(name.to_string()))?;
        let mut guard = job.lock().await;
        stop(&mut guard, grace).await;
        tracing::info!("Cancelled job: {}", name);
        Ok(())
    }

    /// Cancel every job and wait for them to wind down.
    pub async fn shutdown(&self, grace: Duration) {
        self.root.cancel();
        let jobs = self.jobs.read().await;
        for job in jobs.values() {
            let mut guard = job.lock().await;
            stop(&mut guard, grace).await;
        }
        tracing::info!("Supervisor shut down {} job(s)", jobs.len());
    }
}

async fn stop(job: &mut JobHandle, grace: Duration) {
    job.cancel.cancel();
    if let Some(mut handle) = job.handle.take() {
        if tokio::time::timeout(grace, &mut handle).await.is_err() {
            tracing::warn!("Job {} ignored cancellation, aborting", job.info.name);
            handle.abort();
        }
    }
    if job.info.status == JobStatus::Running {
        job.info.status = JobStatus::Cancelled;
        job.info.updated_at = chrono::Utc::now().timestamp();
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `tick` every `period` until `cancel` fires. Errors are logged and the
/// loop continues.
pub async fn run_every<F, Fut>(name: &str, period: Duration, cancel: CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = tick().await {
                    tracing::warn!("{} cycle failed: {}", name, e);
                }
            }
            _ = cancel.cancelled() => {
                tracing::debug!("{} stopping", name);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_spawn_and_complete() {
        let supervisor = Supervisor::new();
        supervisor
            .spawn_job("quick", "Quick job", |_| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let info = supervisor.status("quick").await.unwrap();
        assert_eq!(info.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_failed_job_keeps_error() {
        let supervisor = Supervisor::new();
        supervisor
            .spawn_job("broken", "Broken job", |_| async { Err("boom".to_string()) })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let info = supervisor.status("broken").await.unwrap();
        assert_eq!(info.status, JobStatus::Failed);
        assert_eq!(info.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_duplicate_running_job_is_rejected() {
        let supervisor = Supervisor::new();
        let long = |cancel: CancellationToken| async move {
            cancel.cancelled().await;
            Ok(())
        };
        supervisor.spawn_job("poller", "Poller", long).await.unwrap();
        let second = supervisor.spawn_job("poller", "Poller", long).await;
        assert!(matches!(second, Err(TaskError::AlreadyRunning(_))));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_periodic_job() {
        let supervisor = Supervisor::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        supervisor
            .spawn_job("ticker", "Ticker", move |cancel| async move {
                run_every("ticker", Duration::from_millis(5), cancel, || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
                .await;
                Ok(())
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        supervisor
            .cancel("ticker", Duration::from_secs(1))
            .await
            .unwrap();

        let info = supervisor.status("ticker").await.unwrap();
        assert_eq!(info.status, JobStatus::Cancelled);
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_everything() {
        let supervisor = Supervisor::new();
        for name in ["a", "b"] {
            supervisor
                .spawn_job(name, name, |cancel| async move {
                    cancel.cancelled().await;
                    Ok(())
                })
                .await
                .unwrap();
        }
        supervisor.shutdown(Duration::from_secs(1)).await;
        assert!(supervisor.shutdown_token().is_cancelled());
        assert!(supervisor
            .list()
            .await
            .iter()
            .all(|job| job.status == JobStatus::Cancelled));
    }
}
