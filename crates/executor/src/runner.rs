//! The one seam every component uses to reach desktop utilities.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("'{0}' is not installed")]
    ToolMissing(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{program} failed: {message}")]
    Failed { program: String, message: String },
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("All mechanisms failed: {}", .0.join("; "))]
    AllFailed(Vec<String>),
}

pub type ExecResult<T> = Result<T, ExecutorError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// A program plus arguments. Detached invocations are spawned and not
/// awaited, which is how long-running GUI programs are started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub detached: bool,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            detached: false,
        }
    }

    pub fn detached<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            detached: true,
            ..Self::new(program, args)
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output. A non-zero exit is not an error
    /// at this level.
    async fn run(&self, program: &str, args: &[String]) -> ExecResult<CommandOutput>;

    /// Start without waiting for the child.
    async fn spawn(&self, program: &str, args: &[String]) -> ExecResult<()>;

    async fn exists(&self, program: &str) -> bool;

    /// Run and require a zero exit status, returning stdout.
    async fn run_checked(&self, program: &str, args: &[String]) -> ExecResult<String> {
        let output = self.run(program, args).await?;
        if output.success() {
            return Ok(output.stdout);
        }
        let message = match output.stderr.trim() {
            "" => match output.status {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            },
            stderr => stderr.to_string(),
        };
        Err(ExecutorError::Failed {
            program: program.to_string(),
            message,
        })
    }

    async fn invoke(&self, invocation: &Invocation) -> ExecResult<()> {
        if invocation.detached {
            self.spawn(&invocation.program, &invocation.args).await
        } else {
            self.run_checked(&invocation.program, &invocation.args)
                .await
                .map(|_| ())
        }
    }
}

/// Try each invocation in turn until one succeeds. Returns the invocation
/// that worked, or `AllFailed` naming every attempt.
pub async fn try_in_order(
    runner: &dyn CommandRunner,
    invocations: &[Invocation],
) -> ExecResult<Invocation> {
    let mut attempts = Vec::with_capacity(invocations.len());
    for invocation in invocations {
        match runner.invoke(invocation).await {
            Ok(()) => {
                tracing::debug!("Succeeded: {}", invocation);
                return Ok(invocation.clone());
            }
            Err(e) => {
                tracing::warn!("Mechanism failed, trying next: {}: {}", invocation, e);
                attempts.push(format!("{}: {}", invocation.program, e));
            }
        }
    }
    Err(ExecutorError::AllFailed(attempts))
}

/// Executes real processes through `tokio::process`.
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn spawn_error(program: &str, err: std::io::Error) -> ExecutorError {
        if err.kind() == ErrorKind::NotFound {
            ExecutorError::ToolMissing(program.to_string())
        } else {
            ExecutorError::Io(err)
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> ExecResult<CommandOutput> {
        tracing::debug!("Executing command: {} {:?}", program, args);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ExecutorError::Timeout {
                program: program.to_string(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| Self::spawn_error(program, e))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn spawn(&self, program: &str, args: &[String]) -> ExecResult<()> {
        tracing::debug!("Spawning: {} {:?}", program, args);
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Self::spawn_error(program, e))?;
        Ok(())
    }

    async fn exists(&self, program: &str) -> bool {
        Command::new("which")
            .arg(program)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Records invocations instead of executing them. Every command succeeds with
/// empty output unless a response was scripted for it, so the same type
/// serves `--dry-run` and tests.
#[derive(Default)]
pub struct DryRunRunner {
    invocations: Mutex<Vec<Invocation>>,
    responses: Mutex<HashMap<String, CommandOutput>>,
    missing: Mutex<HashSet<String>>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output for `key`, either a program name or a full command
    /// line such as `pactl get-sink-mute @DEFAULT_SINK@`.
    pub fn respond(&self, key: &str, output: CommandOutput) {
        self.responses.lock().insert(key.to_string(), output);
    }

    /// Pretend `program` is not installed.
    pub fn missing(&self, program: &str) {
        self.missing.lock().insert(program.to_string());
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    pub fn ran(&self, program: &str) -> bool {
        self.invocations.lock().iter().any(|i| i.program == program)
    }

    fn record(&self, invocation: Invocation) -> ExecResult<CommandOutput> {
        tracing::info!("[dry-run] {}", invocation);
        let line = invocation.to_string();
        let program = invocation.program.clone();
        self.invocations.lock().push(invocation);

        if self.missing.lock().contains(&program) {
            return Err(ExecutorError::ToolMissing(program));
        }
        let responses = self.responses.lock();
        Ok(responses
            .get(&line)
            .or_else(|| responses.get(&program))
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, program: &str, args: &[String]) -> ExecResult<CommandOutput> {
        self.record(Invocation::new(program, args.iter().cloned()))
    }

    async fn spawn(&self, program: &str, args: &[String]) -> ExecResult<()> {
        self.record(Invocation::detached(program, args.iter().cloned()))
            .map(|_| ())
    }

    async fn exists(&self, program: &str) -> bool {
        !self.missing.lock().contains(program)
    }
}
