//! Optional autostart of a local llama.cpp server or llamafile.

use crate::traits::ProviderError;
use personalaios_executor::CommandRunner;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

const SERVER_CANDIDATES: &[&str] = &["llama.cpp/build/bin/llama-server", "build/bin/llama-server", "llama-server"];
const MODEL_EXTENSIONS: &[&str] = &["gguf", "bin"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPlan {
    LlamaServer { server: PathBuf, model: PathBuf },
    Llamafile { path: PathBuf },
}

impl LaunchPlan {
    /// Look for an engine under `dir`: a llama-server binary (in `dir` or on
    /// `PATH`) plus the first model file, otherwise a `*.llamafile`.
    pub async fn discover(dir: &Path, runner: &dyn CommandRunner) -> Option<Self> {
        let server = find_server(dir, runner).await;
        let model = first_with_extension(dir, MODEL_EXTENSIONS).await;
        if let (Some(server), Some(model)) = (server, model) {
            return Some(Self::LlamaServer { server, model });
        }
        first_with_extension(dir, &["llamafile"])
            .await
            .map(|path| Self::Llamafile { path })
    }

    pub fn engine(&self) -> &'static str {
        match self {
            Self::LlamaServer { .. } => "llama.cpp",
            Self::Llamafile { .. } => "llamafile",
        }
    }

    /// Program and arguments serving on 127.0.0.1:8080.
    pub fn command_line(&self) -> (PathBuf, Vec<String>) {
        let common = ["--host", "127.0.0.1", "--port", "8080", "--ctx-size", "2048"];
        match self {
            Self::LlamaServer { server, model } => {
                let mut args = vec!["--model".to_string(), model.to_string_lossy().to_string()];
                args.extend(common.iter().map(|s| s.to_string()));
                args.extend(
                    ["--threads", "2", "--batch-size", "256", "--no-warmup"].map(String::from),
                );
                (server.clone(), args)
            }
            Self::Llamafile { path } => {
                let mut args = vec!["--server".to_string()];
                args.extend(common.iter().map(|s| s.to_string()));
                args.extend(["--threads", "4", "--nobrowser", "--timeout", "300"].map(String::from));
                (path.clone(), args)
            }
        }
    }

    /// Start the engine. The child is killed when the handle is dropped.
    pub fn launch(&self) -> Result<Child, ProviderError> {
        let (program, args) = self.command_line();
        tracing::info!("Starting {} server: {:?}", self.engine(), program);
        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(parent) = program.parent().filter(|p| !p.as_os_str().is_empty()) {
            if matches!(self, Self::Llamafile { .. }) {
                command.current_dir(parent);
            }
        }
        command
            .spawn()
            .map_err(|e| ProviderError::Launch(format!("{}: {}", program.display(), e)))
    }
}

async fn find_server(dir: &Path, runner: &dyn CommandRunner) -> Option<PathBuf> {
    for candidate in SERVER_CANDIDATES {
        let path = dir.join(candidate);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Some(path);
        }
    }
    runner
        .exists("llama-server")
        .await
        .then(|| PathBuf::from("llama-server"))
}

/// First file in `dir` (sorted by name) with one of `extensions`.
async fn first_with_extension(dir: &Path, extensions: &[&str]) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut matches = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if let Some(rank) = extensions.iter().position(|wanted| *wanted == ext) {
            matches.push((rank, path));
        }
    }
    matches.sort();
    matches.into_iter().next().map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use personalaios_executor::DryRunRunner;

    #[tokio::test]
    async fn test_prefers_llama_server_with_model() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("phi.llamafile"), "").unwrap();
        std::fs::write(dir.path().join("b.gguf"), "").unwrap();
        std::fs::write(dir.path().join("a.bin"), "").unwrap();

        let runner = DryRunRunner::new();
        let plan = LaunchPlan::discover(dir.path(), &runner).await.unwrap();
        assert_eq!(
            plan,
            LaunchPlan::LlamaServer {
                server: PathBuf::from("llama-server"),
                model: dir.path().join("b.gguf"),
            }
        );
        let (_, args) = plan.command_line();
        assert!(args.windows(2).any(|w| w[0] == "--ctx-size" && w[1] == "2048"));
    }

    #[tokio::test]
    async fn test_falls_back_to_llamafile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("phi.llamafile"), "").unwrap();
        let runner = DryRunRunner::new();
        runner.missing("llama-server");

        let plan = LaunchPlan::discover(dir.path(), &runner).await.unwrap();
        assert_eq!(plan.engine(), "llamafile");
        let (_, args) = plan.command_line();
        assert_eq!(args[0], "--server");
    }

    #[tokio::test]
    async fn test_nothing_to_launch() {
        let dir = tempfile::tempdir().unwrap();
        let runner = DryRunRunner::new();
        runner.missing("llama-server");
        assert!(LaunchPlan::discover(dir.path(), &runner).await.is_none());
    }
}
