use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use personalaios_app::commands::{self, config::ConfigCommand};
use personalaios_app::{Config, ExitReason, Shell};
use personalaios_interfaces::TerminalInterface;
use std::path::PathBuf;

/// Natural-language desktop shell
#[derive(Parser)]
#[command(name = "personalaios")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, env = "PERSONALAIOS_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Record desktop commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive shell (default)
    Repl,
    /// Handle one command and print the reply
    Run {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Check configuration, storage and the model endpoint
    Health,
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(Config::default_path);

    let mut config = Config::load_or_default(&path)?;
    if cli.dry_run {
        config.dry_run = true;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_logging(&config.log_level)?;

    match cli.command {
        None | Some(Commands::Repl) => {
            let shell = Shell::build(config).await?;
            let reason = shell.run(&TerminalInterface::new()).await?;
            tracing::info!("REPL ended: {:?}", reason);
            if reason == ExitReason::Shutdown {
                println!("System power-off requested.");
            }
            Ok(())
        }
        Some(Commands::Run { text }) => commands::run::run(config, &text.join(" ")).await,
        Some(Commands::Health) => commands::health::run(&config).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, &path, &config)
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
