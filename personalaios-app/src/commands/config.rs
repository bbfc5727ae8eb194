use crate::config::Config;
use anyhow::{bail, Result};
use clap::Subcommand;
use std::path::Path;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as YAML
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_command(command: ConfigCommand, path: &Path, config: &Config) -> Result<()> {
    match command {
        ConfigCommand::Show => show(path, config),
        ConfigCommand::Init { force } => init(path, force),
    }
}

fn show(path: &Path, config: &Config) -> Result<()> {
    if Config::exists(path) {
        println!("# {}", path.display());
    } else {
        println!("# {} (not found, showing defaults)", path.display());
    }
    print!("{}", config.to_yaml()?);
    if let Err(e) = config.validate() {
        println!("\n⚠️  {}", e);
    }
    Ok(())
}

fn init(path: &Path, force: bool) -> Result<()> {
    if Config::exists(path) && !force {
        bail!("{} already exists. Use --force to overwrite it.", path.display());
    }
    Config::default().save(path)?;
    println!("✅ Wrote default configuration to {}", path.display());
    Ok(())
}
