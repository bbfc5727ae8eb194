use crate::config::Config;
use anyhow::Result;
use personalaios_executor::{CommandRunner, SystemRunner};
use personalaios_providers::{LocalModelClient, ModelStatus};
use std::io::Write;

const DESKTOP_TOOLS: &[&str] = &[
    "wmctrl",
    "xdotool",
    "notify-send",
    "xdg-open",
    "pactl",
    "bluetoothctl",
];

pub async fn run(config: &Config) -> Result<()> {
    println!("🏥 Health Check\n");

    let mut healthy = true;

    print!("⚙️  Configuration... ");
    match config.validate() {
        Ok(()) => println!("✓"),
        Err(e) => {
            println!("✗ ({})", e);
            healthy = false;
        }
    }

    print!("📁 Data directory... ");
    match check_data_dir(config) {
        Ok(()) => println!("✓ ({})", config.layout().root().display()),
        Err(e) => {
            println!("✗ ({})", e);
            healthy = false;
        }
    }

    // Missing tools only disable individual actions.
    let runner = SystemRunner::new(config.command_timeout());
    for tool in DESKTOP_TOOLS {
        print!("🔧 {}... ", tool);
        flush();
        if runner.exists(tool).await {
            println!("✓");
        } else {
            println!("– (not installed)");
        }
    }

    print!("🌐 Model endpoint {}... ", config.model.base_url);
    flush();
    match LocalModelClient::new(config.model.clone()).check_readiness().await {
        ModelStatus::Ready => println!("✓"),
        ModelStatus::Unavailable => {
            println!("✗ (unreachable)");
            healthy = false;
        }
    }

    println!();
    if healthy {
        println!("✅ All checks passed");
        Ok(())
    } else {
        anyhow::bail!("Health check failed");
    }
}

fn check_data_dir(config: &Config) -> Result<()> {
    let root = config.layout().root().to_path_buf();
    std::fs::create_dir_all(&root)?;
    let marker = root.join(".health");
    std::fs::write(&marker, b"ok")?;
    std::fs::remove_file(&marker)?;
    Ok(())
}

fn flush() {
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_check() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: Some(dir.path().join("fresh")),
            ..Config::default()
        };
        check_data_dir(&config).unwrap();
        assert!(dir.path().join("fresh").is_dir());
        assert!(!dir.path().join("fresh/.health").exists());
    }
}
