use crate::bootstrap::Shell;
use crate::config::Config;
use anyhow::Result;

/// Handle a single utterance and print the reply.
pub async fn run(config: Config, text: &str) -> Result<()> {
    let shell = Shell::build(config).await?;

    // Unrouted text needs the model's readiness; one readiness check sets it.
    if shell.router.classify(text).is_none() {
        shell.model.check_readiness().await;
    }

    let routed = shell.router.handle(text, None).await;
    println!("{}", routed.reply);
    shell.shutdown().await;
    Ok(())
}
