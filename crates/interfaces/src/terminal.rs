use crate::traits::Interface;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

pub struct TerminalInterface {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalInterface {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn write(&self, bytes: &[u8]) {
        let mut stdout = tokio::io::stdout();
        let _ = stdout.write_all(bytes).await;
        let _ = stdout.flush().await;
    }
}

impl Default for TerminalInterface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Interface for TerminalInterface {
    async fn receive_input(&self, prompt: &str) -> Option<String> {
        self.write(prompt.as_bytes()).await;
        match self.lines.lock().await.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) | Err(_) => None,
        }
    }

    async fn send_output(&self, message: &str) {
        self.write(format!("{}\n", message).as_bytes()).await;
    }

    async fn send_fragment(&self, fragment: &str) {
        self.write(fragment.as_bytes()).await;
    }

    async fn show_status(&self, status: &str) {
        self.send_output(&format!("ℹ️  {}", status)).await;
    }

    async fn clear(&self) {
        self.write(b"\x1B[2J\x1B[H").await;
    }
}
