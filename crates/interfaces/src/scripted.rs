use crate::traits::Interface;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Feeds canned input lines and captures everything written. Used to drive
/// the REPL without a terminal.
#[derive(Default)]
pub struct ScriptedInterface {
    input: Mutex<VecDeque<String>>,
    output: Mutex<Vec<String>>,
    partial: Mutex<Option<String>>,
}

impl ScriptedInterface {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: Mutex::new(lines.into_iter().map(Into::into).collect()),
            output: Mutex::new(Vec::new()),
            partial: Mutex::new(None),
        }
    }

    fn flush_partial(&self) {
        if let Some(partial) = self.partial.lock().take() {
            self.output.lock().push(partial);
        }
    }

    pub fn output(&self) -> Vec<String> {
        self.flush_partial();
        self.output.lock().clone()
    }

    pub fn transcript(&self) -> String {
        self.output().join("\n")
    }
}

#[async_trait]
impl Interface for ScriptedInterface {
    async fn receive_input(&self, _prompt: &str) -> Option<String> {
        self.input.lock().pop_front()
    }

    async fn send_output(&self, message: &str) {
        self.flush_partial();
        self.output.lock().push(message.to_string());
    }

    async fn send_fragment(&self, fragment: &str) {
        self.partial
            .lock()
            .get_or_insert_with(String::new)
            .push_str(fragment);
    }

    async fn show_status(&self, status: &str) {
        self.send_output(&format!("ℹ️  {}", status)).await;
    }

    async fn clear(&self) {
        self.partial.lock().take();
        self.output.lock().clear();
    }
}
