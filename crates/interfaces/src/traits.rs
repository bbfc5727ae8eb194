use async_trait::async_trait;

/// The chat surface: one reader of user input, one writer of replies.
#[async_trait]
pub trait Interface: Send + Sync {
    /// Show `prompt` and read one line. `None` at end of input.
    async fn receive_input(&self, prompt: &str) -> Option<String>;
    async fn send_output(&self, message: &str);
    /// Write a streamed fragment without a trailing newline.
    async fn send_fragment(&self, fragment: &str);
    async fn show_status(&self, status: &str);
    async fn clear(&self);
}
