use crate::breaker::CircuitBreaker;
use crate::sse::{SseDecoder, SseEvent};
use crate::traits::{LanguageModel, Message, ModelStatus, ProviderError};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
const READINESS_ENDPOINTS: &[&str] = &["/health", "/v1/models", "/"];

fn default_stop() -> Vec<String> {
    ["\nUser:", "\nHuman:", "User:", "Human:", "\n\n"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Connection and sampling settings for the local model server. Also the
/// `model:` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: Vec<String>,
    pub request_timeout_secs: u64,
    pub ready_attempts: u32,
    pub ready_interval_secs: u64,
    pub health_poll_secs: u64,
    pub autostart: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: 512,
            temperature: 0.3,
            top_p: 0.8,
            stop: default_stop(),
            request_timeout_secs: 10,
            ready_attempts: 120,
            ready_interval_secs: 1,
            health_poll_secs: 15,
            autostart: false,
        }
    }
}

/// Client for an OpenAI-style `/v1/chat/completions` endpoint served by
/// llama.cpp or a llamafile.
#[derive(Clone)]
pub struct LocalModelClient {
    client: Client,
    settings: ModelSettings,
    breaker: Arc<CircuitBreaker>,
    ready: Arc<AtomicBool>,
}

impl LocalModelClient {
    pub fn new(settings: ModelSettings) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            settings,
            breaker: Arc::new(CircuitBreaker::default()),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// JSON body for a streaming completion of `prompt`.
    pub fn request_body(&self, prompt: &str) -> Value {
        json!({
            "messages": [Message::user(prompt)],
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "top_p": self.settings.top_p,
            "stream": true,
            "stop": self.settings.stop,
        })
    }

    /// Query the readiness endpoints in order and cache the result.
    pub async fn check_readiness(&self) -> ModelStatus {
        for endpoint in READINESS_ENDPOINTS {
            let response = self
                .client
                .get(self.url(endpoint))
                .timeout(Duration::from_secs(1))
                .send()
                .await;
            match response {
                Ok(response) if counts_as_ready(response.status()) => {
                    self.set_ready(true);
                    return ModelStatus::Ready;
                }
                Ok(response) => {
                    tracing::debug!("{} answered {}", endpoint, response.status());
                }
                Err(e) => {
                    tracing::debug!("{} unreachable: {}", endpoint, e);
                }
            }
        }
        self.set_ready(false);
        ModelStatus::Unavailable
    }

    /// Check up to `attempts` times, `interval` apart. Returns early when
    /// `cancel` fires.
    pub async fn wait_until_ready(
        &self,
        attempts: u32,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> ModelStatus {
        for attempt in 1..=attempts.max(1) {
            if self.check_readiness().await == ModelStatus::Ready {
                tracing::info!("Model server ready after {} attempt(s)", attempt);
                return ModelStatus::Ready;
            }
            if attempt % 10 == 0 {
                tracing::info!("Waiting for model server... {} attempts", attempt);
            }
            tokio::select! {
                _ = cancel.cancelled() => return ModelStatus::Unavailable,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        tracing::warn!("Model server not ready after {} attempts", attempts);
        ModelStatus::Unavailable
    }

    fn set_ready(&self, ready: bool) {
        let was = self.ready.swap(ready, Ordering::SeqCst);
        if was != ready {
            tracing::info!("Model server is now {}", if ready { "ready" } else { "unavailable" });
        }
    }

    async fn stream_completion(
        &self,
        prompt: &str,
        deltas: Option<mpsc::Sender<String>>,
    ) -> Result<String, ProviderError> {
        let timeout = Duration::from_secs(self.settings.request_timeout_secs.max(1));
        let request = self
            .client
            .post(self.url("/v1/chat/completions"))
            .json(&self.request_body(prompt))
            .send();
        let response = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| ProviderError::Timeout(timeout.as_secs()))?
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(ProviderError::Server(response.status().as_u16()));
        }

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut text = String::new();

        loop {
            let next = tokio::time::timeout(timeout, stream.next())
                .await
                .map_err(|_| ProviderError::Timeout(timeout.as_secs()))?;
            let (events, ended) = match next {
                Some(chunk) => {
                    let chunk = chunk.map_err(|e| ProviderError::Http(e.to_string()))?;
                    (decoder.push(&chunk), false)
                }
                None => (decoder.finish().into_iter().collect(), true),
            };
            for event in events {
                if let SseEvent::Delta(delta) = event {
                    text.push_str(&delta);
                    if let Some(tx) = &deltas {
                        // The receiver may have gone away; keep accumulating.
                        let _ = tx.send(delta).await;
                    }
                }
            }
            if ended || decoder.is_done() {
                break;
            }
        }
        Ok(text)
    }
}

fn counts_as_ready(status: StatusCode) -> bool {
    matches!(status.as_u16(), 200 | 404 | 405)
}

#[async_trait]
impl LanguageModel for LocalModelClient {
    fn name(&self) -> &str {
        "llama.cpp"
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn complete(
        &self,
        prompt: &str,
        deltas: Option<mpsc::Sender<String>>,
    ) -> Result<String, ProviderError> {
        if !self.breaker.allows_request() {
            return Err(ProviderError::CircuitOpen);
        }
        match self.stream_completion(prompt, deltas).await {
            Ok(text) => {
                self.breaker.record_success();
                Ok(text)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_matches_server_contract() {
        let client = LocalModelClient::new(ModelSettings::default());
        let body = client.request_body("hello");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["stream"], true);
        assert_eq!(body["stop"].as_array().map(|a| a.len()), Some(5));
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_readiness_statuses() {
        assert!(counts_as_ready(StatusCode::OK));
        assert!(counts_as_ready(StatusCode::NOT_FOUND));
        assert!(counts_as_ready(StatusCode::METHOD_NOT_ALLOWED));
        assert!(!counts_as_ready(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn test_url_join() {
        let client = LocalModelClient::new(ModelSettings {
            base_url: "http://localhost:9000/".to_string(),
            ..ModelSettings::default()
        });
        assert_eq!(client.url("/health"), "http://localhost:9000/health");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let client = LocalModelClient::new(ModelSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            ..ModelSettings::default()
        });
        let cancel = CancellationToken::new();
        let status = client
            .wait_until_ready(1, Duration::from_millis(1), &cancel)
            .await;
        assert_eq!(status, ModelStatus::Unavailable);
        assert!(!client.is_ready());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let held = tokio::spawn(async move {
            let mut sockets = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                sockets.push(socket);
            }
        });

        let client = LocalModelClient::new(ModelSettings {
            base_url: format!("http://{}", addr),
            request_timeout_secs: 1,
            ..ModelSettings::default()
        });
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            client.stream_completion("hello", None),
        )
        .await
        .expect("request should give up on its own");
        assert!(matches!(result, Err(ProviderError::Timeout(1))), "{:?}", result);
        held.abort();
    }

    #[tokio::test]
    async fn test_wait_stops_when_cancelled() {
        let client = LocalModelClient::new(ModelSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            ..ModelSettings::default()
        });
        let cancel = CancellationToken::new();
        cancel.cancel();
        let status = client
            .wait_until_ready(120, Duration::from_secs(60), &cancel)
            .await;
        assert_eq!(status, ModelStatus::Unavailable);
    }
}
