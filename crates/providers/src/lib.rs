pub mod breaker;
pub mod local;
pub mod server;
pub mod sse;
pub mod traits;

pub use breaker::CircuitBreaker;
pub use local::{LocalModelClient, ModelSettings, DEFAULT_BASE_URL};
pub use server::LaunchPlan;
pub use sse::{decode_line, SseDecoder, SseEvent};
pub use traits::{LanguageModel, Message, ModelStatus, ProviderError};
