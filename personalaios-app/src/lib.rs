//! PersonalAIOS host: configuration, command routing, background jobs and the
//! terminal REPL that replaces the chat window.

pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod events;
pub mod jobs;
pub mod repl;
pub mod router;

pub use bootstrap::Shell;
pub use config::Config;
pub use events::ShellEvent;
pub use repl::{ExitReason, Repl};
pub use router::{CommandRouter, RouteTable, Routed, Target, MODEL_NOT_READY};
