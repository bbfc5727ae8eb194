//! Interactive loop: reads utterances, handles the built-ins and hands
//! everything else to the router.

use crate::events::ShellEvent;
use crate::router::CommandRouter;
use personalaios_components::{SessionManager, SessionRequest, StatusArea};
use personalaios_interfaces::Interface;
use personalaios_tasks::{JobStatus, Supervisor};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

const PROMPT: &str = "paios> ";
const STREAM_BUFFER: usize = 64;

const BANNER: &str = "╔══════════════════════════════════════════════════════════════════╗
║              PersonalAIOS Desktop Shell                          ║
║  Commands: exit, help, status, clear                             ║
╚══════════════════════════════════════════════════════════════════╝";

const HELP: &str = "📖 **Available Commands**

  exit, quit  - Leave PersonalAIOS
  help        - Show this help message
  status      - AI engine, panel and background tasks
  clear       - Clear the screen

**Try asking:**
• create a file named notes.txt
• launch firefox
• maximize this window
• switch to workspace 2
• remind me in 10 minutes to stretch
• set theme to dark
• list components
• battery status

Anything else is answered by the AI engine.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    EndOfInput,
    Logout,
    Shutdown,
}

pub struct Repl {
    router: Arc<CommandRouter>,
    supervisor: Arc<Supervisor>,
    status: Option<Arc<StatusArea>>,
    sessions: Option<Arc<SessionManager>>,
    requests: Option<watch::Receiver<Option<SessionRequest>>>,
    events: Option<mpsc::Receiver<ShellEvent>>,
}

impl Repl {
    pub fn new(router: Arc<CommandRouter>, supervisor: Arc<Supervisor>) -> Self {
        Self {
            router,
            supervisor,
            status: None,
            sessions: None,
            requests: None,
            events: None,
        }
    }

    pub fn with_status(mut self, status: Arc<StatusArea>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<SessionManager>) -> Self {
        self.requests = Some(sessions.subscribe());
        self.sessions = Some(sessions);
        self
    }

    pub fn with_events(mut self, events: mpsc::Receiver<ShellEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn run(&mut self, ui: &dyn Interface) -> ExitReason {
        ui.send_output(BANNER).await;
        ui.send_output("").await;

        loop {
            self.drain_events(ui).await;
            if let Some(reason) = self.session_request(ui).await {
                return reason;
            }

            let Some(line) = ui.receive_input(PROMPT).await else {
                return ExitReason::EndOfInput;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match input.to_lowercase().as_str() {
                "exit" | "quit" => {
                    ui.send_output("👋 Goodbye!").await;
                    return ExitReason::Quit;
                }
                "help" => ui.send_output(HELP).await,
                "clear" => ui.clear().await,
                "status" => ui.send_output(&self.status_report().await).await,
                _ => self.route(input, ui).await,
            }
        }
    }

    async fn route(&self, input: &str, ui: &dyn Interface) {
        let (tx, mut rx) = mpsc::channel::<String>(STREAM_BUFFER);
        let printer = async {
            while let Some(fragment) = rx.recv().await {
                ui.send_fragment(&fragment).await;
            }
        };
        let (routed, ()) = tokio::join!(self.router.handle(input, Some(tx)), printer);

        if routed.streamed {
            // Close the streamed line.
            ui.send_output("").await;
        } else {
            ui.send_output(&routed.reply).await;
        }
    }

    async fn drain_events(&mut self, ui: &dyn Interface) {
        let Some(events) = self.events.as_mut() else {
            return;
        };
        while let Ok(event) = events.try_recv() {
            ui.show_status(&event.describe()).await;
        }
    }

    /// Act on a logout, restart or shutdown issued by a session command.
    async fn session_request(&mut self, ui: &dyn Interface) -> Option<ExitReason> {
        let requests = self.requests.as_mut()?;
        if !requests.has_changed().unwrap_or(false) {
            return None;
        }
        let request = *requests.borrow_and_update();
        match request? {
            SessionRequest::Logout => {
                ui.send_output("👋 Logged out of PersonalAIOS.").await;
                Some(ExitReason::Logout)
            }
            SessionRequest::Shutdown => {
                ui.send_output("⏻ Shutting down.").await;
                Some(ExitReason::Shutdown)
            }
            SessionRequest::Restart => {
                let sessions = self.sessions.as_ref()?;
                match sessions.start_all() {
                    Ok(started) => {
                        ui.show_status(&format!("Session restarted ({} components)", started.len()))
                            .await
                    }
                    Err(e) => ui.send_output(&e.render("session manager")).await,
                }
                None
            }
        }
    }

    async fn status_report(&self) -> String {
        let engine = if self.router.model_ready() {
            "🤖 Ready"
        } else {
            "🔄 Not ready"
        };
        let metrics = self.router.metrics().snapshot();
        let mut out = format!("📊 **PersonalAIOS Status**\n\n**AI Engine:** {}\n", engine);
        if let Some(status) = &self.status {
            out.push_str(&format!("**Panel:** {}\n", status.summary_line()));
        }
        out.push_str(&format!(
            "**Commands:** {} routed • {} to AI • {} failed\n",
            metrics.commands_routed, metrics.commands_unrouted, metrics.dispatch_failures
        ));

        let jobs = self.supervisor.list().await;
        if jobs.is_empty() {
            out.push_str("\n**Background tasks:** none");
        } else {
            out.push_str("\n**Background tasks:**\n");
            for job in jobs {
                let icon = match job.status {
                    JobStatus::Running => "✅",
                    JobStatus::Completed => "☑️",
                    JobStatus::Failed => "❌",
                    JobStatus::Cancelled => "⚪",
                };
                out.push_str(&format!("{} {} - {}\n", icon, job.name, job.description));
            }
        }
        out.trim_end().to_string()
    }
}
