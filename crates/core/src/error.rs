use personalaios_executor::ExecutorError;
use personalaios_memory::MemoryError;
use thiserror::Error;

/// Failure of a component handler. Rendered to display text only at the
/// dispatch boundary, see [`ShellError::render`].
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{kind} not found: '{name}'")]
    NotFound {
        kind: &'static str,
        name: String,
        suggestions: Vec<String>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Refused: {0}")]
    Refused(String),

    #[error("Tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type ShellResult<T> = Result<T, ShellError>;

impl ShellError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn not_found_with(
        kind: &'static str,
        name: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
            suggestions,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self::Refused(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Format the error for the chat surface.
    pub fn render(&self, component: &str) -> String {
        match self {
            Self::NotFound {
                kind,
                name,
                suggestions,
            } => {
                let mut out = format!("🔍 **{} not found:** '{}'", capitalize(kind), name);
                if !suggestions.is_empty() {
                    out.push_str("\n\n**Did you mean:**");
                    for suggestion in suggestions {
                        out.push_str(&format!("\n• {}", suggestion));
                    }
                }
                out
            }
            Self::InvalidInput(message) => format!("❌ **Invalid input:** {}", message),
            Self::Refused(message) => format!("⚠️ **{}**", message),
            Self::ToolUnavailable(message) => format!("⚠️ **Tool not available:** {}", message),
            other => format!("❌ **{} error:** {}", capitalize(component), other),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<ExecutorError> for ShellError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::ToolMissing(tool) => Self::ToolUnavailable(format!(
                "'{}' is not installed",
                tool
            )),
            ExecutorError::InvalidArgument(message) => Self::InvalidInput(message),
            ExecutorError::Io(e) => Self::Io(e),
            other => Self::CommandFailed(other.to_string()),
        }
    }
}

impl From<MemoryError> for ShellError {
    fn from(err: MemoryError) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_not_found_lists_suggestions() {
        let err = ShellError::not_found_with(
            "file",
            "notse.txt",
            vec!["notes.txt".to_string(), "note.md".to_string()],
        );
        let text = err.render("file manager");
        assert!(text.starts_with("🔍 **File not found:** 'notse.txt'"));
        assert!(text.contains("• notes.txt"));
        assert!(text.contains("• note.md"));
    }

    #[test]
    fn test_render_generic_error_names_component() {
        let err = ShellError::CommandFailed("wmctrl exited with 1".to_string());
        assert_eq!(
            err.render("window manager"),
            "❌ **Window manager error:** Command failed: wmctrl exited with 1"
        );
    }

    #[test]
    fn test_tool_missing_maps_to_unavailable() {
        let err: ShellError = ExecutorError::ToolMissing("wmctrl".to_string()).into();
        assert!(matches!(err, ShellError::ToolUnavailable(_)));
    }
}
