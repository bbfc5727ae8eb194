use personalaios_components::status::StatusAlert;
use personalaios_providers::ModelStatus;

/// Something a background job wants the user to see. The REPL prints these
/// between prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Model(ModelStatus),
    Alert(StatusAlert),
    ComponentsRestarted(Vec<&'static str>),
    NotificationsDelivered(usize),
}

impl ShellEvent {
    pub fn describe(&self) -> String {
        match self {
            ShellEvent::Model(ModelStatus::Ready) => "🤖 AI Engine Ready".to_string(),
            ShellEvent::Model(ModelStatus::Unavailable) => "❌ AI Engine unavailable".to_string(),
            ShellEvent::Alert(alert) => {
                let icon = if alert.critical { "🚨" } else { "⚠️" };
                format!("{} {}: {}", icon, alert.title, alert.message)
            }
            ShellEvent::ComponentsRestarted(keys) => {
                format!("🔄 Restarted failed components: {}", keys.join(", "))
            }
            ShellEvent::NotificationsDelivered(1) => "🔔 1 notification delivered".to_string(),
            ShellEvent::NotificationsDelivered(count) => {
                format!("🔔 {} notifications delivered", count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions() {
        assert_eq!(ShellEvent::Model(ModelStatus::Ready).describe(), "🤖 AI Engine Ready");
        assert_eq!(
            ShellEvent::ComponentsRestarted(vec!["file_manager", "window_manager"]).describe(),
            "🔄 Restarted failed components: file_manager, window_manager"
        );
        let alert = StatusAlert {
            critical: true,
            title: "Battery Critical".to_string(),
            message: "Battery at 8%".to_string(),
        };
        assert_eq!(ShellEvent::Alert(alert).describe(), "🚨 Battery Critical: Battery at 8%");
        assert_eq!(
            ShellEvent::NotificationsDelivered(3).describe(),
            "🔔 3 notifications delivered"
        );
    }
}
