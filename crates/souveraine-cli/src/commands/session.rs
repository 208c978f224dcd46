//! /session - show session info

use super::CommandResult;
use souveraine_core::SessionCoordinator;

pub struct SessionCommand;

impl SessionCommand {
    pub fn execute(coordinator: &SessionCoordinator) -> CommandResult {
        let mut output = String::from("Session\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');

        output.push_str(&format!(
            "Session:       {}\n",
            coordinator
                .session_id()
                .unwrap_or_else(|| "(pas encore attribuée)".to_string())
        ));
        let category = coordinator.category();
        output.push_str(&format!(
            "Catégorie:     {} {}\n",
            category.icon(),
            category.label()
        ));
        output.push_str(&format!("Langue:        {}\n", coordinator.language().label()));
        output.push_str(&format!("Thème:         {}\n", coordinator.theme().as_str()));
        output.push_str(&format!(
            "Conversations: {}\n",
            coordinator.conversations().len()
        ));

        match coordinator.active_conversation() {
            Some(active) => {
                output.push_str(&format!("Active:        {}\n", active.title));
                output.push_str(&format!(
                    "Messages:      {} ({} vous, {} IA)\n",
                    active.message_count,
                    active.messages.iter().filter(|m| m.is_user()).count(),
                    active.messages.iter().filter(|m| m.is_assistant()).count()
                ));
            }
            None => output.push_str("Active:        aucune\n"),
        }
        if let Some(name) = coordinator.staged_attachment() {
            output.push_str(&format!("Fichier joint: {}\n", name));
        }

        CommandResult::Message(output.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::{CommandResult, execute_command, test_support};

    #[test]
    fn test_session_summary() {
        let coordinator = test_support::coordinator();
        coordinator.new_conversation();
        let Some(CommandResult::Message(info)) = execute_command("/session", &coordinator) else {
            panic!("expected session info");
        };
        assert!(info.contains("(pas encore attribuée)"));
        assert!(info.contains("Langue:        Français"));
        assert!(info.contains("Active:        Nouvelle conversation"));
        assert!(info.contains("Messages:      0 (0 vous, 0 IA)"));
    }
}
