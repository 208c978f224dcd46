//! /new, /list, /open, /delete, /search

use super::{CommandResult, parse_position};
use chrono::Utc;
use souveraine_core::{Conversation, SessionCoordinator, content::relative_date};

pub struct ConversationCommand;

impl ConversationCommand {
    pub fn new_conversation(coordinator: &SessionCoordinator) -> CommandResult {
        let conversation = coordinator.new_conversation();
        CommandResult::Message(format!("Nouvelle conversation ({})", conversation.id))
    }

    pub fn list(coordinator: &SessionCoordinator) -> CommandResult {
        let conversations = coordinator.conversations();
        if conversations.is_empty() {
            return CommandResult::Message("Aucune conversation".to_string());
        }
        CommandResult::Message(format_list(
            &conversations,
            coordinator.active_id().as_deref(),
        ))
    }

    pub fn open(args: &str, coordinator: &SessionCoordinator) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message("Usage: /open <n|id>".to_string());
        }
        let conversations = coordinator.conversations();
        let Some(target) = find(&conversations, args) else {
            return CommandResult::Message(format!("Conversation introuvable: {}", args));
        };
        match coordinator.select_conversation(&target.id) {
            Ok(()) => CommandResult::Message(format!(
                "{} {} ({} messages)",
                target.category.icon(),
                target.title,
                target.message_count
            )),
            Err(e) => CommandResult::Message(e.to_string()),
        }
    }

    /// Delete the conversation named by `args`, or the active one
    pub fn delete(args: &str, coordinator: &SessionCoordinator) -> CommandResult {
        let conversations = coordinator.conversations();
        let target = if args.is_empty() {
            coordinator.active_conversation()
        } else {
            find(&conversations, args).cloned()
        };
        let Some(target) = target else {
            return CommandResult::Message("Aucune conversation à supprimer".to_string());
        };
        match coordinator.delete_conversation(&target.id) {
            Ok(()) => CommandResult::Message(format!("Supprimée: {}", target.title)),
            Err(e) => CommandResult::Message(e.to_string()),
        }
    }

    pub fn search(args: &str, coordinator: &SessionCoordinator) -> CommandResult {
        let results = coordinator.search(args);
        if results.is_empty() {
            return CommandResult::Message(format!("Aucun résultat pour « {} »", args));
        }
        // Positions refer to the full list so /open works on the result
        let all = coordinator.conversations();
        let active = coordinator.active_id();
        let now = Utc::now();
        let lines: Vec<String> = results
            .iter()
            .filter_map(|c| {
                let position = all.iter().position(|a| a.id == c.id)? + 1;
                Some(format_row(position, c, active.as_deref(), now))
            })
            .collect();
        CommandResult::Message(lines.join("\n"))
    }
}

/// Conversation at a 1-based list position, or by id or id prefix
pub(crate) fn find<'a>(conversations: &'a [Conversation], arg: &str) -> Option<&'a Conversation> {
    if let Some(n) = parse_position(arg) {
        return conversations.get(n - 1);
    }
    let arg = arg.trim();
    conversations
        .iter()
        .find(|c| c.id == arg)
        .or_else(|| conversations.iter().find(|c| c.id.starts_with(arg)))
}

pub(crate) fn format_list(conversations: &[Conversation], active: Option<&str>) -> String {
    let now = Utc::now();
    conversations
        .iter()
        .enumerate()
        .map(|(i, c)| format_row(i + 1, c, active, now))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_row(
    position: usize,
    conversation: &Conversation,
    active: Option<&str>,
    now: chrono::DateTime<Utc>,
) -> String {
    let marker = if active == Some(conversation.id.as_str()) {
        "*"
    } else {
        " "
    };
    format!(
        "{}{:>3}. {} {}  ({} messages, {})",
        marker,
        position,
        conversation.category.icon(),
        conversation.title,
        conversation.message_count,
        relative_date(conversation.last_activity(), now)
    )
}
