//! /voice, /upload, /reuse, /feedback

use super::{CommandResult, parse_position};
use souveraine_core::{
    Attachment, Message, SessionCoordinator, coordinator::MAX_ATTACHMENT_BYTES,
};
use std::path::{Path, PathBuf};

pub struct MessageCommand;

impl MessageCommand {
    pub fn voice(args: &str) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message("Usage: /voice <fichier audio>".to_string());
        }
        CommandResult::Voice(PathBuf::from(args))
    }

    /// Stage a file for the next send, or drop it with `/upload clear`
    pub fn upload(args: &str, coordinator: &SessionCoordinator) -> CommandResult {
        match args {
            "" => {
                let staged = coordinator
                    .staged_attachment()
                    .map(|name| format!("Fichier joint: {}", name))
                    .unwrap_or_else(|| "Usage: /upload <fichier> | /upload clear".to_string());
                CommandResult::Message(staged)
            }
            "clear" => {
                coordinator.clear_attachment();
                CommandResult::Message("Fichier retiré".to_string())
            }
            path => {
                let path = Path::new(path);
                let unreadable = |e: std::io::Error| {
                    CommandResult::Message(format!(
                        "Lecture impossible de {}: {}",
                        path.display(),
                        e
                    ))
                };
                // Size first so oversized files are never loaded
                match std::fs::metadata(path) {
                    Ok(meta) if meta.len() > MAX_ATTACHMENT_BYTES => {
                        return CommandResult::Message(format!(
                            "Fichier trop volumineux (max 10MB): {}",
                            path.display()
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => return unreadable(e),
                }
                let bytes = match std::fs::read(path) {
                    Ok(bytes) => bytes,
                    Err(e) => return unreadable(e),
                };
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("document")
                    .to_string();
                let attachment = Attachment::new(bytes, file_name, document_mime_type(path));
                match coordinator.stage_attachment(attachment) {
                    Ok(()) => CommandResult::Message(
                        "Fichier joint au prochain message".to_string(),
                    ),
                    Err(e) => CommandResult::Message(e.to_string()),
                }
            }
        }
    }

    /// Copy user message `n` of the active conversation into the input
    pub fn reuse(args: &str, coordinator: &SessionCoordinator) -> CommandResult {
        let Some(message) = message_at(args, coordinator) else {
            return CommandResult::Message(format!("Message introuvable: {}", args));
        };
        match coordinator.reuse_message(&message.id) {
            Ok(draft) => CommandResult::Draft(draft),
            Err(_) => CommandResult::Message(format!(
                "Seuls vos propres messages peuvent être repris (#{})",
                args.trim_start_matches('#')
            )),
        }
    }

    /// Rate assistant message `n`: `/feedback 4 +` or `/feedback 4 -`
    pub fn feedback(args: &str, coordinator: &SessionCoordinator) -> CommandResult {
        let mut parts = args.split_whitespace();
        let (Some(position), Some(vote)) = (parts.next(), parts.next()) else {
            return CommandResult::Message("Usage: /feedback <n> +|-".to_string());
        };
        let positive = match vote {
            "+" | "up" | "oui" | "👍" => true,
            "-" | "down" | "non" | "👎" => false,
            _ => return CommandResult::Message(format!("Vote inconnu: {}", vote)),
        };
        let Some(message) = message_at(position, coordinator).filter(Message::is_assistant) else {
            return CommandResult::Message(format!("Réponse introuvable: {}", position));
        };
        match coordinator.record_feedback(&message.id, positive) {
            Ok(()) => CommandResult::Message(if positive {
                "👍 Merci pour votre retour positif !".to_string()
            } else {
                "👎 Merci, nous prenons en compte votre retour.".to_string()
            }),
            Err(e) => CommandResult::Message(e.to_string()),
        }
    }
}

/// Message at a 1-based position in the active conversation
fn message_at(arg: &str, coordinator: &SessionCoordinator) -> Option<Message> {
    let n = parse_position(arg)?;
    coordinator
        .active_conversation()?
        .messages
        .into_iter()
        .nth(n - 1)
}

/// MIME type of a document, from its extension
pub fn document_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
