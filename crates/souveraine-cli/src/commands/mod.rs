//! Slash commands for interactive mode

mod conversation;
mod message;
mod session;
mod settings;

pub use conversation::ConversationCommand;
pub(crate) use conversation::{find as find_conversation, format_list as conversation_listing};
pub use message::MessageCommand;
pub use session::SessionCommand;
pub use settings::SettingsCommand;

use souveraine_core::SessionCoordinator;
use std::path::PathBuf;

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to the backend)
    Message(String),
    /// Put text back in the input as a new draft
    Draft(String),
    /// Send the recording at this path as a voice message
    Voice(PathBuf),
    /// Probe the backend
    CheckStatus,
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command. Returns `None` for regular text.
pub fn execute_command(input: &str, coordinator: &SessionCoordinator) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next().unwrap_or_default().to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "quit" | "exit" | "q" => CommandResult::Exit,

        "new" | "n" => ConversationCommand::new_conversation(coordinator),
        "list" | "l" => ConversationCommand::list(coordinator),
        "open" | "o" => ConversationCommand::open(args, coordinator),
        "delete" | "d" => ConversationCommand::delete(args, coordinator),
        "search" | "s" => ConversationCommand::search(args, coordinator),

        "category" | "cat" => SettingsCommand::category(args, coordinator),
        "language" | "lang" => SettingsCommand::language(args, coordinator),
        "theme" => SettingsCommand::theme(args, coordinator),

        "voice" | "v" => MessageCommand::voice(args),
        "upload" | "u" => MessageCommand::upload(args, coordinator),
        "reuse" | "r" => MessageCommand::reuse(args, coordinator),
        "feedback" | "f" => MessageCommand::feedback(args, coordinator),

        "status" => CommandResult::CheckStatus,
        "session" => SessionCommand::execute(coordinator),

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Commandes disponibles:
  /help, /h, /?            Afficher cette aide
  /new, /n                 Nouvelle conversation
  /list, /l                Lister les conversations
  /open, /o <n|id>         Ouvrir une conversation
  /delete, /d [n|id]       Supprimer une conversation (l'active par défaut)
  /search, /s <texte>      Chercher dans les titres et aperçus
  /category, /cat [nom]    Afficher ou changer la catégorie
  /language, /lang [code]  Afficher ou changer la langue (fr, mo, di)
  /theme [dark|light]      Basculer ou choisir le thème
  /voice, /v <fichier>     Envoyer un enregistrement vocal
  /upload, /u <fichier>    Joindre un document au prochain message
  /upload clear            Retirer le document joint
  /reuse, /r <n>           Reprendre le message n comme brouillon
  /feedback, /f <n> +|-    Noter la réponse n
  /status                  Vérifier la connexion au serveur
  /session                 Informations de session
  /quit, /exit, /q         Quitter

Exemples:
  /category sante          Poser des questions de santé
  /language mo             Répondre en mooré
  /voice question.wav      Transcrire et envoyer question.wav"#
        .to_string()
}

/// Parse a 1-based position as shown in listings (`3` or `#3`)
pub(crate) fn parse_position(arg: &str) -> Option<usize> {
    arg.trim()
        .trim_start_matches('#')
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
}
