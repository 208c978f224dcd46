//! Session event types

use serde::{Deserialize, Serialize};

use crate::model::{Conversation, Message};

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Short-lived notification shown to the user (toast)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Events emitted by the session coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A conversation was added to the list
    ConversationCreated { conversation: Conversation },

    /// The active conversation changed (None when the list became empty)
    ActiveChanged { conversation_id: Option<String> },

    ConversationDeleted { conversation_id: String },

    /// A message was appended to a conversation
    MessageAppended {
        conversation_id: String,
        message: Message,
    },

    /// A request is in flight
    SendStarted { conversation_id: String },

    /// The in-flight request settled, successfully or not
    SendFinished { conversation_id: String, ok: bool },

    /// The backend assigned a session id for the first time
    SessionIdAssigned { session_id: String },

    Notice(Notice),

    /// Liveness changed
    BackendStatus { online: bool },
}

impl SessionEvent {
    /// Whether this event changes what the conversation view shows
    pub fn touches_conversation(&self, id: &str) -> bool {
        match self {
            SessionEvent::MessageAppended {
                conversation_id, ..
            }
            | SessionEvent::SendStarted { conversation_id }
            | SessionEvent::SendFinished {
                conversation_id, ..
            } => conversation_id == id,
            _ => false,
        }
    }
}
