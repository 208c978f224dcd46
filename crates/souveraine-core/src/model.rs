//! Conversation and message records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souveraine_api::{AudioMode, Category, ChatReply, Language};

use crate::content;

/// Title given to a conversation opened with "new conversation"
pub const PLACEHOLDER_TITLE: &str = "Nouvelle conversation";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "ai")]
    Assistant,
    /// Local notices and errors; never exchanged with the backend
    System,
}

/// One turn within a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Retrieved excerpts; the first non-empty one takes display priority
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Backend mode (intelligent, greeting, ...); opaque metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_mode: Option<AudioMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// What the backend heard, for answers to voice messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_voice: bool,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            category: None,
            context: Vec::new(),
            sources: Vec::new(),
            sources_count: None,
            confidence: None,
            mode: None,
            audio_url: None,
            audio_mode: None,
            language: None,
            suggestions: Vec::new(),
            transcription: None,
            file_url: None,
            file_name: None,
            is_error: false,
            is_voice: false,
        }
    }

    /// Typed user message
    pub fn user(content: impl Into<String>, category: Category) -> Self {
        Self {
            category: Some(category),
            ..Self::new(Role::User, content)
        }
    }

    /// Recorded voice message, shown before the transcription is known
    pub fn voice(content: impl Into<String>, category: Category) -> Self {
        Self {
            category: Some(category),
            is_voice: true,
            ..Self::new(Role::User, content)
        }
    }

    /// Uploaded attachment
    pub fn attachment(
        display_name: &str,
        file_url: impl Into<String>,
        stored_name: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            category: Some(category),
            file_url: Some(file_url.into()),
            file_name: Some(stored_name.into()),
            ..Self::new(Role::User, format!("📎 {}", display_name))
        }
    }

    /// Assistant answer built from a backend reply
    pub fn assistant(reply: &ChatReply) -> Self {
        Self {
            context: reply.context.clone(),
            sources: reply.sources.clone(),
            sources_count: Some(reply.source_count()),
            confidence: reply.confidence,
            mode: reply.mode.clone(),
            audio_url: reply.audio_url.clone().filter(|u| !u.is_empty()),
            audio_mode: Some(reply.audio_mode),
            language: Some(reply.language),
            suggestions: reply.suggestions.clone(),
            ..Self::new(Role::Assistant, reply.text())
        }
    }

    /// Attach the transcription of the voice message this answers
    pub fn with_transcription(mut self, transcription: impl Into<String>, confidence: Option<f32>) -> Self {
        self.transcription = Some(transcription.into());
        if self.confidence.is_none() {
            self.confidence = confidence;
        }
        self
    }

    /// Local error notice
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(Role::System, content)
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Text to show for this message
    pub fn display_text(&self) -> &str {
        content::resolve_display_text(self)
    }
}

/// A persisted, user-visible thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Always equal to `messages.len()`
    #[serde(default)]
    pub message_count: usize,
    #[serde(default)]
    pub last_preview: String,
    /// Creation time
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub(crate) fn new(title: impl Into<String>, category: Category) -> Self {
        Self {
            id: format!("conv_{}", uuid::Uuid::new_v4().simple()),
            title: title.into(),
            category,
            messages: Vec::new(),
            message_count: 0,
            last_preview: String::new(),
            date: Utc::now(),
            updated_at: None,
        }
    }

    /// Recompute `message_count` and `last_preview` from `messages`
    pub(crate) fn refresh_derived(&mut self) {
        self.message_count = self.messages.len();
        self.last_preview = self
            .messages
            .last()
            .map(|m| content::preview(&m.content))
            .unwrap_or_default();
    }

    /// Whether the title is still the "new conversation" placeholder
    pub fn has_placeholder_title(&self) -> bool {
        self.title == PLACEHOLDER_TITLE
    }

    /// Most recent mutation time
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.date)
    }
}

/// Display theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    #[default]
    Dark,
    Light,
}

impl ThemePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::Dark => "dark",
            ThemePreference::Light => "light",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Some(ThemePreference::Dark),
            "light" => Some(ThemePreference::Light),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ThemePreference::Dark => ThemePreference::Light,
            ThemePreference::Light => ThemePreference::Dark,
        }
    }

    pub fn is_dark(&self) -> bool {
        *self == ThemePreference::Dark
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::user("a", Category::General);
        let b = Message::user("a", Category::General);
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("msg_"));
    }

    #[test]
    fn test_assistant_from_reply() {
        let reply: ChatReply = serde_json::from_value(json!({
            "response": "Le karité pousse au sud-ouest.",
            "mode": "intelligent",
            "sources": ["karite.pdf", "atlas.pdf"],
            "audio_url": "",
            "audio_mode": "not_available",
            "language": "fr",
            "suggestions": ["Comment transformer le karité ?"]
        }))
        .unwrap();
        let msg = Message::assistant(&reply);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Le karité pousse au sud-ouest.");
        assert_eq!(msg.sources.len(), 2);
        assert_eq!(msg.sources_count, Some(2));
        assert_eq!(msg.audio_url, None);
        assert_eq!(msg.suggestions.len(), 1);
        assert!(!msg.is_error);
    }

    #[test]
    fn test_error_message_is_system() {
        let msg = Message::error("boom");
        assert_eq!(msg.role, Role::System);
        assert!(msg.is_error);
    }

    #[test]
    fn test_persisted_layout_is_camel_case() {
        let mut conv = Conversation::new("Titre", Category::Agriculture);
        conv.messages.push(Message::error("échec"));
        conv.refresh_derived();

        let v = serde_json::to_value(&conv).unwrap();
        assert_eq!(v["messageCount"], json!(1));
        assert_eq!(v["lastPreview"], json!("échec"));
        assert_eq!(v["category"], json!("agriculture"));
        assert_eq!(v["messages"][0]["isError"], json!(true));
        assert!(v["messages"][0].get("isVoice").is_none());
        assert!(v["messages"][0].get("sources").is_none());
    }

    #[test]
    fn test_reads_records_written_by_older_clients() {
        let conv: Conversation = serde_json::from_value(json!({
            "id": "conv_1700000000000_abc123def",
            "title": "Quelles cultures au Burkina?",
            "date": "2025-01-15T10:00:00.000Z",
            "messages": [
                {"id": "msg_1", "role": "user", "content": "Quelles cultures au Burkina?",
                 "timestamp": "2025-01-15T10:00:00.000Z", "category": "agriculture"},
                {"id": "msg_2", "role": "ai", "content": "Le mil.",
                 "timestamp": "2025-01-15T10:00:05.000Z"}
            ],
            "messageCount": 2,
            "lastPreview": "IA: Le mil...."
        }))
        .unwrap();
        assert_eq!(conv.category, Category::General);
        assert_eq!(conv.messages[1].role, Role::Assistant);
        assert_eq!(conv.updated_at, None);
    }

    #[test]
    fn test_refresh_derived() {
        let mut conv = Conversation::new("t", Category::General);
        conv.refresh_derived();
        assert_eq!(conv.message_count, 0);
        assert_eq!(conv.last_preview, "");

        conv.messages.push(Message::user("x".repeat(80), Category::General));
        conv.refresh_derived();
        assert_eq!(conv.message_count, 1);
        assert_eq!(conv.last_preview, format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn test_theme_preference() {
        assert_eq!(ThemePreference::default(), ThemePreference::Dark);
        assert_eq!(ThemePreference::parse("Light"), Some(ThemePreference::Light));
        assert_eq!(ThemePreference::parse("sepia"), None);
        assert_eq!(ThemePreference::Dark.toggled(), ThemePreference::Light);
    }
}
