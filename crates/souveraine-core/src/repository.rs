//! In-memory conversation records mirrored into the persisted store

use chrono::Utc;
use souveraine_api::Category;

use crate::{
    error::{Error, Result},
    model::{Conversation, Message},
    store::PersistedStore,
};

/// Initial fields of a new conversation
#[derive(Debug, Clone, Default)]
pub struct NewConversation {
    pub title: String,
    pub category: Category,
    pub messages: Vec<Message>,
}

/// Partial update merged into an existing conversation.
///
/// Messages can only be appended; history is never rewritten.
#[derive(Debug, Clone, Default)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub append: Vec<Message>,
}

impl ConversationUpdate {
    pub fn append(message: Message) -> Self {
        Self {
            append: vec![message],
            ..Default::default()
        }
    }
}

/// Ordered conversation list, written through to storage on every mutation.
///
/// A failed write is logged and leaves the in-memory state as mutated; the
/// next successful write brings storage back in line.
pub struct ConversationRepository {
    conversations: Vec<Conversation>,
    store: PersistedStore,
}

impl ConversationRepository {
    /// Restore the list from storage (empty if absent or corrupt)
    pub fn load(store: PersistedStore) -> Self {
        let mut conversations = store.load_conversations();
        for conversation in &mut conversations {
            conversation.refresh_derived();
        }
        tracing::debug!(count = conversations.len(), "loaded conversations");
        Self {
            conversations,
            store,
        }
    }

    /// Conversations in insertion order
    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.conversations.iter().any(|c| c.id == id)
    }

    pub fn get(&self, id: &str) -> Result<&Conversation> {
        self.conversations
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Case-insensitive match on title or last preview
    pub fn search(&self, term: &str) -> Vec<&Conversation> {
        let needle = term.trim().to_lowercase();
        self.conversations
            .iter()
            .filter(|c| {
                needle.is_empty()
                    || c.title.to_lowercase().contains(&needle)
                    || c.last_preview.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Add a conversation at the end of the list
    pub fn create(&mut self, new: NewConversation) -> Conversation {
        let mut conversation = Conversation::new(new.title, new.category);
        conversation.messages = new.messages;
        conversation.refresh_derived();

        tracing::info!(id = %conversation.id, title = %conversation.title, "created conversation");
        self.conversations.push(conversation.clone());
        self.persist();
        conversation
    }

    /// Merge `update` into conversation `id` and stamp `updated_at`
    pub fn update(&mut self, id: &str, update: ConversationUpdate) -> Result<Conversation> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if let Some(title) = update.title {
            conversation.title = title;
        }
        if let Some(category) = update.category {
            conversation.category = category;
        }
        conversation.messages.extend(update.append);
        conversation.refresh_derived();
        conversation.updated_at = Some(Utc::now());

        debug_assert_eq!(conversation.message_count, conversation.messages.len());
        let snapshot = conversation.clone();
        self.persist();
        Ok(snapshot)
    }

    pub fn append_message(&mut self, id: &str, message: Message) -> Result<Conversation> {
        self.update(id, ConversationUpdate::append(message))
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        let index = self
            .conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.conversations.remove(index);
        tracing::info!(%id, "deleted conversation");
        self.persist();
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.store.save_conversations(&self.conversations) {
            tracing::error!(error = %e, "failed to persist conversations");
        }
    }
}
