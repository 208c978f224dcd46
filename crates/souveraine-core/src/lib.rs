//! souveraine-core: conversation state for the IA Souveraine Burkina client
//!
//! This crate owns everything between the user's intent and the backend:
//! the persisted key/value store, the conversation repository mirrored
//! into it, and the session coordinator that runs the send lifecycle.

pub mod audio;
pub mod content;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod model;
pub mod repository;
pub mod status;
pub mod store;

pub use audio::{AudioCapture, AudioPayload};
pub use coordinator::{Attachment, SendOutcome, SendPhase, SessionCoordinator};
pub use error::{Error, Result, ValidationError};
pub use events::{Notice, NoticeLevel, SessionEvent};
pub use model::{Conversation, Message, Role, ThemePreference};
pub use repository::{ConversationRepository, ConversationUpdate, NewConversation};
pub use status::StatusMonitor;
pub use store::{FileStore, KeyValueStore, MemoryStore, PersistedStore, StoreKey};

pub use souveraine_api::{AudioMode, Category, Language};
