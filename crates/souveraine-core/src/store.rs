//! Durable key/value storage for client state
//!
//! Stores the conversation list, the active conversation pointer, the theme
//! and the guest session id. Reads never fail: a missing or corrupt value
//! yields the documented default and a warning in the log.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::model::{Conversation, ThemePreference};

/// Named keys of the persisted state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Conversations,
    ActiveConversation,
    Theme,
    GuestSession,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Conversations => "ia_chat_conversations",
            StoreKey::ActiveConversation => "ia_chat_current_conversation",
            StoreKey::Theme => "ia_chat_theme",
            StoreKey::GuestSession => "guest_session_id",
        }
    }
}

/// Raw string storage scoped to one user profile
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: StoreKey) -> Option<String>;

    fn set(&self, key: StoreKey, value: &str) -> io::Result<()>;

    fn remove(&self, key: StoreKey) -> io::Result<()>;
}

/// One file per key inside a private directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Default data directory for the client
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("souveraine")
    }

    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            #[cfg(unix)]
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StoreKey) -> PathBuf {
        self.dir.join(key.as_str())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(key = key.as_str(), error = %e, "failed to read stored value");
                None
            }
        }
    }

    fn set(&self, key: StoreKey, value: &str) -> io::Result<()> {
        let path = self.path(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;

        #[cfg(unix)]
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;

        fs::rename(&tmp, &path)
    }

    fn remove(&self, key: StoreKey) -> io::Result<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        self.values.lock().get(&key).cloned()
    }

    fn set(&self, key: StoreKey, value: &str) -> io::Result<()> {
        self.values.lock().insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> io::Result<()> {
        self.values.lock().remove(&key);
        Ok(())
    }
}

/// Typed view over a [`KeyValueStore`]
#[derive(Clone)]
pub struct PersistedStore {
    inner: Arc<dyn KeyValueStore>,
}

impl PersistedStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// Ephemeral store backed by memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Stored conversation list; empty when absent or unreadable
    pub fn load_conversations(&self) -> Vec<Conversation> {
        let Some(raw) = self.inner.get(StoreKey::Conversations) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(conversations) => conversations,
            Err(e) => {
                tracing::warn!(error = %e, "stored conversation list is corrupt, starting empty");
                Vec::new()
            }
        }
    }

    pub fn save_conversations(&self, conversations: &[Conversation]) -> io::Result<()> {
        let raw = serde_json::to_string(conversations)?;
        self.inner.set(StoreKey::Conversations, &raw)
    }

    pub fn active_conversation(&self) -> Option<String> {
        self.inner
            .get(StoreKey::ActiveConversation)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn set_active_conversation(&self, id: Option<&str>) -> io::Result<()> {
        match id {
            Some(id) => self.inner.set(StoreKey::ActiveConversation, id),
            None => self.inner.remove(StoreKey::ActiveConversation),
        }
    }

    /// Theme preference; dark when absent or unrecognised
    pub fn theme(&self) -> ThemePreference {
        match self.inner.get(StoreKey::Theme) {
            None => ThemePreference::default(),
            Some(raw) => ThemePreference::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "unrecognised stored theme, using default");
                ThemePreference::default()
            }),
        }
    }

    pub fn set_theme(&self, theme: ThemePreference) -> io::Result<()> {
        self.inner.set(StoreKey::Theme, theme.as_str())
    }

    pub fn guest_session(&self) -> Option<String> {
        self.inner
            .get(StoreKey::GuestSession)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn set_guest_session(&self, session_id: &str) -> io::Result<()> {
        self.inner.set(StoreKey::GuestSession, session_id)
    }
}
