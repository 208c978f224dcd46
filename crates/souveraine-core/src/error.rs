//! Error types for souveraine-core

use thiserror::Error;

/// Result type alias using souveraine-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Input rejected before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message vide")]
    EmptyMessage,

    #[error("Fichier trop volumineux ({size} octets, max {max})")]
    AttachmentTooLarge { size: u64, max: u64 },

    #[error("Audio trop court. Veuillez enregistrer au moins 2-3 secondes.")]
    AudioTooShort,

    #[error("Capture audio impossible: {0}")]
    AudioCapture(String),
}

/// Errors surfaced by the core
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the backend gateway
    #[error(transparent)]
    Api(#[from] souveraine_api::Error),

    /// Unknown conversation id
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Local storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
