//! Error types for souveraine-api

use thiserror::Error;

/// Result type alias using souveraine-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport failed (connection refused, DNS, TLS, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within its budget
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Backend answered with a non-success status
    #[error("Backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Response body did not match the expected contract
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid gateway configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a status error from a code and backend detail text
    pub fn status(status: u16, detail: impl Into<String>) -> Self {
        Self::Status {
            status,
            detail: detail.into(),
        }
    }

    /// Whether the backend could not be reached at all
    pub fn is_connectivity(&self) -> bool {
        match self {
            Error::Http(e) => e.is_connect() || e.is_request() || e.is_timeout(),
            Error::Timeout(_) => true,
            _ => false,
        }
    }

    /// Whether the request ran out of time
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// HTTP status code, if the backend answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Short French notice suitable for showing to the user
    pub fn user_message(&self) -> String {
        if self.is_connectivity() {
            return "Erreur réseau. Vérifiez votre connexion.".to_string();
        }
        match self {
            Error::Status { status, detail } => match status {
                401 => "Authentification requise".to_string(),
                403 => "Permissions insuffisantes".to_string(),
                404 => "Ressource non trouvée".to_string(),
                429 => "Trop de requêtes. Veuillez patienter.".to_string(),
                500 => "Erreur serveur interne".to_string(),
                _ if !detail.trim().is_empty() => detail.clone(),
                _ => format!("Erreur {}", status),
            },
            _ => "Réponse inattendue du serveur".to_string(),
        }
    }
}
