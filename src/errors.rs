use serde::Serialize;

use crate::gateway::GatewayError;

/// Errors surfaced by the inventory and history services.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Maps a failed read against the gateway.
    pub fn fetch(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized => ServiceError::Unauthorized(err.to_string()),
            other => ServiceError::FetchError(other.to_string()),
        }
    }

    /// Maps a failed write against the gateway.
    pub fn persistence(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(id) => ServiceError::NotFound(id),
            GatewayError::Unauthorized => ServiceError::Unauthorized(err.to_string()),
            other => ServiceError::PersistenceError(other.to_string()),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchError(_) | Self::PersistenceError(_))
    }

    /// Returns a message suitable for showing to the user.
    /// Transport failures return generic messages to avoid leaking backend details.
    pub fn user_message(&self) -> String {
        match self {
            Self::FetchError(_) => {
                "Failed to load inventory. Please check your connection.".to_string()
            }
            Self::PersistenceError(_) => "Failed to save changes. Please try again.".to_string(),
            Self::Unauthorized(_) => "Please sign in to continue.".to_string(),
            _ => self.to_string(),
        }
    }
}
