use thiserror::Error;

/// Errors surfaced by the routing core.
///
/// Every variant renders to the message a user sees, so callers can either
/// inspect the kind or just display it.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Blank question, or a chat request with no prescription context.
    #[error("{0}")]
    MissingInput(String),

    /// An external OCR, generation or search call failed.
    #[error("{component} error ({operation}): {message}")]
    CollaboratorFailure {
        component: &'static str,
        operation: &'static str,
        message: String,
    },

    /// The place search legitimately returned nothing, or every query step
    /// degraded to nothing.
    #[error("No medical services found in {city}. Please check the city name.")]
    NotFound { city: String },
}

impl AssistantError {
    pub fn collaborator(
        component: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::CollaboratorFailure {
            component,
            operation,
            message: message.into(),
        }
    }

    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::MissingInput(_))
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
