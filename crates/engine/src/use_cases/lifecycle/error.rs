//! Failures a lifecycle operation reports to its caller.

use questline_domain::{DomainError, Role};

use crate::infrastructure::ports::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// No valid principal attached to the request.
    #[error("Authentication required")]
    Unauthorized,

    /// The principal lacks the required role.
    #[error("Requires role {required}")]
    Forbidden { required: Role },

    #[error("{kind} not found: {token}")]
    NotFound { kind: &'static str, token: String },

    /// Payload failed required-field or enumerated-value constraints.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The patch document could not be applied cleanly.
    #[error("Patch failed: {0}")]
    Patch(String),

    #[error("Store error: {0}")]
    Store(#[from] RepoError),
}

impl ResourceError {
    pub fn not_found(kind: &'static str, token: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            token: token.into(),
        }
    }

    pub fn validation(message: impl ToString) -> Self {
        Self::Validation(message.to_string())
    }

    pub fn patch(message: impl ToString) -> Self {
        Self::Patch(message.to_string())
    }

    /// Message safe to show to clients. Store details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<DomainError> for ResourceError {
    fn from(e: DomainError) -> Self {
        Self::Validation(e.to_string())
    }
}
