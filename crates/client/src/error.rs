//! Unified error handling for the client.

use stockcount_core::{EmailError, translate_error};
use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::storage::StorageError;

/// Input rejected locally, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A cached category already has this name (ignoring case).
    #[error("Category already exists: {name}")]
    DuplicateCategoryName { name: String },

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{field} is required")]
    Required { field: &'static str },
}

/// Application-level error type for the client library.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Inventory API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Auth provider call failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Snapshot storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The action needs a session and there is none.
    #[error("Not authenticated")]
    Unauthenticated,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ClientError {
    /// The text shown to the operator.
    ///
    /// Every error the CLI prints goes through here.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::Network(e)) if e.is_timeout() => translate_error(None, "timeout"),
            Self::Api(ApiError::Network(_)) => translate_error(None, "network error"),
            Self::Auth(AuthError::Network(_)) => translate_error(None, "network error"),
            Self::Auth(e) => translate_error(e.code(), &e.to_string()),
            _ => translate_error(None, &self.to_string()),
        }
    }

    /// Whether the session was missing or rejected by the backend.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Unauthenticated => true,
            Self::Api(e) => e.status() == Some(401),
            _ => false,
        }
    }
}
