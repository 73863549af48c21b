//! Errors surfaced by CLI commands.

use stockcount_client::{ClientError, ConfigError, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Cannot read {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("Nothing to update: pass at least one field")]
    EmptyUpdate,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl CliError {
    /// Text printed to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::Client(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        Self::Client(e.into())
    }
}
