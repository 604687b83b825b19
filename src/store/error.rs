//! Error types for the persistence layer

use crate::core::error_handling::ContextualError;

use super::types::UserId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store file {path} is corrupt: {message}")]
    Corrupt { path: String, message: String },
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("no binding for user {user_id}")]
    MissingBinding { user_id: UserId },
    #[error("no stored fine {order_number} for user {user_id}")]
    MissingRecord { user_id: UserId, order_number: String },
}

impl PersistenceError {
    pub(crate) fn io(path: &std::path::Path, error: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }
}

impl ContextualError for PersistenceError {
    fn severity(&self) -> log::Level {
        log::Level::Error
    }

    fn is_transient(&self) -> bool {
        matches!(
            self,
            PersistenceError::Unavailable(_) | PersistenceError::Io { .. }
        )
    }
}
