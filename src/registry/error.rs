//! Error types for the registry client

use crate::core::error_handling::ContextualError;

/// Failure of the HTTP layer itself
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("connection to {url} failed: {message}")]
    Connection { url: String, message: String },
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Failure to obtain a logged-in session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("login rejected: {reason}")]
    Rejected { reason: String },
    #[error("login request failed: {0}")]
    Transport(#[from] TransportError),
}

/// Failure to fetch or interpret a fines listing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeError {
    /// The registry answered with its login page instead of the listing
    #[error("session expired: {reason}")]
    Auth { reason: String },
    #[error("network error: {message}")]
    Network { message: String },
    #[error("unparsable listing for {plate}: {reason}")]
    Parse { plate: String, reason: String },
}

impl From<TransportError> for ScrapeError {
    fn from(error: TransportError) -> Self {
        ScrapeError::Network {
            message: error.to_string(),
        }
    }
}

impl ContextualError for TransportError {
    fn severity(&self) -> log::Level {
        log::Level::Warn
    }

    fn is_transient(&self) -> bool {
        true
    }
}

impl ContextualError for AuthError {
    fn severity(&self) -> log::Level {
        log::Level::Warn
    }

    fn is_transient(&self) -> bool {
        matches!(self, AuthError::Transport(_))
    }
}

impl ContextualError for ScrapeError {
    fn severity(&self) -> log::Level {
        match self {
            ScrapeError::Parse { .. } => log::Level::Error,
            ScrapeError::Auth { .. } | ScrapeError::Network { .. } => log::Level::Warn,
        }
    }

    fn is_transient(&self) -> bool {
        !matches!(self, ScrapeError::Parse { .. })
    }
}
