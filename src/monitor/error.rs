//! Error types for the polling loop

use crate::core::error_handling::ContextualError;
use crate::notifications::api::NotificationError;
use crate::registry::api::{AuthError, ScrapeError};
use crate::store::api::PersistenceError;

use super::scheduler::SchedulerState;

/// Errors the monitor reports to its owner
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Cannot {action} the monitor while it is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SchedulerState,
    },
    #[error("Cannot list bindings: {0}")]
    BindingsUnavailable(#[from] PersistenceError),
}

impl ContextualError for MonitorError {
    fn severity(&self) -> log::Level {
        match self {
            MonitorError::InvalidTransition { .. } => log::Level::Warn,
            MonitorError::BindingsUnavailable(_) => log::Level::Error,
        }
    }

    fn is_transient(&self) -> bool {
        match self {
            MonitorError::InvalidTransition { .. } => false,
            MonitorError::BindingsUnavailable(e) => e.is_transient(),
        }
    }
}

/// Anything that ends the processing of one binding for this cycle
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

impl ContextualError for BindingError {
    fn severity(&self) -> log::Level {
        match self {
            BindingError::Auth(e) => e.severity(),
            BindingError::Scrape(e) => e.severity(),
            BindingError::Persistence(e) => e.severity(),
            BindingError::Notification(e) => e.severity(),
        }
    }

    fn is_transient(&self) -> bool {
        match self {
            BindingError::Auth(e) => e.is_transient(),
            BindingError::Scrape(e) => e.is_transient(),
            BindingError::Persistence(e) => e.is_transient(),
            BindingError::Notification(e) => e.is_transient(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_error_keeps_inner_severity() {
        let parse: BindingError = ScrapeError::Parse {
            plate: "01ABC123".to_string(),
            reason: "no fines table".to_string(),
        }
        .into();
        assert_eq!(parse.severity(), log::Level::Error);
        assert!(!parse.is_transient());

        let network: BindingError = ScrapeError::Network {
            message: "reset".to_string(),
        }
        .into();
        assert_eq!(network.severity(), log::Level::Warn);
        assert!(network.is_transient());
        assert_eq!(network.to_string(), "network error: reset");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = MonitorError::InvalidTransition {
            action: "start",
            state: SchedulerState::Running,
        };
        assert_eq!(err.to_string(), "Cannot start the monitor while it is running");
    }
}
