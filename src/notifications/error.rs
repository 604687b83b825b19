//! Error types for notification delivery

use crate::core::error_handling::ContextualError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("Channel closed for dispatcher: {0}")]
    ChannelClosed(String),
    #[error("Channel full: {0}")]
    ChannelFull(String),
    #[error("Delivery of {event_id} failed: {message}")]
    DeliveryFailed { event_id: String, message: String },
}

impl ContextualError for NotificationError {
    fn severity(&self) -> log::Level {
        log::Level::Warn
    }

    fn is_transient(&self) -> bool {
        !matches!(self, NotificationError::ChannelClosed(_))
    }
}
