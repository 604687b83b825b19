//! Traits for the notification system

use async_trait::async_trait;

use super::error::NotificationError;
use super::event::FineNotification;

/// Delivers a notification to its recipient
///
/// `Ok` means the event has been handed over for good; the monitor marks
/// the fine as notified only then.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, notification: &FineNotification) -> Result<(), NotificationError>;

    /// Short name used in log lines
    fn name(&self) -> &str;
}
