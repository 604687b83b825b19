//! Bundled notification dispatchers

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};

use super::error::NotificationError;
use super::event::FineNotification;
use super::traits::NotificationDispatcher;

/// Writes each event to the log as one JSON object
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, notification: &FineNotification) -> Result<(), NotificationError> {
        let json = serde_json::to_string(notification).map_err(|e| {
            NotificationError::DeliveryFailed {
                event_id: notification.event_id.clone(),
                message: e.to_string(),
            }
        })?;
        log::info!(
            "New fine {} for user {} ({}): {}",
            notification.fine.order_number,
            notification.user_id,
            notification.plate_number,
            json
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Hands events to an in-process consumer over a bounded channel
///
/// Never waits for room: a full channel fails the dispatch so the fine is
/// retried next cycle.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<FineNotification>,
}

impl ChannelDispatcher {
    pub fn new(sender: mpsc::Sender<FineNotification>) -> Self {
        Self { sender }
    }

    /// Dispatcher plus the receiving end for the consumer
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<FineNotification>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl NotificationDispatcher for ChannelDispatcher {
    async fn send(&self, notification: &FineNotification) -> Result<(), NotificationError> {
        self.sender
            .try_send(notification.clone())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(event) => NotificationError::ChannelFull(format!(
                    "no room for {} (capacity {})",
                    event.event_id,
                    self.sender.max_capacity()
                )),
                mpsc::error::TrySendError::Closed(_) => {
                    NotificationError::ChannelClosed(self.name().to_string())
                }
            })
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Appends one JSON line per event to a file
pub struct JsonLinesDispatcher {
    path: PathBuf,
    file: Mutex<Option<tokio::fs::File>>,
}

impl JsonLinesDispatcher {
    /// The file is created on first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> std::io::Result<tokio::fs::File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
    }
}

#[async_trait]
impl NotificationDispatcher for JsonLinesDispatcher {
    async fn send(&self, notification: &FineNotification) -> Result<(), NotificationError> {
        let failed = |message: String| NotificationError::DeliveryFailed {
            event_id: notification.event_id.clone(),
            message,
        };

        let mut line = serde_json::to_string(notification).map_err(|e| failed(e.to_string()))?;
        line.push('\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            let file = self
                .open()
                .await
                .map_err(|e| failed(format!("{}: {}", self.path.display(), e)))?;
            *guard = Some(file);
        }

        let result = match guard.as_mut() {
            Some(file) => match file.write_all(line.as_bytes()).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            },
            None => return Err(failed("events file not open".to_string())),
        };

        if let Err(e) = result {
            // Reopen on the next event
            *guard = None;
            return Err(failed(format!("{}: {}", self.path.display(), e)));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "json-lines"
    }
}
