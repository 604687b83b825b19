//! Shutdown Coordination
//!
//! A cooperative cancellation primitive: a flag that can be polled between
//! units of work, paired with a broadcast channel that sleeping tasks can race
//! against. The binary also hooks process signals into it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Coordinates graceful shutdown between the owner of a task and the task
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        // Larger than one so bursts of signals never block the sender
        let (shutdown_tx, _) = broadcast::channel(8);
        Self {
            shutdown_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a listener for the task side
    ///
    /// Listeners created after `trigger_shutdown()` still observe the request
    /// through the flag.
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            shutdown_rx: self.shutdown_tx.subscribe(),
            shutdown_requested: self.shutdown_requested.clone(),
        }
    }

    /// Trigger shutdown
    pub fn trigger_shutdown(&self) {
        // Release pairs with the Acquire load in is_shutdown_requested()
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    /// Check if shutdown has been requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Route SIGINT, SIGTERM, SIGHUP and SIGQUIT (or Ctrl-C elsewhere) into
    /// this coordinator. A second signal exits the process immediately.
    pub fn install_signal_handlers(&self) {
        setup_signal_handlers(self.shutdown_tx.clone(), self.shutdown_requested.clone());
    }
}

/// Task-side view of a [`ShutdownCoordinator`]
pub struct ShutdownListener {
    shutdown_rx: broadcast::Receiver<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownListener {
    /// Non-blocking check, used between units of work
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Resolves once shutdown has been requested
    ///
    /// A lagged or closed channel counts as a shutdown request.
    pub async fn cancelled(&mut self) {
        if self.is_shutdown_requested() {
            return;
        }
        let _ = self.shutdown_rx.recv().await;
    }

    /// Sleep for `duration` unless shutdown is requested first
    ///
    /// Returns `true` when the full duration elapsed.
    pub async fn sleep(&mut self, duration: std::time::Duration) -> bool {
        if duration.is_zero() {
            return !self.is_shutdown_requested();
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_shutdown_requested(),
            _ = self.cancelled() => false,
        }
    }

    /// Sleep until `deadline` unless shutdown is requested first
    pub async fn sleep_until(&mut self, deadline: tokio::time::Instant) -> bool {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => !self.is_shutdown_requested(),
            _ = self.cancelled() => false,
        }
    }
}

fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>, shutdown_requested: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        use std::sync::atomic::AtomicUsize;
        use tokio::signal::unix::{signal, SignalKind};
        let signal_count = Arc::new(AtomicUsize::new(0));
        let signals = [
            SignalKind::interrupt(),
            SignalKind::terminate(),
            SignalKind::hangup(),
            SignalKind::quit(),
        ];

        for kind in signals {
            let tx = shutdown_tx.clone();
            let requested = shutdown_requested.clone();
            let sig_ctr = signal_count.clone();

            tokio::spawn(async move {
                if let Ok(mut sig) = signal(kind) {
                    while sig.recv().await.is_some() {
                        let prev = sig_ctr.fetch_add(1, Ordering::AcqRel);
                        requested.store(true, Ordering::Release);
                        let _ = tx.send(());
                        if prev >= 1 {
                            log::warn!("Second signal received; exiting without draining");
                            std::process::exit(130);
                        }
                        log::info!("Signal received; draining monitor (send again to force exit)");
                    }
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            let mut seen = false;
            while tokio::signal::ctrl_c().await.is_ok() {
                shutdown_requested.store(true, Ordering::Release);
                let _ = shutdown_tx.send(());
                if seen {
                    std::process::exit(130);
                }
                seen = true;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_shutdown_coordinator_creation() {
        let coordinator = ShutdownCoordinator::new();
        let listener = coordinator.listener();

        assert!(!coordinator.is_shutdown_requested());
        assert!(!listener.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_trigger_wakes_listener() {
        let coordinator = ShutdownCoordinator::new();
        let mut listener = coordinator.listener();

        coordinator.trigger_shutdown();

        assert!(coordinator.is_shutdown_requested());
        let woke = timeout(Duration::from_millis(100), listener.cancelled()).await;
        assert!(woke.is_ok(), "listener should observe the shutdown request");
    }

    #[tokio::test]
    async fn test_late_listener_sees_flag() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.trigger_shutdown();

        let mut late = coordinator.listener();
        assert!(late.is_shutdown_requested());
        let woke = timeout(Duration::from_millis(100), late.cancelled()).await;
        assert!(woke.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let mut listener = coordinator.listener();

        assert!(listener.sleep(Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let mut listener = coordinator.listener();

        let trigger = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.trigger_shutdown();
        });

        let started = tokio::time::Instant::now();
        assert!(!listener.sleep(Duration::from_secs(1800)).await);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
