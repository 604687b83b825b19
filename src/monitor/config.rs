//! Pacing and retry settings for the polling loop

use std::time::Duration;

use crate::notifications::api::PaymentLinkBuilder;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1800);
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_NOTIFY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_NOTIFY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Period between cycle starts
    pub poll_interval: Duration,
    /// Pause between two bindings that both hit the registry
    pub rate_limit_delay: Duration,
    /// How long `stop()` waits for the in-flight cycle
    pub drain_timeout: Duration,
    /// Pause between two notifications for the same binding
    pub notify_delay: Duration,
    /// Failed dispatches before a fine is given up on; 0 retries forever
    pub max_notify_attempts: u32,
    pub payment_links: PaymentLinkBuilder,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            rate_limit_delay: DEFAULT_RATE_LIMIT_DELAY,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            notify_delay: DEFAULT_NOTIFY_DELAY,
            max_notify_attempts: DEFAULT_MAX_NOTIFY_ATTEMPTS,
            payment_links: PaymentLinkBuilder::default(),
        }
    }
}

impl MonitorConfig {
    /// True once `attempts` failed dispatches exhaust the retry budget
    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_notify_attempts > 0 && attempts >= self.max_notify_attempts
    }
}
