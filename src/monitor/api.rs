//! Public API for the polling loop

pub use crate::monitor::config::{
    MonitorConfig, DEFAULT_DRAIN_TIMEOUT, DEFAULT_MAX_NOTIFY_ATTEMPTS, DEFAULT_NOTIFY_DELAY,
    DEFAULT_POLL_INTERVAL, DEFAULT_RATE_LIMIT_DELAY,
};
pub use crate::monitor::engine::{CycleReport, MonitorEngine};
pub use crate::monitor::error::{BindingError, MonitorError};
pub use crate::monitor::scheduler::{MonitorScheduler, SchedulerState, StopOutcome};
