//! Time provider abstraction for testable time-dependent logic

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// Abstraction over wall-clock time
///
/// Subscription expiry, session age and notification timestamps all read
/// the clock through this trait so tests can move time explicitly.
pub trait TimeProvider: Send + Sync {
    /// Current wall-clock time in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Production time provider using actual system time
#[derive(Debug, Default, Clone)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven time provider for deterministic tests
#[derive(Debug, Clone)]
pub struct MockTimeProvider {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for MockTimeProvider {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl MockTimeProvider {
    /// Create a mock provider frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move time forward
    pub fn advance(&self, duration: chrono::Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += duration;
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, time: DateTime<Utc>) {
        if let Ok(mut current) = self.current.lock() {
            *current = time;
        }
    }
}

impl TimeProvider for MockTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        match self.current.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_system_time_provider() {
        let provider = SystemTimeProvider;

        let first = provider.now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = provider.now();

        assert!(second > first);
    }

    #[test]
    fn test_mock_time_provider_advance() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let provider = MockTimeProvider::new(start);

        provider.advance(Duration::minutes(30));

        assert_eq!(provider.now(), start + Duration::minutes(30));
    }

    #[test]
    fn test_mock_time_provider_clones_share_time() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let provider = MockTimeProvider::new(start);
        let shared = provider.clone();

        let later = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        provider.set(later);

        assert_eq!(shared.now(), later);
    }
}
