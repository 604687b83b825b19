//! Monitored plates

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::validation::{normalize_plate, ValidationError};

pub type UserId = i64;

/// One user's monitored plate
///
/// Every order in `tracked_orders` has been seen on `plate_number` while
/// this binding existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleBinding {
    pub user_id: UserId,
    pub plate_number: String,
    pub subscription_expires_at: DateTime<Utc>,
    #[serde(default)]
    pub tracked_orders: BTreeSet<String>,
    /// False until the first check recorded a baseline of existing fines
    #[serde(default)]
    pub tracked_initialized: bool,
}

impl VehicleBinding {
    /// A freshly activated binding; every fine it finds is reported
    pub fn new(
        user_id: UserId,
        plate_number: &str,
        subscription_expires_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            user_id,
            plate_number: normalize_plate(plate_number)?,
            subscription_expires_at,
            tracked_orders: BTreeSet::new(),
            tracked_initialized: true,
        })
    }

    /// A binding without a tracked list; its first check is silent
    pub fn without_baseline(
        user_id: UserId,
        plate_number: &str,
        subscription_expires_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            tracked_initialized: false,
            ..Self::new(user_id, plate_number, subscription_expires_at)?
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.subscription_expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_new_binding_normalises_plate() {
        let expires = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let binding = VehicleBinding::new(7, "01abc123", expires).unwrap();

        assert_eq!(binding.plate_number, "01ABC123");
        assert!(binding.tracked_orders.is_empty());
        assert!(binding.tracked_initialized);
        assert!(VehicleBinding::new(7, "  ", expires).is_err());
    }

    #[test]
    fn test_expiry_boundary() {
        let expires = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let binding = VehicleBinding::new(7, "01ABC123", expires).unwrap();

        assert!(!binding.is_expired(expires - Duration::seconds(1)));
        assert!(binding.is_expired(expires));
    }

    #[test]
    fn test_legacy_rows_deserialize_uninitialised() {
        let json = r#"{"user_id":5,"plate_number":"01ABC123","subscription_expires_at":"2026-01-01T00:00:00Z"}"#;
        let binding: VehicleBinding = serde_json::from_str(json).unwrap();

        assert!(!binding.tracked_initialized);
        assert!(binding.tracked_orders.is_empty());
    }
}
