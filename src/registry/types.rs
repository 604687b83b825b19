//! Records read from the registry

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Which of the four media columns a link came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
    FirstPhoto,
    SecondPhoto,
    ExtraPhoto,
    Video,
}

impl MediaKind {
    /// Media kind for the zero-based media column of a fines row
    pub fn from_column(index: usize) -> Option<Self> {
        match index {
            0 => Some(MediaKind::FirstPhoto),
            1 => Some(MediaKind::SecondPhoto),
            2 => Some(MediaKind::ExtraPhoto),
            3 => Some(MediaKind::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLink {
    pub kind: MediaKind,
    pub url: String,
}

impl MediaLink {
    pub fn new(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }
}

/// One violation as listed by the registry
///
/// `order_number` identifies the record within a plate. `notified` only ever
/// goes from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineRecord {
    pub order_number: String,
    pub plate_number: String,
    pub violation_type: String,
    pub violation_date: String,
    pub amount: String,
    #[serde(default)]
    pub outstanding_info: Option<String>,
    #[serde(default)]
    pub media_links: Vec<MediaLink>,
    #[serde(default)]
    pub notified: bool,
    #[serde(default)]
    pub notify_attempts: u32,
}

impl FineRecord {
    pub fn new(
        order_number: impl Into<String>,
        plate_number: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            order_number: order_number.into(),
            plate_number: plate_number.into(),
            violation_type: String::new(),
            violation_date: String::new(),
            amount: amount.into(),
            outstanding_info: None,
            media_links: Vec::new(),
            notified: false,
            notify_attempts: 0,
        }
    }

    pub fn with_violation(mut self, violation_type: &str, violation_date: &str) -> Self {
        self.violation_type = violation_type.to_string();
        self.violation_date = violation_date.to_string();
        self
    }

    pub fn with_outstanding(mut self, outstanding: &str) -> Self {
        self.outstanding_info = Some(outstanding.to_string());
        self
    }

    pub fn with_media(mut self, link: MediaLink) -> Self {
        self.media_links.push(link);
        self
    }

    /// True when the values a user cares about differ from `stored`
    pub fn differs_from(&self, stored: &FineRecord) -> bool {
        self.amount != stored.amount || self.outstanding_info != stored.outstanding_info
    }

    /// Fold a freshly scraped copy of this record into the stored one
    ///
    /// Scraped values win, except that `notified` never goes back to false,
    /// an empty media list keeps the stored links and the attempt counter
    /// never decreases.
    pub fn absorb(&mut self, incoming: FineRecord) {
        let notified = self.notified || incoming.notified;
        let notify_attempts = self.notify_attempts.max(incoming.notify_attempts);
        let media_links = if incoming.media_links.is_empty() {
            std::mem::take(&mut self.media_links)
        } else {
            incoming.media_links
        };

        self.order_number = incoming.order_number;
        self.plate_number = incoming.plate_number;
        self.violation_type = incoming.violation_type;
        self.violation_date = incoming.violation_date;
        self.amount = incoming.amount;
        self.outstanding_info = incoming.outstanding_info;
        self.media_links = media_links;
        self.notified = notified;
        self.notify_attempts = notify_attempts;
    }
}

/// Vehicle summary block of a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub plate: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub year: Option<String>,
    pub vin: Option<String>,
    pub owner: Option<String>,
    pub fine_count: Option<String>,
    pub total_amount: Option<String>,
}

impl VehicleInfo {
    pub fn is_empty(&self) -> bool {
        self == &VehicleInfo::default()
    }
}

/// Values of the registry's "pay all fines" form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayAllForm {
    pub amount: String,
    pub plate: String,
}

/// Everything one listing request yields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineListing {
    pub vehicle: VehicleInfo,
    pub fines: Vec<FineRecord>,
    pub pay_all: Option<PayAllForm>,
    /// `Set-Cookie` values from the accepted listing and detail responses
    #[serde(skip)]
    pub set_cookies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_columns() {
        assert_eq!(MediaKind::from_column(0), Some(MediaKind::FirstPhoto));
        assert_eq!(MediaKind::from_column(3), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_column(4), None);
        assert_eq!(MediaKind::ExtraPhoto.to_string(), "extra_photo");
    }

    #[test]
    fn test_differs_from_tracks_amount_and_outstanding() {
        let stored = FineRecord::new("F-1", "01ABC123", "250").with_outstanding("unpaid");

        let same = stored.clone().with_violation("Speeding", "2025-01-01");
        assert!(!same.differs_from(&stored));

        let paid = FineRecord::new("F-1", "01ABC123", "250").with_outstanding("paid");
        assert!(paid.differs_from(&stored));

        let cheaper = FineRecord::new("F-1", "01ABC123", "200").with_outstanding("unpaid");
        assert!(cheaper.differs_from(&stored));
    }

    #[test]
    fn test_absorb_never_clears_notified() {
        let mut stored = FineRecord::new("F-1", "01ABC123", "250")
            .with_media(MediaLink::new(MediaKind::FirstPhoto, "https://x/1.jpg"));
        stored.notified = true;
        stored.notify_attempts = 2;

        stored.absorb(FineRecord::new("F-1", "01ABC123", "300").with_outstanding("paid"));

        assert!(stored.notified);
        assert_eq!(stored.notify_attempts, 2);
        assert_eq!(stored.amount, "300");
        assert_eq!(stored.outstanding_info.as_deref(), Some("paid"));
        assert_eq!(stored.media_links.len(), 1, "empty media keeps stored links");
    }

    #[test]
    fn test_absorb_replaces_media_when_present() {
        let mut stored = FineRecord::new("F-1", "01ABC123", "250")
            .with_media(MediaLink::new(MediaKind::FirstPhoto, "https://x/old.jpg"));

        stored.absorb(
            FineRecord::new("F-1", "01ABC123", "250")
                .with_media(MediaLink::new(MediaKind::Video, "https://x/v")),
        );

        assert_eq!(
            stored.media_links,
            vec![MediaLink::new(MediaKind::Video, "https://x/v")]
        );
    }

    #[test]
    fn test_vehicle_info_is_empty() {
        assert!(VehicleInfo::default().is_empty());
        let info = VehicleInfo {
            model: Some("Camry".to_string()),
            ..Default::default()
        };
        assert!(!info.is_empty());
    }
}
