//! Notification events raised for newly detected fines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::registry::api::{FineRecord, MediaLink, PayAllForm, VehicleInfo};
use crate::store::api::UserId;

pub const DEFAULT_PAYMENT_URL_TEMPLATE: &str =
    "https://pay.dc.tj/pay.php?a={order}&s={amount}&c=&f1=346&f2=#kortiMilli";

/// Everything a delivery channel needs to tell one user about one fine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineNotification {
    /// Stable per (user, plate, order); channels may use it to drop repeats
    pub event_id: String,
    pub user_id: UserId,
    pub plate_number: String,
    pub vehicle: VehicleInfo,
    pub fine: FineRecord,
    pub media_links: Vec<MediaLink>,
    pub payment_link: Option<String>,
    pub pay_all_link: Option<String>,
    pub detected_at: DateTime<Utc>,
}

impl FineNotification {
    pub fn new(
        user_id: UserId,
        plate_number: &str,
        vehicle: VehicleInfo,
        fine: FineRecord,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id(user_id, plate_number, &fine.order_number),
            user_id,
            plate_number: plate_number.to_string(),
            vehicle,
            media_links: fine.media_links.clone(),
            fine,
            payment_link: None,
            pay_all_link: None,
            detected_at,
        }
    }

    pub fn with_payment_links(mut self, links: &PaymentLinkBuilder, pay_all: Option<&PayAllForm>) -> Self {
        self.payment_link = links.for_fine(&self.fine);
        self.pay_all_link = pay_all.and_then(|form| links.for_pay_all(form));
        self
    }
}

/// SHA-256 over user, plate and order, hex encoded
pub fn event_id(user_id: UserId, plate_number: &str, order_number: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(plate_number.to_uppercase().as_bytes());
    hasher.update(b"\0");
    hasher.update(order_number.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fills the payment URL template
///
/// `{order}` becomes the URL-encoded order (or plate, for "pay all") and
/// `{amount}` the digits of the amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkBuilder {
    template: String,
}

impl Default for PaymentLinkBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PAYMENT_URL_TEMPLATE)
    }
}

impl PaymentLinkBuilder {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn for_fine(&self, fine: &FineRecord) -> Option<String> {
        self.fill(&fine.order_number, &fine.amount)
    }

    pub fn for_pay_all(&self, form: &PayAllForm) -> Option<String> {
        self.fill(&form.plate, &form.amount)
    }

    fn fill(&self, reference: &str, amount: &str) -> Option<String> {
        let reference = reference.trim();
        let digits: String = amount.chars().filter(|c| c.is_ascii_digit()).collect();
        if reference.is_empty() || digits.is_empty() {
            return None;
        }
        let encoded: String = url::form_urlencoded::byte_serialize(reference.as_bytes()).collect();
        Some(
            self.template
                .replace("{order}", &encoded)
                .replace("{amount}", &digits),
        )
    }
}
