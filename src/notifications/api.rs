//! Public API for the notification system
//!
//! The monitor raises a [`FineNotification`] for every newly detected fine
//! and hands it to a [`NotificationDispatcher`]. How the user is reached is
//! up to the dispatcher.

pub use crate::notifications::dispatchers::{ChannelDispatcher, JsonLinesDispatcher, LogDispatcher};
pub use crate::notifications::error::NotificationError;
pub use crate::notifications::event::{
    event_id, FineNotification, PaymentLinkBuilder, DEFAULT_PAYMENT_URL_TEMPLATE,
};
pub use crate::notifications::traits::NotificationDispatcher;
