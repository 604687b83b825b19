//! Persistence contract used by the monitor

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::registry::api::FineRecord;

use super::error::PersistenceError;
use super::types::{UserId, VehicleBinding};

/// Durable bindings and fine history
///
/// Fines are keyed by (user, plate, order) so users watching the same plate
/// keep separate notification state.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// All bindings in a stable order
    async fn list_bindings(&self) -> Result<Vec<VehicleBinding>, PersistenceError>;

    /// Removing a binding that does not exist is not an error
    async fn remove_binding(&self, user_id: UserId) -> Result<(), PersistenceError>;

    async fn tracked_orders(&self, user_id: UserId) -> Result<BTreeSet<String>, PersistenceError>;

    /// Replace the tracked set and mark the binding initialised
    async fn replace_tracked_orders(
        &self,
        user_id: UserId,
        orders: BTreeSet<String>,
    ) -> Result<(), PersistenceError>;

    async fn get_fine(
        &self,
        user_id: UserId,
        plate_number: &str,
        order_number: &str,
    ) -> Result<Option<FineRecord>, PersistenceError>;

    /// Insert or update; an existing `notified = true` is never cleared
    async fn upsert_fine(&self, user_id: UserId, record: &FineRecord) -> Result<(), PersistenceError>;

    async fn mark_notified(
        &self,
        user_id: UserId,
        plate_number: &str,
        order_number: &str,
    ) -> Result<(), PersistenceError>;
}
