//! In-memory store and the state model shared with the JSON file store

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::registry::api::FineRecord;

use super::error::PersistenceError;
use super::traits::PersistenceStore;
use super::types::{UserId, VehicleBinding};

type FineKey = (UserId, String, String);

/// Bindings and fines held by a store
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct StoreState {
    bindings: BTreeMap<UserId, VehicleBinding>,
    fines: BTreeMap<FineKey, FineRecord>,
}

/// On-disk layout of [`StoreState`]
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoreDocument {
    #[serde(default)]
    bindings: Vec<VehicleBinding>,
    #[serde(default)]
    fines: Vec<StoredFine>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredFine {
    user_id: UserId,
    #[serde(flatten)]
    record: FineRecord,
}

impl From<StoreDocument> for StoreState {
    fn from(document: StoreDocument) -> Self {
        let bindings = document
            .bindings
            .into_iter()
            .map(|binding| (binding.user_id, binding))
            .collect();
        let fines = document
            .fines
            .into_iter()
            .map(|stored| {
                let key = fine_key(
                    stored.user_id,
                    &stored.record.plate_number,
                    &stored.record.order_number,
                );
                (key, stored.record)
            })
            .collect();
        Self { bindings, fines }
    }
}

impl From<&StoreState> for StoreDocument {
    fn from(state: &StoreState) -> Self {
        Self {
            bindings: state.bindings.values().cloned().collect(),
            fines: state
                .fines
                .iter()
                .map(|((user_id, _, _), record)| StoredFine {
                    user_id: *user_id,
                    record: record.clone(),
                })
                .collect(),
        }
    }
}

fn fine_key(user_id: UserId, plate_number: &str, order_number: &str) -> FineKey {
    (
        user_id,
        plate_number.to_uppercase(),
        order_number.to_string(),
    )
}

impl StoreState {
    pub(crate) fn put_binding(&mut self, binding: VehicleBinding) {
        self.bindings.insert(binding.user_id, binding);
    }

    pub(crate) fn contains_binding(&self, user_id: UserId) -> bool {
        self.bindings.contains_key(&user_id)
    }

    pub(crate) fn binding(&self, user_id: UserId) -> Option<&VehicleBinding> {
        self.bindings.get(&user_id)
    }

    pub(crate) fn list_bindings(&self) -> Vec<VehicleBinding> {
        self.bindings.values().cloned().collect()
    }

    /// Returns whether a binding was removed
    pub(crate) fn remove_binding(&mut self, user_id: UserId) -> bool {
        self.bindings.remove(&user_id).is_some()
    }

    pub(crate) fn tracked_orders(&self, user_id: UserId) -> Result<BTreeSet<String>, PersistenceError> {
        self.bindings
            .get(&user_id)
            .map(|binding| binding.tracked_orders.clone())
            .ok_or(PersistenceError::MissingBinding { user_id })
    }

    pub(crate) fn replace_tracked_orders(
        &mut self,
        user_id: UserId,
        orders: BTreeSet<String>,
    ) -> Result<(), PersistenceError> {
        let binding = self
            .bindings
            .get_mut(&user_id)
            .ok_or(PersistenceError::MissingBinding { user_id })?;
        binding.tracked_orders = orders;
        binding.tracked_initialized = true;
        Ok(())
    }

    pub(crate) fn get_fine(
        &self,
        user_id: UserId,
        plate_number: &str,
        order_number: &str,
    ) -> Option<FineRecord> {
        self.fines
            .get(&fine_key(user_id, plate_number, order_number))
            .cloned()
    }

    pub(crate) fn upsert_fine(&mut self, user_id: UserId, record: &FineRecord) {
        let key = fine_key(user_id, &record.plate_number, &record.order_number);
        match self.fines.get_mut(&key) {
            Some(existing) => existing.absorb(record.clone()),
            None => {
                self.fines.insert(key, record.clone());
            }
        }
    }

    pub(crate) fn mark_notified(
        &mut self,
        user_id: UserId,
        plate_number: &str,
        order_number: &str,
    ) -> Result<(), PersistenceError> {
        let record = self
            .fines
            .get_mut(&fine_key(user_id, plate_number, order_number))
            .ok_or_else(|| PersistenceError::MissingRecord {
                user_id,
                order_number: order_number.to_string(),
            })?;
        record.notified = true;
        Ok(())
    }
}

/// Store kept in process memory
///
/// Bindings are listed by ascending user id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bindings(bindings: impl IntoIterator<Item = VehicleBinding>) -> Self {
        let mut state = StoreState::default();
        for binding in bindings {
            state.put_binding(binding);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Insert or replace a binding, as the subscription system does
    pub async fn put_binding(&self, binding: VehicleBinding) {
        self.state.write().await.put_binding(binding);
    }

    pub async fn binding(&self, user_id: UserId) -> Option<VehicleBinding> {
        self.state.read().await.binding(user_id).cloned()
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn list_bindings(&self) -> Result<Vec<VehicleBinding>, PersistenceError> {
        Ok(self.state.read().await.list_bindings())
    }

    async fn remove_binding(&self, user_id: UserId) -> Result<(), PersistenceError> {
        self.state.write().await.remove_binding(user_id);
        Ok(())
    }

    async fn tracked_orders(&self, user_id: UserId) -> Result<BTreeSet<String>, PersistenceError> {
        self.state.read().await.tracked_orders(user_id)
    }

    async fn replace_tracked_orders(
        &self,
        user_id: UserId,
        orders: BTreeSet<String>,
    ) -> Result<(), PersistenceError> {
        self.state.write().await.replace_tracked_orders(user_id, orders)
    }

    async fn get_fine(
        &self,
        user_id: UserId,
        plate_number: &str,
        order_number: &str,
    ) -> Result<Option<FineRecord>, PersistenceError> {
        Ok(self
            .state
            .read()
            .await
            .get_fine(user_id, plate_number, order_number))
    }

    async fn upsert_fine(&self, user_id: UserId, record: &FineRecord) -> Result<(), PersistenceError> {
        self.state.write().await.upsert_fine(user_id, record);
        Ok(())
    }

    async fn mark_notified(
        &self,
        user_id: UserId,
        plate_number: &str,
        order_number: &str,
    ) -> Result<(), PersistenceError> {
        self.state
            .write()
            .await
            .mark_notified(user_id, plate_number, order_number)
    }
}
