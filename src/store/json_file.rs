//! Store backed by one JSON document on disk

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::registry::api::FineRecord;

use super::error::PersistenceError;
use super::memory::{StoreDocument, StoreState};
use super::traits::PersistenceStore;
use super::types::{UserId, VehicleBinding};

/// Store that rewrites its JSON file after every change
///
/// Writes go to a sibling temporary file that is then renamed over the
/// document, so readers never see a partial file. A change whose write
/// fails is rolled back in memory.
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonFileStore {
    /// Open the document at `path`; a missing file is an empty store
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => StoreState::default(),
            Ok(text) => {
                let document: StoreDocument =
                    serde_json::from_str(&text).map_err(|e| PersistenceError::Corrupt {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })?;
                StoreState::from(document)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No store at {}; starting empty", path.display());
                StoreState::default()
            }
            Err(e) => return Err(PersistenceError::io(&path, e)),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace a binding, as the subscription system does
    pub async fn put_binding(&self, binding: VehicleBinding) -> Result<(), PersistenceError> {
        self.mutate(|state| {
            state.put_binding(binding);
            Ok(())
        })
        .await
    }

    /// Apply `change` and persist the result
    async fn mutate<R>(
        &self,
        change: impl FnOnce(&mut StoreState) -> Result<R, PersistenceError>,
    ) -> Result<R, PersistenceError> {
        let mut state = self.state.lock().await;
        let before = state.clone();

        let result = change(&mut *state)?;
        if let Err(e) = self.write(&*state).await {
            *state = before;
            return Err(e);
        }
        Ok(result)
    }

    async fn write(&self, state: &StoreState) -> Result<(), PersistenceError> {
        let text = serde_json::to_string_pretty(&StoreDocument::from(state))
            .map_err(|e| PersistenceError::Unavailable(format!("cannot serialise store: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::io(parent, e))?;
        }

        let temporary = temporary_path(&self.path);
        tokio::fs::write(&temporary, text)
            .await
            .map_err(|e| PersistenceError::io(&temporary, e))?;
        tokio::fs::rename(&temporary, &self.path)
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))?;

        log::trace!("Store written to {}", self.path.display());
        Ok(())
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "store.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl PersistenceStore for JsonFileStore {
    async fn list_bindings(&self) -> Result<Vec<VehicleBinding>, PersistenceError> {
        Ok(self.state.lock().await.list_bindings())
    }

    async fn remove_binding(&self, user_id: UserId) -> Result<(), PersistenceError> {
        let exists = self.state.lock().await.contains_binding(user_id);
        if !exists {
            return Ok(());
        }
        self.mutate(|state| {
            state.remove_binding(user_id);
            Ok(())
        })
        .await
    }

    async fn tracked_orders(&self, user_id: UserId) -> Result<BTreeSet<String>, PersistenceError> {
        self.state.lock().await.tracked_orders(user_id)
    }

    async fn replace_tracked_orders(
        &self,
        user_id: UserId,
        orders: BTreeSet<String>,
    ) -> Result<(), PersistenceError> {
        self.mutate(|state| state.replace_tracked_orders(user_id, orders))
            .await
    }

    async fn get_fine(
        &self,
        user_id: UserId,
        plate_number: &str,
        order_number: &str,
    ) -> Result<Option<FineRecord>, PersistenceError> {
        Ok(self
            .state
            .lock()
            .await
            .get_fine(user_id, plate_number, order_number))
    }

    async fn upsert_fine(&self, user_id: UserId, record: &FineRecord) -> Result<(), PersistenceError> {
        self.mutate(|state| {
            state.upsert_fine(user_id, record);
            Ok(())
        })
        .await
    }

    async fn mark_notified(
        &self,
        user_id: UserId,
        plate_number: &str,
        order_number: &str,
    ) -> Result<(), PersistenceError> {
        self.mutate(|state| state.mark_notified(user_id, plate_number, order_number))
            .await
    }
}
