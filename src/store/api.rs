//! Public API for the persistence layer

pub use crate::store::error::PersistenceError;
pub use crate::store::json_file::JsonFileStore;
pub use crate::store::memory::MemoryStore;
pub use crate::store::traits::PersistenceStore;
pub use crate::store::types::{UserId, VehicleBinding};
