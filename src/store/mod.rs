//! Persistence of bindings and fine history
//!
//! The monitor only depends on [`api::PersistenceStore`]. Two adapters are
//! bundled: an in-memory store and a JSON document on disk.

pub(crate) mod error;
pub(crate) mod json_file;
pub(crate) mod memory;
pub(crate) mod traits;
pub(crate) mod types;

pub mod api;

#[cfg(test)]
mod tests;
