//! Core services and infrastructure

pub mod error_handling;
pub mod logging;
pub mod shutdown;
pub mod time;
pub mod validation;
pub mod version;
