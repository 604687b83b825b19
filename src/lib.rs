//! Watches a vehicle-fines registry for the plates users subscribed to and
//! raises a notification event for every fine that appears.

pub mod app;
pub mod core;
pub mod diff;
pub mod monitor;
pub mod notifications;
pub mod registry;
pub mod store;
