// Internal modules - all access should go through api module
pub(crate) mod config;
pub(crate) mod engine;
pub(crate) mod error;
pub(crate) mod scheduler;

// Public API module - the only public interface for the polling loop
pub mod api;

#[cfg(test)]
mod tests;
