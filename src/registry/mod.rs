//! Registry client
//!
//! Logging in, fetching the fines listing for a plate and reading it into
//! [`api::FineListing`]. Everything else in the crate goes through
//! [`api`].

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod html;
pub(crate) mod parser;
pub(crate) mod scraper;
pub(crate) mod session;
pub(crate) mod traits;
pub(crate) mod transport;
pub(crate) mod types;

pub mod api;

#[cfg(test)]
mod tests;
