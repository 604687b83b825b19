//! Seams the monitor uses to talk to the registry

use async_trait::async_trait;

use super::error::{AuthError, ScrapeError};
use super::session::Session;
use super::types::FineListing;

/// Owner of the one logged-in session
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Return a live session, logging in first when there is none
    async fn ensure_session(&mut self) -> Result<&Session, AuthError>;

    /// Discard the current session and log in exactly once
    async fn reauthenticate(&mut self) -> Result<&Session, AuthError>;

    /// Discard the current session without logging in
    fn invalidate(&mut self);

    /// Merge cookies the registry set on an accepted response
    fn refresh_cookies(&mut self, set_cookies: &[String]);
}

/// Fetches and parses the fines listing for one plate
#[async_trait]
pub trait FineFetcher: Send + Sync {
    async fn fetch_fines(&self, session: &Session, plate: &str) -> Result<FineListing, ScrapeError>;
}
