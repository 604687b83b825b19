//! Logged-in session against the registry

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::time::TimeProvider;

use super::config::RegistryConfig;
use super::error::{AuthError, TransportError};
use super::traits::Authenticator;
use super::transport::{HttpTransport, RegistryRequest};

/// Cookies issued by a successful login
///
/// Owned by [`SessionManager`] and replaced as a whole on every login.
#[derive(Debug, PartialEq, Eq)]
pub struct Session {
    cookies: BTreeMap<String, String>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(cookies: BTreeMap<String, String>, created_at: DateTime<Utc>) -> Self {
        Self {
            cookies,
            created_at,
        }
    }

    /// Build a session from raw `Set-Cookie` values
    ///
    /// Cookies the server deletes (empty value or `deleted`) are skipped.
    pub fn from_set_cookies(set_cookies: &[String], created_at: DateTime<Utc>) -> Self {
        let mut session = Self::new(BTreeMap::new(), created_at);
        session.merge_set_cookies(set_cookies);
        session
    }

    /// Apply `Set-Cookie` values from a later response
    ///
    /// Rotated cookies replace the old value and deleted ones are dropped;
    /// the session keeps its creation time. Returns whether anything changed.
    pub fn merge_set_cookies(&mut self, set_cookies: &[String]) -> bool {
        let mut changed = false;
        for header in set_cookies {
            let pair = header.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() {
                continue;
            }
            if value.is_empty() || value == "deleted" {
                changed |= self.cookies.remove(name).is_some();
            } else if self.cookie(name) != Some(value) {
                self.cookies.insert(name.to_string(), value.to_string());
                changed = true;
            }
        }
        changed
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Value for a `Cookie` request header
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// A session is live while it holds a cookie and, when `max_age` is
    /// set, is younger than it
    pub fn is_live(&self, now: DateTime<Utc>, max_age: Option<chrono::Duration>) -> bool {
        if self.cookies.is_empty() {
            return false;
        }
        match max_age {
            Some(max_age) => now - self.created_at < max_age,
            None => true,
        }
    }
}

/// Logs in on demand and keeps the resulting session
pub struct SessionManager<T> {
    transport: T,
    config: Arc<RegistryConfig>,
    clock: Arc<dyn TimeProvider>,
    current: Option<Session>,
}

impl<T: HttpTransport> SessionManager<T> {
    pub fn new(transport: T, config: Arc<RegistryConfig>, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            transport,
            config,
            clock,
            current: None,
        }
    }

    /// Peek at the current session without checking it
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    fn max_age(&self) -> Option<chrono::Duration> {
        self.config
            .session_max_age
            .and_then(|age| chrono::Duration::from_std(age).ok())
    }

    fn installed(&self) -> Result<&Session, AuthError> {
        self.current.as_ref().ok_or_else(|| AuthError::Rejected {
            reason: "no session installed".to_string(),
        })
    }

    /// One login exchange; the old session is gone whatever the outcome
    async fn login(&mut self) -> Result<(), AuthError> {
        self.current = None;

        if self.config.login.trim().is_empty() || self.config.password.is_empty() {
            return Err(AuthError::Rejected {
                reason: "no registry credentials configured".to_string(),
            });
        }

        log::debug!("Logging in to {} as {}", self.config.base_url, self.config.login);
        let request = RegistryRequest::post_form(
            self.config.auth_url(),
            &[
                ("login", self.config.login.as_str()),
                ("password", self.config.password.as_str()),
            ],
        );
        let response = self.transport.send(request).await?;

        if response.status >= 500 {
            return Err(AuthError::Transport(TransportError::Protocol(format!(
                "login answered HTTP {}",
                response.status
            ))));
        }

        let marker = self.config.success_marker.as_str();
        let reached_marker = response
            .location
            .as_deref()
            .map(|location| location.contains(marker))
            .unwrap_or(false)
            || response.url.contains(marker);
        if !reached_marker {
            return Err(AuthError::Rejected {
                reason: format!("login answered HTTP {} without reaching {}", response.status, marker),
            });
        }

        let session = Session::from_set_cookies(&response.set_cookies, self.clock.now());
        if session.is_empty() {
            return Err(AuthError::Rejected {
                reason: "no session cookie issued".to_string(),
            });
        }

        log::info!("Logged in to registry");
        self.current = Some(session);
        Ok(())
    }
}

#[async_trait]
impl<T: HttpTransport> Authenticator for SessionManager<T> {
    async fn ensure_session(&mut self) -> Result<&Session, AuthError> {
        let now = self.clock.now();
        let max_age = self.max_age();
        let live = self
            .current
            .as_ref()
            .map(|session| session.is_live(now, max_age))
            .unwrap_or(false);

        if !live {
            if self.current.is_some() {
                log::debug!("Session no longer live; logging in again");
            }
            self.login().await?;
        }
        self.installed()
    }

    async fn reauthenticate(&mut self) -> Result<&Session, AuthError> {
        log::info!("Registry rejected the session; logging in again");
        self.login().await?;
        self.installed()
    }

    fn invalidate(&mut self) {
        if self.current.take().is_some() {
            log::debug!("Session invalidated");
        }
    }

    fn refresh_cookies(&mut self, set_cookies: &[String]) {
        if let Some(session) = self.current.as_mut() {
            if session.merge_set_cookies(set_cookies) {
                log::debug!("Session cookies refreshed by the registry");
            }
        }
    }
}
