//! Fakes for driving the engine without a registry

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::core::shutdown::ShutdownCoordinator;
use crate::core::time::MockTimeProvider;
use crate::monitor::api::{CycleReport, MonitorConfig, MonitorEngine};
use crate::notifications::api::{FineNotification, NotificationDispatcher, NotificationError};
use crate::registry::api::{
    AuthError, Authenticator, FineFetcher, FineListing, FineRecord, ScrapeError, Session,
};
use crate::store::api::{MemoryStore, PersistenceError, PersistenceStore, UserId, VehicleBinding};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
}

pub fn binding(user_id: UserId, plate: &str) -> VehicleBinding {
    VehicleBinding::new(user_id, plate, start_time() + chrono::Duration::days(30)).unwrap()
}

pub fn fine(order: &str, plate: &str, amount: &str, outstanding: &str) -> FineRecord {
    FineRecord::new(order, plate, amount)
        .with_violation("Speeding", "2025-05-30 08:15")
        .with_outstanding(outstanding)
}

pub fn listing(fines: Vec<FineRecord>) -> FineListing {
    FineListing {
        fines,
        ..FineListing::default()
    }
}

/// Engine settings without pacing
pub fn quick_config() -> MonitorConfig {
    MonitorConfig {
        rate_limit_delay: Duration::ZERO,
        notify_delay: Duration::ZERO,
        ..MonitorConfig::default()
    }
}

/// Listing responses scripted per plate; unscripted plates have no fines
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Result<FineListing, ScrapeError>>>>,
    calls: Mutex<Vec<String>>,
    delay: Mutex<Duration>,
}

impl ScriptedFetcher {
    pub fn push(&self, plate: &str, response: Result<FineListing, ScrapeError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(plate.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FineFetcher for ScriptedFetcher {
    async fn fetch_fines(&self, _session: &Session, plate: &str) -> Result<FineListing, ScrapeError> {
        self.calls.lock().unwrap().push(plate.to_string());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.scripts
            .lock()
            .unwrap()
            .get_mut(plate)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Ok(FineListing::default()))
    }
}

#[derive(Debug, Default)]
pub struct AuthCounters {
    pub logins: AtomicUsize,
    pub reauths: AtomicUsize,
    pub invalidations: AtomicUsize,
}

impl AuthCounters {
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn reauths(&self) -> usize {
        self.reauths.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

/// Authenticator that logs in without a network
pub struct StaticAuthenticator {
    session: Option<Session>,
    counters: Arc<AuthCounters>,
    fail_login: bool,
    fail_reauth: bool,
}

impl StaticAuthenticator {
    pub fn new(counters: Arc<AuthCounters>) -> Self {
        Self {
            session: None,
            counters,
            fail_login: false,
            fail_reauth: false,
        }
    }

    pub fn rejecting_login(mut self) -> Self {
        self.fail_login = true;
        self
    }

    pub fn rejecting_reauth(mut self) -> Self {
        self.fail_reauth = true;
        self
    }

    fn install(&mut self, fail: bool) -> Result<&Session, AuthError> {
        if fail {
            return Err(AuthError::Rejected {
                reason: "credentials refused".to_string(),
            });
        }
        self.counters.logins.fetch_add(1, Ordering::SeqCst);
        let cookies = BTreeMap::from([("PHPSESSID".to_string(), "test".to_string())]);
        Ok(&*self.session.insert(Session::new(cookies, start_time())))
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn ensure_session(&mut self) -> Result<&Session, AuthError> {
        if self.session.is_none() {
            return self.install(self.fail_login);
        }
        self.session.as_ref().ok_or_else(|| AuthError::Rejected {
            reason: "no session".to_string(),
        })
    }

    async fn reauthenticate(&mut self) -> Result<&Session, AuthError> {
        self.counters.reauths.fetch_add(1, Ordering::SeqCst);
        self.session = None;
        self.install(self.fail_reauth)
    }

    fn invalidate(&mut self) {
        self.counters.invalidations.fetch_add(1, Ordering::SeqCst);
        self.session = None;
    }

    fn refresh_cookies(&mut self, set_cookies: &[String]) {
        if let Some(session) = self.session.as_mut() {
            session.merge_set_cookies(set_cookies);
        }
    }
}

/// Dispatcher that records what it was asked to send
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<FineNotification>>,
    attempts: AtomicUsize,
    failures_left: AtomicUsize,
    always_fail: AtomicBool,
}

impl RecordingDispatcher {
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn fail_always(&self) {
        self.always_fail.store(true, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<FineNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_orders(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|event| event.fine.order_number)
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(&self, notification: &FineNotification) -> Result<(), NotificationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let scripted_failure = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if scripted_failure || self.always_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::DeliveryFailed {
                event_id: notification.event_id.clone(),
                message: "recipient unreachable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Memory store that can be told to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    fail_listing: AtomicBool,
    fail_upserts_for: Mutex<Option<UserId>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    pub fn fail_upserts_for(&self, user_id: UserId) {
        *self.fail_upserts_for.lock().unwrap() = Some(user_id);
    }
}

#[async_trait]
impl PersistenceStore for FlakyStore {
    async fn list_bindings(&self) -> Result<Vec<VehicleBinding>, PersistenceError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("database offline".to_string()));
        }
        self.inner.list_bindings().await
    }

    async fn remove_binding(&self, user_id: UserId) -> Result<(), PersistenceError> {
        self.inner.remove_binding(user_id).await
    }

    async fn tracked_orders(&self, user_id: UserId) -> Result<BTreeSet<String>, PersistenceError> {
        self.inner.tracked_orders(user_id).await
    }

    async fn replace_tracked_orders(
        &self,
        user_id: UserId,
        orders: BTreeSet<String>,
    ) -> Result<(), PersistenceError> {
        self.inner.replace_tracked_orders(user_id, orders).await
    }

    async fn get_fine(
        &self,
        user_id: UserId,
        plate_number: &str,
        order_number: &str,
    ) -> Result<Option<FineRecord>, PersistenceError> {
        self.inner.get_fine(user_id, plate_number, order_number).await
    }

    async fn upsert_fine(&self, user_id: UserId, record: &FineRecord) -> Result<(), PersistenceError> {
        if *self.fail_upserts_for.lock().unwrap() == Some(user_id) {
            return Err(PersistenceError::Unavailable("disk full".to_string()));
        }
        self.inner.upsert_fine(user_id, record).await
    }

    async fn mark_notified(
        &self,
        user_id: UserId,
        plate_number: &str,
        order_number: &str,
    ) -> Result<(), PersistenceError> {
        self.inner
            .mark_notified(user_id, plate_number, order_number)
            .await
    }
}

/// Shared handles on every fake an engine is built from
pub struct Harness {
    pub fetcher: Arc<ScriptedFetcher>,
    pub store: Arc<MemoryStore>,
    pub flaky: Arc<FlakyStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub auth: Arc<AuthCounters>,
    pub clock: MockTimeProvider,
    pub shutdown: ShutdownCoordinator,
}

impl Harness {
    pub fn new(bindings: impl IntoIterator<Item = VehicleBinding>) -> Self {
        let store = Arc::new(MemoryStore::with_bindings(bindings));
        Self {
            fetcher: Arc::new(ScriptedFetcher::default()),
            flaky: Arc::new(FlakyStore::new(store.clone())),
            store,
            dispatcher: Arc::new(RecordingDispatcher::default()),
            auth: Arc::new(AuthCounters::default()),
            clock: MockTimeProvider::new(start_time()),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    pub fn engine(&self, config: MonitorConfig) -> MonitorEngine {
        self.engine_with_auth(config, StaticAuthenticator::new(self.auth.clone()))
    }

    pub fn engine_with_auth(&self, config: MonitorConfig, auth: StaticAuthenticator) -> MonitorEngine {
        MonitorEngine::new(
            Box::new(auth),
            self.fetcher.clone(),
            self.flaky.clone(),
            self.dispatcher.clone(),
            Arc::new(self.clock.clone()),
            config,
        )
    }

    pub async fn cycle(&self, engine: &mut MonitorEngine) -> CycleReport {
        let mut listener = self.shutdown.listener();
        engine.run_cycle(&mut listener).await.unwrap()
    }

    pub async fn tracked(&self, user_id: UserId) -> BTreeSet<String> {
        self.store.tracked_orders(user_id).await.unwrap()
    }

    pub async fn stored(&self, user_id: UserId, plate: &str, order: &str) -> Option<FineRecord> {
        self.store.get_fine(user_id, plate, order).await.unwrap()
    }
}
