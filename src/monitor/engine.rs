//! One monitoring cycle over every binding

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::core::error_handling::log_error_with_context;
use crate::core::shutdown::ShutdownListener;
use crate::core::time::TimeProvider;
use crate::diff::{diff, DiffOutcome};
use crate::notifications::api::{FineNotification, NotificationDispatcher};
use crate::registry::api::{Authenticator, FineFetcher, FineListing, FineRecord, ScrapeError};
use crate::store::api::{PersistenceStore, VehicleBinding};

use super::config::MonitorConfig;
use super::error::{BindingError, MonitorError};

/// Totals for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Bindings returned by the store
    pub seen: usize,
    /// Bindings whose listing was fetched and processed
    pub checked: usize,
    pub expired: usize,
    pub skipped: usize,
    pub baselined: usize,
    pub notified: usize,
    pub updated: usize,
    pub failed_dispatches: usize,
    /// Cancellation stopped the cycle before every binding was visited
    pub interrupted: bool,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bindings: {} checked, {} expired, {} skipped, {} baselined; {} notified, {} updated, {} failed dispatches",
            self.seen,
            self.checked,
            self.expired,
            self.skipped,
            self.baselined,
            self.notified,
            self.updated,
            self.failed_dispatches
        )?;
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

/// What happened to one binding
#[derive(Debug, Default)]
enum BindingOutcome {
    Expired,
    Baselined,
    #[default]
    Checked,
}

#[derive(Debug, Default)]
struct BindingTally {
    outcome: BindingOutcome,
    notified: usize,
    updated: usize,
    failed_dispatches: usize,
}

/// Drives session, scraper, diff, store and dispatcher for each binding
///
/// The engine is the only writer of monitoring state. It processes bindings
/// one after another and never fans out requests.
pub struct MonitorEngine {
    authenticator: Box<dyn Authenticator>,
    fetcher: Arc<dyn FineFetcher>,
    store: Arc<dyn PersistenceStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn TimeProvider>,
    config: MonitorConfig,
}

impl MonitorEngine {
    pub fn new(
        authenticator: Box<dyn Authenticator>,
        fetcher: Arc<dyn FineFetcher>,
        store: Arc<dyn PersistenceStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn TimeProvider>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            authenticator,
            fetcher,
            store,
            dispatcher,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Visit every binding once
    ///
    /// Only a failure to list bindings is returned as an error; everything
    /// that goes wrong for a single binding is logged and counted as skipped.
    pub async fn run_cycle(
        &mut self,
        shutdown: &mut ShutdownListener,
    ) -> Result<CycleReport, MonitorError> {
        let bindings = self.store.list_bindings().await?;
        let mut report = CycleReport {
            seen: bindings.len(),
            ..CycleReport::default()
        };
        log::debug!("Starting cycle over {} bindings", bindings.len());

        let mut paced = false;
        for binding in &bindings {
            if shutdown.is_shutdown_requested() {
                report.interrupted = true;
                break;
            }

            let expired = binding.is_expired(self.clock.now());
            if paced && !expired && !shutdown.sleep(self.config.rate_limit_delay).await {
                report.interrupted = true;
                break;
            }

            match self.process_binding(binding, shutdown).await {
                Ok(tally) => {
                    match tally.outcome {
                        BindingOutcome::Expired => report.expired += 1,
                        BindingOutcome::Baselined => {
                            report.checked += 1;
                            report.baselined += 1;
                        }
                        BindingOutcome::Checked => report.checked += 1,
                    }
                    report.notified += tally.notified;
                    report.updated += tally.updated;
                    report.failed_dispatches += tally.failed_dispatches;
                }
                Err(e) => {
                    report.skipped += 1;
                    log_error_with_context(
                        &e,
                        &format!(
                            "Checking plate {} for user {}",
                            binding.plate_number, binding.user_id
                        ),
                    );
                }
            }
            paced = !expired;
        }

        Ok(report)
    }

    async fn process_binding(
        &mut self,
        binding: &VehicleBinding,
        shutdown: &mut ShutdownListener,
    ) -> Result<BindingTally, BindingError> {
        if binding.is_expired(self.clock.now()) {
            self.store.remove_binding(binding.user_id).await?;
            log::info!(
                "Subscription of user {} for {} expired; binding removed",
                binding.user_id,
                binding.plate_number
            );
            return Ok(BindingTally {
                outcome: BindingOutcome::Expired,
                ..BindingTally::default()
            });
        }

        let mut listing = self.fetch_listing(&binding.plate_number).await?;
        // Stored fines are keyed by the binding's plate, not the page's spelling of it
        for fine in &mut listing.fines {
            fine.plate_number.clone_from(&binding.plate_number);
        }

        if !binding.tracked_initialized {
            self.record_baseline(binding, &listing).await?;
            return Ok(BindingTally {
                outcome: BindingOutcome::Baselined,
                ..BindingTally::default()
            });
        }

        let known = self.store.tracked_orders(binding.user_id).await?;
        let mut stored = HashMap::new();
        for fine in &listing.fines {
            if stored.contains_key(&fine.order_number) {
                continue;
            }
            if let Some(record) = self
                .store
                .get_fine(binding.user_id, &binding.plate_number, &fine.order_number)
                .await?
            {
                stored.insert(fine.order_number.clone(), record);
            }
        }

        let DiffOutcome {
            new,
            updated,
            unchanged,
        } = diff(&listing.fines, &known, &stored);
        log::debug!(
            "Plate {} for user {}: {} new, {} updated, {} unchanged",
            binding.plate_number,
            binding.user_id,
            new.len(),
            updated.len(),
            unchanged.len()
        );

        let mut tally = BindingTally::default();
        let mut tracked = known.clone();
        let mut dispatched = false;

        for mut record in new {
            if let Some(previous) = stored.get(&record.order_number) {
                if previous.notified {
                    log::debug!(
                        "Fine {} was already notified to user {}; tracking it",
                        record.order_number,
                        binding.user_id
                    );
                    tracked.insert(record.order_number);
                    continue;
                }
                record.notify_attempts = previous.notify_attempts;
            }
            self.store.upsert_fine(binding.user_id, &record).await?;

            if dispatched {
                shutdown.sleep(self.config.notify_delay).await;
            }
            dispatched = true;

            if self
                .notify(binding, &listing, &mut record, &mut tally)
                .await?
            {
                tracked.insert(record.order_number);
            }
        }

        for record in updated {
            self.store.upsert_fine(binding.user_id, &record).await?;
            tally.updated += 1;
        }

        if tracked != known {
            self.store
                .replace_tracked_orders(binding.user_id, tracked)
                .await?;
        }

        Ok(tally)
    }

    /// Dispatch one new fine; returns whether its order joins the tracked set
    async fn notify(
        &self,
        binding: &VehicleBinding,
        listing: &FineListing,
        record: &mut FineRecord,
        tally: &mut BindingTally,
    ) -> Result<bool, BindingError> {
        let notification = FineNotification::new(
            binding.user_id,
            &binding.plate_number,
            listing.vehicle.clone(),
            record.clone(),
            self.clock.now(),
        )
        .with_payment_links(&self.config.payment_links, listing.pay_all.as_ref());

        match self.dispatcher.send(&notification).await {
            Ok(()) => {
                self.store
                    .mark_notified(binding.user_id, &binding.plate_number, &record.order_number)
                    .await?;
                record.notified = true;
                tally.notified += 1;
                log::info!(
                    "Notified user {} of fine {} on {} via {}",
                    binding.user_id,
                    record.order_number,
                    binding.plate_number,
                    self.dispatcher.name()
                );
                Ok(true)
            }
            Err(e) => {
                tally.failed_dispatches += 1;
                record.notify_attempts += 1;
                log_error_with_context(
                    &e,
                    &format!(
                        "Notifying user {} of fine {} (attempt {})",
                        binding.user_id, record.order_number, record.notify_attempts
                    ),
                );
                self.store.upsert_fine(binding.user_id, record).await?;

                if self.config.attempts_exhausted(record.notify_attempts) {
                    log::error!(
                        "Giving up on notifying user {} of fine {} after {} attempts",
                        binding.user_id,
                        record.order_number,
                        record.notify_attempts
                    );
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }

    /// First check of a binding without a tracked list: store, never notify
    async fn record_baseline(
        &self,
        binding: &VehicleBinding,
        listing: &FineListing,
    ) -> Result<(), BindingError> {
        for fine in &listing.fines {
            self.store.upsert_fine(binding.user_id, fine).await?;
        }
        let orders: BTreeSet<String> = listing
            .fines
            .iter()
            .map(|fine| fine.order_number.clone())
            .collect();
        log::info!(
            "Baseline for user {} on {}: {} existing fines",
            binding.user_id,
            binding.plate_number,
            orders.len()
        );
        self.store
            .replace_tracked_orders(binding.user_id, orders)
            .await?;
        Ok(())
    }

    /// Fetch the listing, logging in again once if the session was rejected
    async fn fetch_listing(&mut self, plate: &str) -> Result<FineListing, BindingError> {
        let fetcher = &self.fetcher;

        let session = self.authenticator.ensure_session().await?;
        let first = fetcher.fetch_fines(session, plate).await;
        let reason = match first {
            Err(ScrapeError::Auth { reason }) => reason,
            other => return Ok(self.keep_rotated_cookies(other?)),
        };

        log::info!("Session rejected while fetching {}: {}", plate, reason);
        let session = self.authenticator.reauthenticate().await?;
        let retry = fetcher.fetch_fines(session, plate).await;
        if let Err(ScrapeError::Auth { .. }) = &retry {
            self.authenticator.invalidate();
        }
        Ok(self.keep_rotated_cookies(retry?))
    }

    /// Keep cookies the registry rotated while serving `listing`
    fn keep_rotated_cookies(&mut self, mut listing: FineListing) -> FineListing {
        let set_cookies = std::mem::take(&mut listing.set_cookies);
        if !set_cookies.is_empty() {
            self.authenticator.refresh_cookies(&set_cookies);
        }
        listing
    }
}
