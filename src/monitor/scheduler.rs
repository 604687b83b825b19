//! Lifecycle of the polling loop
//!
//! The scheduler owns a [`MonitorEngine`] until `start()` moves it onto a
//! spawned task. `stop()` asks that task to finish its current binding and
//! waits at most the drain timeout before aborting it.

use std::time::Duration;

use strum_macros::Display;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::error_handling::log_error_with_context;
use crate::core::shutdown::{ShutdownCoordinator, ShutdownListener};

use super::engine::MonitorEngine;
use super::error::MonitorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// How `stop()` ended the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StopOutcome {
    /// The in-flight cycle finished within the drain timeout
    Drained,
    /// The task was aborted and its late result discarded
    Forced,
    /// There was no loop to stop
    NotRunning,
}

pub struct MonitorScheduler {
    state: SchedulerState,
    engine: Option<MonitorEngine>,
    poll_interval: Duration,
    drain_timeout: Duration,
    shutdown: ShutdownCoordinator,
    task: Option<JoinHandle<()>>,
}

impl MonitorScheduler {
    pub fn new(engine: MonitorEngine) -> Self {
        let poll_interval = engine.config().poll_interval;
        let drain_timeout = engine.config().drain_timeout;
        Self {
            state: SchedulerState::Idle,
            engine: Some(engine),
            poll_interval,
            drain_timeout,
            shutdown: ShutdownCoordinator::new(),
            task: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Spawn the polling loop; only valid from `Idle`
    pub fn start(&mut self) -> Result<(), MonitorError> {
        let engine = match (self.state, self.engine.take()) {
            (SchedulerState::Idle, Some(engine)) => engine,
            (state, engine) => {
                self.engine = engine;
                return Err(MonitorError::InvalidTransition {
                    action: "start",
                    state,
                });
            }
        };

        let listener = self.shutdown.listener();
        let poll_interval = self.poll_interval;
        self.task = Some(tokio::spawn(run_loop(engine, listener, poll_interval)));
        self.state = SchedulerState::Running;
        log::info!(
            "Monitor started; polling every {}s",
            self.poll_interval.as_secs_f64()
        );
        Ok(())
    }

    /// Cancel the loop and wait up to the drain timeout for it to finish
    pub async fn stop(&mut self) -> StopOutcome {
        match self.state {
            SchedulerState::Idle => {
                self.engine = None;
                self.state = SchedulerState::Stopped;
                return StopOutcome::NotRunning;
            }
            SchedulerState::Stopped => return StopOutcome::NotRunning,
            SchedulerState::Running | SchedulerState::Stopping => {}
        }

        self.state = SchedulerState::Stopping;
        self.shutdown.trigger_shutdown();
        log::info!(
            "Stopping monitor; waiting up to {}s for the current cycle",
            self.drain_timeout.as_secs_f64()
        );

        let outcome = match self.task.take() {
            Some(mut task) => match tokio::time::timeout(self.drain_timeout, &mut task).await {
                Ok(Ok(())) => StopOutcome::Drained,
                Ok(Err(e)) => {
                    log::error!("Monitor task ended abnormally: {}", e);
                    StopOutcome::Forced
                }
                Err(_) => {
                    task.abort();
                    log::warn!("Monitor did not drain in time; in-flight work discarded");
                    StopOutcome::Forced
                }
            },
            None => StopOutcome::Drained,
        };

        self.state = SchedulerState::Stopped;
        log::info!("Monitor stopped ({})", outcome);
        outcome
    }
}

impl Drop for MonitorScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_loop(mut engine: MonitorEngine, mut shutdown: ShutdownListener, poll_interval: Duration) {
    while !shutdown.is_shutdown_requested() {
        let cycle_start = Instant::now();

        match engine.run_cycle(&mut shutdown).await {
            Ok(report) => log::info!("Cycle finished: {}", report),
            Err(e) => log_error_with_context(&e, "Monitoring cycle"),
        }

        let Some(next_cycle) = cycle_start.checked_add(poll_interval) else {
            shutdown.cancelled().await;
            break;
        };
        if !shutdown.sleep_until(next_cycle).await {
            break;
        }
    }
    log::debug!("Monitor loop exited");
}
