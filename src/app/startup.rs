//! Wiring of the binary: configuration, logging, adapters and the monitor

use std::io::IsTerminal;
use std::sync::Arc;

use clap::Parser;

use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::time::{SystemTimeProvider, TimeProvider};
use crate::core::version;
use crate::monitor::api::{MonitorEngine, MonitorScheduler, StopOutcome};
use crate::notifications::api::{JsonLinesDispatcher, LogDispatcher, NotificationDispatcher};
use crate::registry::api::{ReqwestTransport, Scraper, SessionManager};
use crate::store::api::JsonFileStore;

use super::cli::args::Args;
use super::cli::config::AppConfig;

/// Run the binary; returns the process exit code
pub async fn startup() -> i32 {
    let args = Args::parse();

    let config = match AppConfig::load(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let use_color = config
        .logging
        .color
        .unwrap_or_else(|| std::io::stderr().is_terminal());
    let log_file = config
        .logging
        .file
        .as_ref()
        .map(|path| path.to_string_lossy().to_string());
    if let Err(e) = init_logging(
        config.logging.level.as_deref(),
        config.logging.format.as_deref(),
        log_file.as_deref(),
        use_color,
    ) {
        eprintln!("Error: cannot start logging: {}", e);
        return 1;
    }

    log::info!("{} starting", version::banner());

    let engine = match build_engine(&config).await {
        Some(engine) => engine,
        None => return 1,
    };

    if config.once {
        run_once(engine).await
    } else {
        run_scheduler(engine).await
    }
}

async fn build_engine(config: &AppConfig) -> Option<MonitorEngine> {
    let store = match JsonFileStore::open(&config.store_path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log_error_with_context(&e, "Opening the store");
            return None;
        }
    };
    log::info!("Using store {}", store.path().display());

    let dispatcher: Arc<dyn NotificationDispatcher> = match &config.events_file {
        Some(path) => {
            log::info!("Writing notification events to {}", path.display());
            Arc::new(JsonLinesDispatcher::new(path))
        }
        None => Arc::new(LogDispatcher),
    };

    let registry = Arc::new(config.registry.clone());
    let transport = match ReqwestTransport::new(&registry) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            log_error_with_context(&e, "Building the HTTP client");
            return None;
        }
    };

    let clock: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let sessions = SessionManager::new(transport.clone(), registry.clone(), clock.clone());
    let scraper = Scraper::new(transport, registry);

    Some(MonitorEngine::new(
        Box::new(sessions),
        Arc::new(scraper),
        store,
        dispatcher,
        clock,
        config.monitor.clone(),
    ))
}

async fn run_once(mut engine: MonitorEngine) -> i32 {
    let signals = ShutdownCoordinator::new();
    signals.install_signal_handlers();
    let mut listener = signals.listener();

    match engine.run_cycle(&mut listener).await {
        Ok(report) => {
            log::info!("Cycle finished: {}", report);
            0
        }
        Err(e) => {
            log_error_with_context(&e, "Monitoring cycle");
            1
        }
    }
}

async fn run_scheduler(engine: MonitorEngine) -> i32 {
    let signals = ShutdownCoordinator::new();
    signals.install_signal_handlers();
    let mut listener = signals.listener();

    let mut scheduler = MonitorScheduler::new(engine);
    if let Err(e) = scheduler.start() {
        log_error_with_context(&e, "Starting the monitor");
        return 1;
    }

    listener.cancelled().await;

    match scheduler.stop().await {
        StopOutcome::Forced => 1,
        StopOutcome::Drained | StopOutcome::NotRunning => 0,
    }
}
