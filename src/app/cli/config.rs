//! TOML configuration file parsing and loading
//!
//! Values are layered: built-in defaults, then the configuration file, then
//! the environment, then the command line. Each layer only overrides the
//! keys it sets.

use std::path::{Path, PathBuf};

use crate::core::validation::{
    validate_non_empty, validate_non_negative_seconds, validate_positive_seconds, validate_url,
    ValidationError,
};
use crate::monitor::api::MonitorConfig;
use crate::notifications::api::PaymentLinkBuilder;
use crate::registry::api::RegistryConfig;

use super::args::Args;

pub const PASSWORD_ENV_VAR: &str = "FINEWATCH_REGISTRY_PASSWORD";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {0}")]
    NotFound(String),
    #[error("Error reading configuration file {path}: {message}")]
    Read { path: String, message: String },
    #[error("Error parsing configuration file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<PathBuf>,
    pub color: Option<bool>,
}

/// Fully resolved settings for one run of the binary
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub monitor: MonitorConfig,
    pub store_path: PathBuf,
    /// JSON-lines event output; events go to the log when unset
    pub events_file: Option<PathBuf>,
    pub logging: LoggingSettings,
    pub once: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            monitor: MonitorConfig::default(),
            store_path: default_store_path(),
            events_file: None,
            logging: LoggingSettings::default(),
            once: false,
        }
    }
}

/// `<config_dir>/Finewatch/finewatch.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Finewatch").join("finewatch.toml"))
}

/// `<data_dir>/Finewatch/store.json`, or `store.json` in the working directory
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("Finewatch").join("store.json"))
        .unwrap_or_else(|| PathBuf::from("store.json"))
}

impl AppConfig {
    /// Build the configuration for `args`
    ///
    /// An explicit `--config-file` must exist; the default file is optional.
    pub async fn load(args: &Args) -> Result<Self, ConfigError> {
        let config_path = match &args.config_file {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound(path.display().to_string()))
            }
            Some(path) => Some(path.clone()),
            None => default_config_path().filter(|path| path.exists()),
        };

        let mut config = Self::default();
        if let Some(path) = config_path {
            log::debug!("Loading configuration from {}", path.display());
            let table = read_table(&path).await?;
            config.apply_toml_values(&table)?;
        }
        if let Ok(password) = std::env::var(PASSWORD_ENV_VAR) {
            config.registry.password = password;
        }
        config.apply_args(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply TOML configuration values
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> Result<(), ValidationError> {
        if let Some(registry) = section(config, "registry")? {
            self.apply_registry_values(registry)?;
        }
        if let Some(monitor) = section(config, "monitor")? {
            self.apply_monitor_values(monitor)?;
        }
        if let Some(store) = section(config, "store")? {
            if let Some(path) = string_value(store, "path")? {
                self.store_path = PathBuf::from(path);
            }
        }
        if let Some(notifications) = section(config, "notifications")? {
            if let Some(path) = string_value(notifications, "events-file")? {
                self.events_file = optional_path(path);
            }
        }
        if let Some(logging) = section(config, "logging")? {
            if let Some(level) = string_value(logging, "level")? {
                self.logging.level = Some(level.to_string());
            }
            if let Some(format) = string_value(logging, "format")? {
                self.logging.format = Some(format.to_string());
            }
            if let Some(file) = string_value(logging, "file")? {
                // Magic values "none" and "-" disable file logging
                self.logging.file = optional_path(file);
            }
            if let Some(color) = logging.get("color") {
                let color = color
                    .as_bool()
                    .ok_or_else(|| type_error("logging", "color", "a boolean"))?;
                self.logging.color = Some(color);
            }
        }
        Ok(())
    }

    fn apply_registry_values(&mut self, table: &toml::Table) -> Result<(), ValidationError> {
        let registry = &mut self.registry;
        let strings: [(&str, &mut String); 9] = [
            ("base-url", &mut registry.base_url),
            ("auth-path", &mut registry.auth_path),
            ("search-path", &mut registry.search_path),
            ("login", &mut registry.login),
            ("password", &mut registry.password),
            ("success-marker", &mut registry.success_marker),
            ("user-agent", &mut registry.user_agent),
            ("video-host", &mut registry.video_host),
            ("video-download-url", &mut registry.video_download_url),
        ];
        for (key, target) in strings {
            if let Some(value) = string_value(table, key)? {
                *target = value.to_string();
            }
        }

        if let Some(seconds) = seconds_value(table, "registry", "connect-timeout")? {
            registry.connect_timeout = validate_positive_seconds("registry.connect-timeout", seconds)?;
        }
        if let Some(seconds) = seconds_value(table, "registry", "request-timeout")? {
            registry.request_timeout = validate_positive_seconds("registry.request-timeout", seconds)?;
        }
        if let Some(seconds) = seconds_value(table, "registry", "session-max-age")? {
            let age = validate_non_negative_seconds("registry.session-max-age", seconds)?;
            registry.session_max_age = (!age.is_zero()).then_some(age);
        }
        if let Some(count) = integer_value(table, "registry", "max-detail-requests")? {
            registry.max_detail_requests = count as usize;
        }
        if let Some(path) = string_value(table, "parse-dump-file")? {
            registry.parse_dump_file = optional_path(path);
        }
        Ok(())
    }

    fn apply_monitor_values(&mut self, table: &toml::Table) -> Result<(), ValidationError> {
        let monitor = &mut self.monitor;
        if let Some(seconds) = seconds_value(table, "monitor", "poll-interval")? {
            monitor.poll_interval = validate_positive_seconds("monitor.poll-interval", seconds)?;
        }
        if let Some(seconds) = seconds_value(table, "monitor", "rate-limit-delay")? {
            monitor.rate_limit_delay =
                validate_non_negative_seconds("monitor.rate-limit-delay", seconds)?;
        }
        if let Some(seconds) = seconds_value(table, "monitor", "drain-timeout")? {
            monitor.drain_timeout = validate_positive_seconds("monitor.drain-timeout", seconds)?;
        }
        if let Some(seconds) = seconds_value(table, "monitor", "notify-delay")? {
            monitor.notify_delay = validate_non_negative_seconds("monitor.notify-delay", seconds)?;
        }
        if let Some(attempts) = integer_value(table, "monitor", "max-notify-attempts")? {
            monitor.max_notify_attempts = u32::try_from(attempts).map_err(|_| {
                ValidationError::new("'monitor.max-notify-attempts' is too large")
            })?;
        }
        if let Some(template) = string_value(table, "payment-url-template")? {
            monitor.payment_links = PaymentLinkBuilder::new(template);
        }
        Ok(())
    }

    /// Command-line values win over everything else
    pub fn apply_args(&mut self, args: &Args) -> Result<(), ValidationError> {
        if let Some(level) = &args.log_level {
            self.logging.level = Some(level.clone());
        }
        if let Some(format) = &args.log_format {
            self.logging.format = Some(format.clone());
        }
        if let Some(file) = &args.log_file {
            self.logging.file = optional_path(&file.to_string_lossy());
        }
        if let Some(color) = args.color_choice() {
            self.logging.color = Some(color);
        }
        if let Some(seconds) = args.poll_interval {
            self.monitor.poll_interval = validate_positive_seconds("--poll-interval", seconds)?;
        }
        if let Some(seconds) = args.rate_limit_delay {
            self.monitor.rate_limit_delay =
                validate_non_negative_seconds("--rate-limit-delay", seconds)?;
        }
        if let Some(store) = &args.store {
            self.store_path = store.clone();
        }
        if let Some(events) = &args.events_file {
            self.events_file = Some(events.clone());
        }
        if let Some(url) = &args.registry_url {
            self.registry.base_url = url.clone();
        }
        if let Some(login) = &args.login {
            self.registry.login = login.clone();
        }
        self.once = args.once;
        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_url("registry.base-url", &self.registry.base_url)?;
        validate_non_empty("registry.login", &self.registry.login)?;
        validate_non_empty("registry.password", &self.registry.password)?;
        validate_non_empty("registry.success-marker", &self.registry.success_marker)?;
        if !self.registry.video_download_url.contains("{id}") {
            return Err(ValidationError::new(
                "'registry.video-download-url' must contain {id}",
            ));
        }
        if !self.monitor.payment_links.template().contains("{order}") {
            return Err(ValidationError::new(
                "'monitor.payment-url-template' must contain {order}",
            ));
        }
        if self.monitor.poll_interval.is_zero() {
            return Err(ValidationError::new("'monitor.poll-interval' must be positive"));
        }
        Ok(())
    }
}

async fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    toml::from_str::<toml::Table>(&contents).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn section<'a>(config: &'a toml::Table, name: &str) -> Result<Option<&'a toml::Table>, ValidationError> {
    match config.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_table()
            .map(Some)
            .ok_or_else(|| ValidationError::new(&format!("'[{}]' must be a table", name))),
    }
}

fn type_error(section: &str, key: &str, expected: &str) -> ValidationError {
    ValidationError::new(&format!("'{}.{}' must be {}", section, key, expected))
}

fn string_value<'a>(table: &'a toml::Table, key: &str) -> Result<Option<&'a str>, ValidationError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| ValidationError::new(&format!("'{}' must be a string", key))),
    }
}

/// Seconds may be written as integers or floats
fn seconds_value(table: &toml::Table, section: &str, key: &str) -> Result<Option<f64>, ValidationError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Integer(i)) => Ok(Some(*i as f64)),
        Some(toml::Value::Float(f)) => Ok(Some(*f)),
        Some(_) => Err(type_error(section, key, "a number of seconds")),
    }
}

fn integer_value(table: &toml::Table, section: &str, key: &str) -> Result<Option<u64>, ValidationError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Integer(i)) if *i >= 0 => Ok(Some(*i as u64)),
        Some(_) => Err(type_error(section, key, "a non-negative integer")),
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.eq_ignore_ascii_case("none") || value == "-" || value.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}
