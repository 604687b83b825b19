//! Command-line arguments
//!
//! Every flag is optional so that unset values fall through to the
//! configuration file and then to the built-in defaults.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "finewatch")]
#[command(about = "Watches a vehicle-fines registry and reports new fines")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Force colored log output
    #[arg(short = 'g', long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored log output
    #[arg(long = "no-color", conflicts_with = "color")]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Seconds between the starts of two monitoring cycles
    #[arg(short = 'i', long = "poll-interval", value_name = "SECONDS")]
    pub poll_interval: Option<f64>,

    /// Seconds to pause between two plates
    #[arg(long = "rate-limit-delay", value_name = "SECONDS")]
    pub rate_limit_delay: Option<f64>,

    /// JSON file holding bindings and fine history
    #[arg(short = 's', long = "store", value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Append notification events to this JSON-lines file instead of the log
    #[arg(short = 'e', long = "events-file", value_name = "FILE")]
    pub events_file: Option<PathBuf>,

    /// Registry base URL
    #[arg(short = 'u', long = "registry-url", value_name = "URL")]
    pub registry_url: Option<String>,

    /// Registry login (the password comes from the config file or FINEWATCH_REGISTRY_PASSWORD)
    #[arg(long = "login", value_name = "LOGIN")]
    pub login: Option<String>,

    /// Run a single monitoring cycle and exit
    #[arg(long = "once")]
    pub once: bool,
}

impl Args {
    /// `Some(true)` for --color, `Some(false)` for --no-color, `None` to decide by terminal
    pub fn color_choice(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
