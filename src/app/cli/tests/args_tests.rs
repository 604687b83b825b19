//! Tests for command-line parsing

use crate::app::cli::args::Args;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_no_flags_leaves_everything_unset() {
    let args = Args::try_parse_from(["finewatch"]).unwrap();

    assert_eq!(args.config_file, None);
    assert_eq!(args.poll_interval, None);
    assert_eq!(args.color_choice(), None);
    assert!(!args.once);
}

#[test]
fn test_monitor_flags() {
    let args = Args::try_parse_from([
        "finewatch",
        "--poll-interval",
        "600",
        "--rate-limit-delay=2.5",
        "--store",
        "/var/lib/finewatch/store.json",
        "--events-file",
        "events.jsonl",
        "--registry-url",
        "https://registry.example",
        "--login",
        "operator",
        "--once",
    ])
    .unwrap();

    assert_eq!(args.poll_interval, Some(600.0));
    assert_eq!(args.rate_limit_delay, Some(2.5));
    assert_eq!(args.store, Some(PathBuf::from("/var/lib/finewatch/store.json")));
    assert_eq!(args.events_file, Some(PathBuf::from("events.jsonl")));
    assert_eq!(args.registry_url.as_deref(), Some("https://registry.example"));
    assert_eq!(args.login.as_deref(), Some("operator"));
    assert!(args.once);
}

#[test]
fn test_logging_flags() {
    let args = Args::try_parse_from([
        "finewatch",
        "-l",
        "debug",
        "--log-format",
        "json",
        "--log-file",
        "finewatch.log",
        "--no-color",
    ])
    .unwrap();

    assert_eq!(args.log_level.as_deref(), Some("debug"));
    assert_eq!(args.log_format.as_deref(), Some("json"));
    assert_eq!(args.log_file, Some(PathBuf::from("finewatch.log")));
    assert_eq!(args.color_choice(), Some(false));
}

#[test]
fn test_rejects_unknown_values() {
    assert!(Args::try_parse_from(["finewatch", "--log-level", "loud"]).is_err());
    assert!(Args::try_parse_from(["finewatch", "--log-format", "xml"]).is_err());
    assert!(Args::try_parse_from(["finewatch", "--poll-interval", "soon"]).is_err());
}

#[test]
fn test_color_flags_conflict() {
    assert!(Args::try_parse_from(["finewatch", "--color", "--no-color"]).is_err());
    let args = Args::try_parse_from(["finewatch", "--color"]).unwrap();
    assert_eq!(args.color_choice(), Some(true));
}
