//! Logging setup built on `tracing-subscriber`.
//!
//! Level precedence: `RUST_LOG` wins, otherwise `-v`/`-vv`/`--quiet`.
//! `INFRATEST_LOG_FORMAT=json` switches stderr output to JSON lines.

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

static TEST_INIT: Once = Once::new();

fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "infratest=info",
        2 => "infratest=debug",
        _ => "infratest=trace",
    }
}

fn json_requested() -> bool {
    std::env::var("INFRATEST_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"))
}

/// Initialize the global subscriber for the CLI.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a global subscriber
/// is already installed.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_target(true),
            )
        }
        None => None,
    };

    let (json_layer, text_layer) = if json_requested() {
        (
            Some(fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            ),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;

    Ok(())
}

/// Initialize logging for tests. Safe to call from every test.
pub fn init_test_logging() {
    TEST_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}
