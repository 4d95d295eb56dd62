//! `infratest destroy`: remove everything a module created.

use super::{build_run_options, duration_ms, print_json};
use crate::cli::ModuleArgs;
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::harness::Harness;
use serde_json::json;

/// Execute the destroy command. Nothing to destroy is a success.
///
/// # Errors
///
/// Returns an error if the arguments are invalid or the tool fails.
pub fn execute(args: &ModuleArgs, config: &HarnessConfig, json: bool) -> Result<()> {
    let opts = build_run_options(args, config)?;
    let summary = Harness::terraform(config).destroy(&opts)?;

    if json {
        return print_json(&json!({
            "module": opts.module_dir,
            "destroyed": summary.destroyed,
            "noop": summary.is_noop(),
            "duration_ms": duration_ms(summary.duration),
        }));
    }

    if summary.is_noop() {
        println!("Nothing to destroy in {}", opts.module_dir.display());
    } else {
        println!(
            "Destroyed {}: {} resources",
            opts.module_dir.display(),
            summary.destroyed
        );
    }
    Ok(())
}
