//! `infratest apply`: init and apply one module, leaving it in place.

use super::{build_run_options, duration_ms, print_json};
use crate::cli::ModuleArgs;
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::harness::Harness;
use serde_json::json;
use tracing::info;

/// Execute the apply command.
///
/// # Errors
///
/// Returns an error if the arguments are invalid or init/apply fails.
pub fn execute(args: &ModuleArgs, config: &HarnessConfig, json: bool) -> Result<()> {
    let opts = build_run_options(args, config)?;
    info!(module = %opts.module_dir.display(), vars = opts.vars.len(), "apply requested");

    let summary = Harness::terraform(config).init_and_apply(&opts)?;

    if json {
        print_json(&json!({
            "module": opts.module_dir,
            "added": summary.added,
            "changed": summary.changed,
            "destroyed": summary.destroyed,
            "duration_ms": duration_ms(summary.duration),
        }))
    } else {
        println!(
            "Applied {}: {} added, {} changed, {} destroyed",
            opts.module_dir.display(),
            summary.added,
            summary.changed,
            summary.destroyed
        );
        Ok(())
    }
}
