//! Provisioning backends.
//!
//! The harness talks to the infrastructure tool only through [`Provisioner`].
//! [`TerraformCli`] shells out to the real binary; [`MockProvisioner`] is an
//! in-process fake that records every call, used to exercise teardown and
//! output-reading paths without touching a cloud account.

mod mock;
mod terraform;
mod workspace;

pub use mock::{Call, MockProvisioner, Operation};
pub use terraform::TerraformCli;
pub use workspace::Workspace;

use crate::error::Result;
use crate::model::{ApplySummary, DestroySummary, OutputBag, RunOptions};
use regex::Regex;
use std::sync::LazyLock;

/// The invoker contract every backend satisfies.
///
/// All calls block until the tool finishes. Implementations must be safe to
/// share between test threads.
pub trait Provisioner: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;

    /// Prepare the module directory. Safe to repeat.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot initialize the module.
    fn init(&self, opts: &RunOptions) -> Result<()>;

    /// Create or update resources to match the module.
    ///
    /// # Errors
    ///
    /// Returns an error if the apply fails; state may be partially updated.
    fn apply(&self, opts: &RunOptions) -> Result<ApplySummary>;

    /// Remove everything the module created. Nothing to remove is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails to destroy.
    fn destroy(&self, opts: &RunOptions) -> Result<DestroySummary>;

    /// Read all outputs currently in the module's state.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails or prints something unparseable.
    fn outputs(&self, opts: &RunOptions) -> Result<OutputBag>;

    /// Give one deployment its own state, so concurrent deployments of the
    /// same module never share it. Backends without on-disk state return
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the private copy cannot be created.
    fn isolate(&self, opts: &RunOptions) -> Result<Option<Workspace>> {
        let _ = opts;
        Ok(None)
    }
}

static APPLY_COMPLETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Apply complete! Resources: (\d+) added, (\d+) changed, (\d+) destroyed")
        .expect("valid regex")
});

static DESTROY_COMPLETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Destroy complete! Resources: (\d+) destroyed")
        .expect("valid regex")
});

fn capture_u32(caps: &regex::Captures<'_>, idx: usize) -> u32 {
    caps.get(idx)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Parse resource counts from apply output. Missing summary means zero.
#[must_use]
pub fn parse_apply_summary(stdout: &str) -> ApplySummary {
    APPLY_COMPLETE
        .captures_iter(stdout)
        .last()
        .map_or_else(ApplySummary::default, |caps| ApplySummary {
            added: capture_u32(&caps, 1),
            changed: capture_u32(&caps, 2),
            destroyed: capture_u32(&caps, 3),
            ..Default::default()
        })
}

/// Parse resource counts from destroy output. Missing summary means zero.
#[must_use]
pub fn parse_destroy_summary(stdout: &str) -> DestroySummary {
    DESTROY_COMPLETE
        .captures_iter(stdout)
        .last()
        .map_or_else(DestroySummary::default, |caps| DestroySummary {
            destroyed: capture_u32(&caps, 1),
            ..Default::default()
        })
}
