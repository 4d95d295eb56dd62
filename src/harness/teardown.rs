//! Guaranteed teardown.
//!
//! A [`TeardownGuard`] is armed before apply and destroys the module exactly
//! once: explicitly through [`TeardownGuard::destroy_now`], or when dropped,
//! including while a failed assertion unwinds the test thread.
//!
//! When the deployment runs in a private [`Workspace`], the guard owns it and
//! removes it after a successful destroy. A failed destroy or a disarmed guard
//! leaves the copy on disk, since it holds the only state for those resources.

use crate::error::Result;
use crate::model::{DestroySummary, RunOptions};
use crate::provision::{Provisioner, Workspace};
use crate::util::progress::PhaseSpinner;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Destroys a module when dropped unless disarmed.
pub struct TeardownGuard {
    backend: Arc<dyn Provisioner>,
    opts: Option<RunOptions>,
    workspace: Option<Workspace>,
}

impl fmt::Debug for TeardownGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeardownGuard")
            .field("backend", &self.backend.name())
            .field("module", &self.opts.as_ref().map(RunOptions::module))
            .field("workspace", &self.workspace.as_ref().map(Workspace::path))
            .finish()
    }
}

impl TeardownGuard {
    /// Arm a guard for `opts`. The options are owned by the guard from here.
    pub fn new(backend: Arc<dyn Provisioner>, opts: RunOptions) -> Self {
        Self {
            backend,
            opts: Some(opts),
            workspace: None,
        }
    }

    /// A guard with nothing to destroy.
    pub(crate) fn unarmed(backend: Arc<dyn Provisioner>) -> Self {
        Self {
            backend,
            opts: None,
            workspace: None,
        }
    }

    /// Run in `workspace` and own it. The copy is removed once destroy
    /// succeeds.
    #[must_use]
    pub fn with_workspace(mut self, workspace: Workspace) -> Self {
        self.opts = self.opts.take().map(|opts| opts.in_workspace(workspace.path()));
        self.workspace = Some(workspace);
        self
    }

    /// Whether drop will still destroy.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.opts.is_some()
    }

    #[must_use]
    pub fn options(&self) -> Option<&RunOptions> {
        self.opts.as_ref()
    }

    /// Destroy now and disarm.
    ///
    /// # Errors
    ///
    /// Returns the backend's destroy error. The guard is disarmed either way,
    /// so a failed destroy is not retried on drop.
    pub fn destroy_now(mut self) -> Result<DestroySummary> {
        let Some(opts) = self.opts.take() else {
            return Ok(DestroySummary::default());
        };
        let result = run_destroy(self.backend.as_ref(), &opts);
        if result.is_err() {
            self.keep_workspace();
        }
        result
    }

    /// Keep the resources. Returns the options so the caller can destroy later;
    /// a private workspace stays on disk at `run_dir()`.
    pub fn disarm(mut self) -> Option<RunOptions> {
        let opts = self.opts.take();
        if let Some(opts) = &opts {
            warn!(
                module = %opts.module_dir.display(),
                run_dir = %opts.run_dir().display(),
                "teardown disarmed; resources left in place"
            );
            self.keep_workspace();
        }
        opts
    }

    fn keep_workspace(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            let _ = workspace.keep();
        }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        let Some(opts) = self.opts.take() else {
            return;
        };
        let module = opts.module_dir.display().to_string();
        if std::thread::panicking() {
            warn!(module = %module, "test panicked; tearing down");
        }
        // Must not panic: a panic while unwinding aborts the test binary.
        if let Err(err) = run_destroy(self.backend.as_ref(), &opts) {
            error!(
                module = %module,
                run_dir = %opts.run_dir().display(),
                backend = self.backend.name(),
                error = %err,
                "teardown failed; resources may still exist"
            );
            self.keep_workspace();
        }
    }
}

/// Destroy with a spinner and the standard log lines.
pub(crate) fn run_destroy(backend: &dyn Provisioner, opts: &RunOptions) -> Result<DestroySummary> {
    let target = opts.module_dir.display().to_string();
    let spinner = PhaseSpinner::start("Destroying", &target);
    let summary = backend.destroy(opts)?;
    if summary.is_noop() {
        info!(module = %target, "destroy found nothing to remove");
        spinner.finish_with_message(format!("{target}: nothing to destroy"));
    } else {
        info!(
            module = %target,
            destroyed = summary.destroyed,
            elapsed_ms = summary.duration.as_millis(),
            "destroy complete"
        );
        spinner.finish_with_message(format!("{target}: {} destroyed", summary.destroyed));
    }
    Ok(summary)
}
