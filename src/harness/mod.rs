//! The provisioning invoker.
//!
//! [`Harness`] drives a [`Provisioner`] through init, apply, output and
//! destroy. Two modes are offered for every step that can fail:
//!
//! - capture mode (`init_and_apply`, `try_deploy`, `try_output*`) returns a
//!   `Result` so the test can inspect the error
//! - must-succeed mode (`must_init_and_apply`, `deploy`, `output*`) panics
//!   with the tool's error, failing the test at the caller's line
//!
//! `deploy`/`try_deploy` arm a [`TeardownGuard`] before apply, so a failed
//! apply or a failed assertion still destroys whatever was created. Each
//! deployment also gets the backend's isolation (a private copy of the module
//! for terraform), so tests may deploy the same module concurrently.
//!
//! ```no_run
//! use infratest::{Harness, HarnessConfig, RunOptions, unique_name};
//!
//! let config = HarnessConfig::default();
//! let harness = Harness::terraform(&config);
//! let opts = RunOptions::new("modules/aws/kms").var("project", unique_name("test"));
//! let kms = harness.deploy(opts);
//! assert_eq!(kms.output("logs_key_arn"), "");
//! // destroyed here
//! ```

mod teardown;

pub use teardown::TeardownGuard;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::model::{ApplySummary, DestroySummary, OutputBag, RunOptions};
use crate::provision::{MockProvisioner, Provisioner, TerraformCli};
use crate::util::progress::PhaseSpinner;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Entry point for tests: a shared handle on one backend.
#[derive(Clone)]
pub struct Harness {
    backend: Arc<dyn Provisioner>,
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Harness {
    pub fn new(backend: Arc<dyn Provisioner>) -> Self {
        Self { backend }
    }

    /// Harness over the terraform binary named in `config`.
    #[must_use]
    pub fn terraform(config: &HarnessConfig) -> Self {
        Self::new(Arc::new(TerraformCli::new(&config.terraform_bin)))
    }

    /// Harness over a mock the caller keeps a handle to for inspection.
    #[must_use]
    pub fn mock(mock: &Arc<MockProvisioner>) -> Self {
        Self::new(mock.clone())
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Provisioner> {
        &self.backend
    }

    /// Init then apply, returning the tool's error if either step fails.
    ///
    /// # Errors
    ///
    /// Returns the first init or apply failure. Nothing is torn down.
    pub fn init_and_apply(&self, opts: &RunOptions) -> Result<ApplySummary> {
        let target = opts.module_dir.display().to_string();
        let spinner = PhaseSpinner::start("Initializing", &target);
        debug!(module = %target, backend = self.backend.name(), "init");
        self.backend.init(opts)?;

        spinner.set_message(format!("Applying {target}"));
        let summary = self.backend.apply(opts)?;
        info!(
            module = %target,
            added = summary.added,
            changed = summary.changed,
            destroyed = summary.destroyed,
            "module applied"
        );
        spinner.finish_with_message(format!("{target}: {} added", summary.added));
        Ok(summary)
    }

    /// Init then apply; panic with the tool's error on failure.
    #[track_caller]
    pub fn must_init_and_apply(&self, opts: &RunOptions) -> ApplySummary {
        match self.init_and_apply(opts) {
            Ok(summary) => summary,
            Err(err) => panic!(
                "init and apply of '{}' failed: {err}",
                opts.module_dir.display()
            ),
        }
    }

    /// Arm teardown, then apply in must-succeed mode.
    ///
    /// If apply fails the guard is dropped while the panic unwinds, so partial
    /// resources are still destroyed.
    #[track_caller]
    pub fn deploy(&self, opts: RunOptions) -> Deployment {
        let module = opts.module_dir.display().to_string();
        let (opts, teardown) = match self.arm(opts) {
            Ok(armed) => armed,
            Err(err) => panic!("preparing '{module}' failed: {err}"),
        };
        let summary = self.must_init_and_apply(&opts);
        self.deployment(opts, summary, teardown)
    }

    /// Arm teardown, then apply in capture mode.
    ///
    /// # Errors
    ///
    /// Returns a [`DeployFailure`] that still owns the armed guard; dropping
    /// it (or converting it with `?`) destroys the module.
    pub fn try_deploy(&self, opts: RunOptions) -> std::result::Result<Deployment, DeployFailure> {
        let (opts, teardown) = match self.arm(opts) {
            Ok(armed) => armed,
            Err(error) => {
                return Err(DeployFailure {
                    error,
                    teardown: TeardownGuard::unarmed(self.backend.clone()),
                });
            }
        };
        match self.init_and_apply(&opts) {
            Ok(summary) => Ok(self.deployment(opts, summary, teardown)),
            Err(error) => Err(DeployFailure { error, teardown }),
        }
    }

    /// Isolate the deployment and arm its guard. The returned options point
    /// at the private workspace when the backend made one.
    fn arm(&self, opts: RunOptions) -> Result<(RunOptions, TeardownGuard)> {
        let Some(workspace) = self.backend.isolate(&opts)? else {
            let teardown = TeardownGuard::new(self.backend.clone(), opts.clone());
            return Ok((opts, teardown));
        };
        let opts = opts.in_workspace(workspace.path());
        let teardown =
            TeardownGuard::new(self.backend.clone(), opts.clone()).with_workspace(workspace);
        Ok((opts, teardown))
    }

    fn deployment(
        &self,
        opts: RunOptions,
        summary: ApplySummary,
        teardown: TeardownGuard,
    ) -> Deployment {
        Deployment {
            backend: self.backend.clone(),
            opts,
            summary,
            teardown,
        }
    }

    /// Destroy directly, without a guard. Nothing to remove is `Ok`.
    ///
    /// # Errors
    ///
    /// Returns the backend's destroy error.
    pub fn destroy(&self, opts: &RunOptions) -> Result<DestroySummary> {
        teardown::run_destroy(self.backend.as_ref(), opts)
    }

    /// Read all outputs of a module.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if outputs cannot be read.
    pub fn outputs(&self, opts: &RunOptions) -> Result<OutputBag> {
        self.backend.outputs(opts)
    }
}

/// Apply failed after teardown was armed.
///
/// Dropping this value destroys the module.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct DeployFailure {
    pub error: HarnessError,
    pub teardown: TeardownGuard,
}

impl From<DeployFailure> for HarnessError {
    fn from(failure: DeployFailure) -> Self {
        let DeployFailure { error, teardown } = failure;
        drop(teardown);
        error
    }
}

/// A live module plus its armed teardown.
///
/// Locals drop in reverse declaration order, so a network deployed before a
/// cluster is destroyed after it.
pub struct Deployment {
    backend: Arc<dyn Provisioner>,
    opts: RunOptions,
    summary: ApplySummary,
    teardown: TeardownGuard,
}

impl fmt::Debug for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployment")
            .field("backend", &self.backend.name())
            .field("module", &self.opts.module())
            .field("run_dir", &self.opts.run_dir())
            .field("summary", &self.summary)
            .field("armed", &self.teardown.is_armed())
            .finish()
    }
}

impl Deployment {
    #[must_use]
    pub const fn summary(&self) -> &ApplySummary {
        &self.summary
    }

    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.opts
    }

    /// Read every output of the module.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if outputs cannot be read.
    pub fn outputs(&self) -> Result<OutputBag> {
        self.backend.outputs(&self.opts)
    }

    /// # Errors
    ///
    /// Returns `OutputMissing` or `OutputShape`, or a backend error.
    pub fn try_output(&self, name: &str) -> Result<String> {
        self.outputs()?.scalar(name)
    }

    /// # Errors
    ///
    /// Returns `OutputMissing` or `OutputShape`, or a backend error.
    pub fn try_output_list(&self, name: &str) -> Result<Vec<String>> {
        self.outputs()?.list(name)
    }

    /// # Errors
    ///
    /// Returns `OutputMissing` or `OutputShape`, or a backend error.
    pub fn try_output_map(&self, name: &str) -> Result<BTreeMap<String, String>> {
        self.outputs()?.map(name)
    }

    /// Scalar output; panics if missing or not a scalar.
    #[track_caller]
    pub fn output(&self, name: &str) -> String {
        self.try_output(name)
            .unwrap_or_else(|err| panic!("reading output '{name}': {err}"))
    }

    /// List output; panics if missing or not a list.
    #[track_caller]
    pub fn output_list(&self, name: &str) -> Vec<String> {
        self.try_output_list(name)
            .unwrap_or_else(|err| panic!("reading output '{name}': {err}"))
    }

    /// Map output; panics if missing or not a map.
    #[track_caller]
    pub fn output_map(&self, name: &str) -> BTreeMap<String, String> {
        self.try_output_map(name)
            .unwrap_or_else(|err| panic!("reading output '{name}': {err}"))
    }

    /// Destroy now instead of at scope exit.
    ///
    /// # Errors
    ///
    /// Returns the backend's destroy error; drop will not retry.
    pub fn destroy(self) -> Result<DestroySummary> {
        self.teardown.destroy_now()
    }

    /// Leave the resources in place and return the options used.
    #[must_use]
    pub fn keep(self) -> RunOptions {
        self.teardown.disarm();
        self.opts
    }
}
