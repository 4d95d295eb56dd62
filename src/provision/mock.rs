//! In-process fake backend.
//!
//! Modules are registered with a closure that computes their outputs from
//! the variable bag, so feature-flag behavior (`enable_x = false` yields an
//! empty `x_arn`) can be modeled without a cloud account. Every call is
//! appended to a log that tests inspect for ordering.

use super::Provisioner;
use crate::error::{HarnessError, Result};
use crate::model::{ApplySummary, DestroySummary, OutputBag, RunOptions, VarBag};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type OutputFn = Arc<dyn Fn(&VarBag) -> Json + Send + Sync>;

/// Backend operation recorded by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Apply,
    Destroy,
    Outputs,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Apply => "apply",
            Self::Destroy => "destroy",
            Self::Outputs => "outputs",
        };
        f.write_str(s)
    }
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: Operation,
    pub module: PathBuf,
    pub vars: VarBag,
}

#[derive(Clone)]
struct MockModule {
    outputs: OutputFn,
    apply_error: Option<String>,
    destroy_error: Option<String>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    deployed: HashMap<PathBuf, Json>,
}

/// Fake provisioning backend with a call log.
#[derive(Default)]
pub struct MockProvisioner {
    modules: Mutex<HashMap<PathBuf, MockModule>>,
    state: Mutex<MockState>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn count_resources(outputs: &Json) -> u32 {
    let Json::Object(map) = outputs else {
        return 0;
    };
    let n = map
        .values()
        .filter(|v| match v {
            Json::Null => false,
            Json::String(s) => !s.is_empty(),
            Json::Array(items) => !items.is_empty(),
            Json::Object(entries) => !entries.is_empty(),
            _ => true,
        })
        .count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl MockProvisioner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module whose outputs are computed from its variables.
    #[must_use]
    pub fn with_module<F>(self, module: impl Into<PathBuf>, outputs: F) -> Self
    where
        F: Fn(&VarBag) -> Json + Send + Sync + 'static,
    {
        lock(&self.modules).insert(
            module.into(),
            MockModule {
                outputs: Arc::new(outputs),
                apply_error: None,
                destroy_error: None,
            },
        );
        self
    }

    /// Make every apply of `module` fail with `message`.
    #[must_use]
    pub fn failing_apply(self, module: impl AsRef<Path>, message: &str) -> Self {
        if let Some(m) = lock(&self.modules).get_mut(module.as_ref()) {
            m.apply_error = Some(message.to_string());
        }
        self
    }

    /// Make every destroy of `module` fail with `message`.
    #[must_use]
    pub fn failing_destroy(self, module: impl AsRef<Path>, message: &str) -> Self {
        if let Some(m) = lock(&self.modules).get_mut(module.as_ref()) {
            m.destroy_error = Some(message.to_string());
        }
        self
    }

    /// Snapshot of every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.state).calls.clone()
    }

    /// `(operation, module)` pairs, for compact ordering assertions.
    #[must_use]
    pub fn timeline(&self) -> Vec<(Operation, PathBuf)> {
        lock(&self.state)
            .calls
            .iter()
            .map(|c| (c.op, c.module.clone()))
            .collect()
    }

    /// How many times `op` ran against `module`.
    #[must_use]
    pub fn count(&self, op: Operation, module: impl AsRef<Path>) -> usize {
        let module = module.as_ref();
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| c.op == op && c.module == module)
            .count()
    }

    /// Whether `module` currently has live (fake) resources.
    #[must_use]
    pub fn is_deployed(&self, module: impl AsRef<Path>) -> bool {
        lock(&self.state).deployed.contains_key(module.as_ref())
    }

    fn record(&self, op: Operation, opts: &RunOptions) {
        lock(&self.state).calls.push(Call {
            op,
            module: opts.module_dir.clone(),
            vars: opts.vars.clone(),
        });
    }

    fn module(&self, opts: &RunOptions) -> Result<MockModule> {
        lock(&self.modules)
            .get(&opts.module_dir)
            .cloned()
            .ok_or_else(|| HarnessError::ModuleNotFound {
                path: opts.module_dir.clone(),
            })
    }

    fn failure(command: &str, opts: &RunOptions, message: &str) -> HarnessError {
        HarnessError::ToolFailed {
            command: command.to_string(),
            module: opts.module_dir.clone(),
            exit_code: Some(1),
            stderr: message.to_string(),
        }
    }
}

impl Provisioner for MockProvisioner {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn init(&self, opts: &RunOptions) -> Result<()> {
        self.record(Operation::Init, opts);
        self.module(opts).map(|_| ())
    }

    fn apply(&self, opts: &RunOptions) -> Result<ApplySummary> {
        self.record(Operation::Apply, opts);
        let module = self.module(opts)?;
        if let Some(message) = &module.apply_error {
            return Err(Self::failure("apply", opts, message));
        }

        let outputs = (module.outputs)(&opts.vars);
        let added = count_resources(&outputs);
        lock(&self.state)
            .deployed
            .insert(opts.module_dir.clone(), outputs);
        Ok(ApplySummary {
            added,
            ..Default::default()
        })
    }

    fn destroy(&self, opts: &RunOptions) -> Result<DestroySummary> {
        self.record(Operation::Destroy, opts);
        let module = self.module(opts)?;
        if let Some(message) = &module.destroy_error {
            return Err(Self::failure("destroy", opts, message));
        }

        let removed = lock(&self.state).deployed.remove(&opts.module_dir);
        Ok(DestroySummary {
            destroyed: removed.as_ref().map_or(0, count_resources),
            ..Default::default()
        })
    }

    fn outputs(&self, opts: &RunOptions) -> Result<OutputBag> {
        self.record(Operation::Outputs, opts);
        let deployed = lock(&self.state).deployed.get(&opts.module_dir).cloned();
        match deployed {
            Some(values) => OutputBag::from_values(&opts.module_dir, values),
            None => Ok(OutputBag::new(&opts.module_dir, Default::default())),
        }
    }
}
