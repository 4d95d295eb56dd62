//! `infratest run`: deploy a plan file end to end.
//!
//! ```yaml
//! module: aws/kms
//! vars:
//!   project: smoke
//!   enable_logs_key: true
//! env:
//!   AWS_DEFAULT_REGION: us-west-2
//! unique_project: true
//! outputs:
//!   - logs_key_arn
//! ```
//!
//! Teardown is armed before apply, so a failed apply still destroys. The
//! module runs in a private copy; with `--keep` that copy (and its state) is
//! left on disk and reported as `work_dir`. Outputs the module marks
//! sensitive print as `(sensitive)`.

use super::{duration_ms, print_json};
use crate::cli::RunArgs;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::harness::Harness;
use crate::model::{OutputBag, RunOptions, VarBag};
use crate::util::unique_name;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A plan file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunPlan {
    pub module: PathBuf,
    #[serde(default)]
    pub vars: VarBag,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Outputs to print after apply (all when empty).
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Suffix `vars.project` with a unique id (or set it to `test-<id>`).
    #[serde(default)]
    pub unique_project: bool,
    pub no_color: Option<bool>,
}

impl RunPlan {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_yaml::from_str(&contents).map_err(|err| {
            HarnessError::config(format!("invalid plan {}: {err}", path.display()))
        })
    }

    #[must_use]
    pub fn to_run_options(&self, config: &HarnessConfig) -> RunOptions {
        let mut vars = self.vars.clone();
        if self.unique_project {
            let prefix = vars.str("project").unwrap_or("test").to_string();
            vars.insert("project", unique_name(&prefix));
        }
        RunOptions::new(config.resolve_module(&self.module))
            .vars(vars)
            .envs(self.env.clone())
            .no_color(self.no_color.unwrap_or(config.no_color))
    }
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the plan is invalid, apply fails (after teardown), an
/// output cannot be read, or destroy fails.
pub fn execute(args: &RunArgs, config: &HarnessConfig, json: bool) -> Result<()> {
    let started_at = Utc::now();
    let plan = RunPlan::load(&args.plan)?;
    let opts = plan.to_run_options(config);
    info!(plan = %args.plan.display(), module = %opts.module_dir.display(), "running plan");

    let deployment = Harness::terraform(config).try_deploy(opts)?;
    let outputs = select_outputs(&deployment.outputs()?, &plan.outputs)?;

    if json {
        let mut report = serde_json::json!({
            "module": deployment.options().module_dir,
            "added": deployment.summary().added,
            "duration_ms": duration_ms(deployment.summary().duration),
            "outputs": outputs,
            "kept": args.keep,
            "started_at": started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        });
        if args.keep {
            report["work_dir"] = serde_json::json!(deployment.options().run_dir());
        }
        print_json(&report)?;
    } else {
        for (name, value) in outputs.as_object().into_iter().flatten() {
            match value {
                serde_json::Value::String(s) => println!("{name} = {s}"),
                other => println!("{name} = {other}"),
            }
        }
    }

    if args.keep {
        let opts = deployment.keep();
        warn!(
            module = %opts.module_dir.display(),
            work_dir = %opts.run_dir().display(),
            "kept; run `infratest destroy --work-dir <work_dir>` to clean up"
        );
        return Ok(());
    }
    deployment.destroy()?;
    Ok(())
}

/// The named outputs (all when `names` is empty), sensitive ones redacted.
fn select_outputs(bag: &OutputBag, names: &[String]) -> Result<serde_json::Value> {
    if names.is_empty() {
        return Ok(bag.to_redacted_json());
    }
    let mut selected = serde_json::Map::new();
    for name in names {
        selected.insert(name.clone(), bag.redacted(name)?);
    }
    Ok(serde_json::Value::Object(selected))
}
