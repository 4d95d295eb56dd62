//! Terraform CLI backend.
//!
//! Every call runs the binary in the module directory (or the deployment's
//! private copy of it, see [`Workspace`]) with
//! `TF_IN_AUTOMATION=1`, the caller's environment overrides, and the variable
//! bag rendered to a temporary `.tfvars.json` file that lives only for the
//! duration of the call.

use super::{Provisioner, Workspace, parse_apply_summary, parse_destroy_summary};
use crate::error::{HarnessError, Result};
use crate::model::{ApplySummary, DestroySummary, OutputBag, RunOptions, VarBag};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Captured result of one tool invocation.
#[derive(Debug)]
struct ToolRun {
    stdout: String,
    stderr: String,
    duration: Duration,
}

/// Runs the `terraform` binary as a subprocess.
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: PathBuf,
}

impl Default for TerraformCli {
    fn default() -> Self {
        Self::new("terraform")
    }
}

impl TerraformCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn check_module(opts: &RunOptions) -> Result<()> {
        if opts.run_dir().is_dir() {
            Ok(())
        } else {
            Err(HarnessError::ModuleNotFound {
                path: opts.run_dir().to_path_buf(),
            })
        }
    }

    fn base_args(command: &str, opts: &RunOptions) -> Vec<String> {
        let mut args = vec![command.to_string()];
        match command {
            "init" => args.push("-input=false".to_string()),
            "apply" | "destroy" => {
                args.push("-input=false".to_string());
                args.push("-auto-approve".to_string());
            }
            "output" => args.push("-json".to_string()),
            _ => {}
        }
        if opts.no_color {
            args.push("-no-color".to_string());
        }
        args
    }

    fn run(&self, command: &str, opts: &RunOptions, var_file: Option<&Path>) -> Result<ToolRun> {
        Self::check_module(opts)?;

        let mut args = Self::base_args(command, opts);
        if let Some(path) = var_file {
            args.push(format!("-var-file={}", path.display()));
        }

        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(opts.run_dir())
            .args(&args)
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .envs(&opts.env_vars);

        debug!(
            module = %opts.module_dir.display(),
            run_dir = %opts.run_dir().display(),
            binary = %self.binary.display(),
            ?args,
            "running terraform {command}"
        );

        let start = Instant::now();
        let output = cmd.output().map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                HarnessError::ToolNotFound {
                    binary: self.binary.clone(),
                }
            } else {
                HarnessError::Io(err)
            }
        })?;
        let duration = start.elapsed();

        debug!(
            module = %opts.module_dir.display(),
            exit_code = ?output.status.code(),
            elapsed_ms = duration.as_millis(),
            "terraform {command} finished"
        );

        into_tool_run(command, opts, output, duration)
    }
}

fn into_tool_run(
    command: &str,
    opts: &RunOptions,
    output: Output,
    duration: Duration,
) -> Result<ToolRun> {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(HarnessError::ToolFailed {
            command: command.to_string(),
            module: opts.module_dir.clone(),
            exit_code: output.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(ToolRun {
        stdout,
        stderr,
        duration,
    })
}

/// Write the variable bag to a temp file. Empty bags need no file.
fn write_var_file(vars: &VarBag) -> Result<Option<NamedTempFile>> {
    if vars.is_empty() {
        return Ok(None);
    }
    let mut file = tempfile::Builder::new()
        .prefix("infratest-")
        .suffix(".tfvars.json")
        .tempfile()?;
    file.write_all(vars.to_tfvars_json()?.as_bytes())?;
    file.flush()?;
    Ok(Some(file))
}

impl Provisioner for TerraformCli {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn init(&self, opts: &RunOptions) -> Result<()> {
        self.run("init", opts, None)?;
        Ok(())
    }

    fn apply(&self, opts: &RunOptions) -> Result<ApplySummary> {
        let var_file = write_var_file(&opts.vars)?;
        let run = self.run("apply", opts, var_file.as_ref().map(NamedTempFile::path))?;
        let mut summary = parse_apply_summary(&run.stdout);
        summary.duration = run.duration;
        info!(
            module = %opts.module_dir.display(),
            added = summary.added,
            changed = summary.changed,
            destroyed = summary.destroyed,
            "apply complete"
        );
        Ok(summary)
    }

    fn destroy(&self, opts: &RunOptions) -> Result<DestroySummary> {
        let var_file = write_var_file(&opts.vars)?;
        let run = self.run("destroy", opts, var_file.as_ref().map(NamedTempFile::path))?;
        let mut summary = parse_destroy_summary(&run.stdout);
        summary.duration = run.duration;
        if !run.stderr.trim().is_empty() {
            debug!(module = %opts.module_dir.display(), stderr = %run.stderr.trim(), "destroy warnings");
        }
        Ok(summary)
    }

    fn outputs(&self, opts: &RunOptions) -> Result<OutputBag> {
        let run = self.run("output", opts, None)?;
        OutputBag::from_json(&opts.module_dir, &run.stdout)
    }

    fn isolate(&self, opts: &RunOptions) -> Result<Option<Workspace>> {
        Workspace::copy_module(&opts.module_dir).map(Some)
    }
}
