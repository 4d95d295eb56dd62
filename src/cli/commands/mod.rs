//! Command implementations.

pub mod apply;
pub mod completions;
pub mod destroy;
pub mod name;
pub mod output;
pub mod run;
pub mod version;

use crate::cli::ModuleArgs;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::model::{RunOptions, VarBag};
use crate::util::parse_key_value;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Build run options from module arguments.
///
/// Variables layer in order: `--vars-file`, then `--var-json`, then `--var`,
/// so the most specific flag wins.
///
/// # Errors
///
/// Returns an error if any `KEY=VALUE` pair, JSON literal, or vars file is
/// malformed.
pub fn build_run_options(args: &ModuleArgs, config: &HarnessConfig) -> Result<RunOptions> {
    let mut vars = match &args.vars_file {
        Some(path) => load_vars_file(path)?,
        None => VarBag::new(),
    };

    for raw in &args.var_json {
        let (key, literal) = parse_key_value(raw)?;
        let value: serde_json::Value =
            serde_json::from_str(&literal).map_err(|err| HarnessError::InvalidArgument {
                arg: raw.clone(),
                reason: format!("invalid JSON: {err}"),
            })?;
        vars.insert(key, value);
    }
    for raw in &args.vars {
        let (key, value) = parse_key_value(raw)?;
        vars.insert(key, value);
    }

    let env = args
        .env
        .iter()
        .map(|raw| parse_key_value(raw))
        .collect::<Result<Vec<_>>>()?;

    let opts = RunOptions::new(config.resolve_module(&args.module))
        .vars(vars)
        .envs(env)
        .no_color(config.no_color);
    Ok(match &args.work_dir {
        Some(dir) => opts.in_workspace(dir),
        None => opts,
    })
}

/// Read a variable bag from a `.json`, `.yaml`, or `.yml` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not an object.
pub fn load_vars_file(path: &Path) -> Result<VarBag> {
    let contents = fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let value: serde_json::Value = if is_yaml {
        serde_yaml::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };
    VarBag::try_from(value)
}

/// Print a JSON document to stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Whole milliseconds, saturating.
#[must_use]
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
