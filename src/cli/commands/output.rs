//! `infratest output`: read outputs of an applied module.

use super::print_json;
use crate::cli::{OutputArgs, OutputShape};
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::harness::Harness;
use crate::model::{OutputBag, RunOptions};

/// Execute the output command.
///
/// # Errors
///
/// Returns an error if the tool fails, the output is missing, or it has a
/// different shape than requested.
pub fn execute(args: &OutputArgs, config: &HarnessConfig, json: bool) -> Result<()> {
    let mut opts = RunOptions::new(config.resolve_module(&args.module)).no_color(config.no_color);
    if let Some(dir) = &args.work_dir {
        opts = opts.in_workspace(dir);
    }
    let bag = Harness::terraform(config).outputs(&opts)?;
    render(&bag, args.name.as_deref(), args.shape, json)
}

/// Print one output (or all of them) in the requested shape.
///
/// # Errors
///
/// Returns `OutputMissing`/`OutputShape` for a bad name or shape.
pub fn render(bag: &OutputBag, name: Option<&str>, shape: OutputShape, json: bool) -> Result<()> {
    let Some(name) = name else {
        return print_json(&bag.to_redacted_json());
    };

    match shape {
        OutputShape::Scalar => {
            let value = bag.scalar(name)?;
            if json {
                print_json(&value)?;
            } else {
                println!("{value}");
            }
        }
        OutputShape::List => {
            let items = bag.list(name)?;
            if json {
                print_json(&items)?;
            } else {
                for item in items {
                    println!("{item}");
                }
            }
        }
        OutputShape::Map => {
            let entries = bag.map(name)?;
            if json {
                print_json(&entries)?;
            } else {
                for (key, value) in entries {
                    println!("{key}={value}");
                }
            }
        }
    }
    Ok(())
}
