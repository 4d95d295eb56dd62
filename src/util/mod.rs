//! Shared utilities for `infratest`.
//!
//! - Unique-name generation for test resources
//! - `KEY=VALUE` argument parsing
//! - Progress spinners for long tool phases

pub mod id;
pub mod progress;

pub use id::{unique_id, unique_name};

use crate::error::{HarnessError, Result};

/// Split a `KEY=VALUE` argument. The value may itself contain `=`.
///
/// # Errors
///
/// Returns `InvalidArgument` if there is no `=` or the key is empty.
pub fn parse_key_value(raw: &str) -> Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(HarnessError::InvalidArgument {
            arg: raw.to_string(),
            reason: "expected KEY=VALUE".to_string(),
        });
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(HarnessError::InvalidArgument {
            arg: raw.to_string(),
            reason: "key must not be empty".to_string(),
        });
    }
    Ok((key.to_string(), value.to_string()))
}
