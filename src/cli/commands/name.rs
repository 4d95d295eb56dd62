//! `infratest name`: print a unique id for ad-hoc resource names.

use crate::error::Result;
use crate::util::{unique_id, unique_name};
use serde_json::json;

/// Execute the name command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(prefix: Option<&str>, json: bool) -> Result<()> {
    let name = match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => unique_name(prefix),
        None => unique_id(),
    };

    if json {
        super::print_json(&json!({ "name": name }))
    } else {
        println!("{name}");
        Ok(())
    }
}
