//! Error types and handling for `infratest`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for ad-hoc failures
//! - Separates provisioning failures from output-shape failures so tests can
//!   tell "the tool failed" from "the module produced something unexpected"
//! - Provides structured JSON output for the CLI

mod structured;

pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for harness operations.
#[derive(Error, Debug)]
pub enum HarnessError {
    // === Tool Errors ===
    /// The provisioning tool binary could not be started.
    #[error("Provisioning tool not found: '{binary}'")]
    ToolNotFound { binary: PathBuf },

    /// The provisioning tool exited non-zero.
    #[error("{command} failed for module '{module}' (exit {}): {stderr}", exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    ToolFailed {
        command: String,
        module: PathBuf,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The module directory does not exist.
    #[error("Module directory not found: '{path}'")]
    ModuleNotFound { path: PathBuf },

    // === Output Errors ===
    /// The module does not declare an output with this name.
    #[error("Output '{name}' not found for module '{module}'")]
    OutputMissing { name: String, module: PathBuf },

    /// The output exists but has a different shape than requested.
    #[error("Output '{name}' is a {found}, expected a {expected}")]
    OutputShape {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    // === Validation Errors ===
    /// The variable bag could not be built or rendered.
    #[error("Invalid variables: {reason}")]
    InvalidVariables { reason: String },

    /// A CLI argument could not be parsed.
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument { arg: String, reason: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HarnessError {
    /// Did the external tool itself fail (as opposed to the harness)?
    #[must_use]
    pub const fn is_provisioning_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. } | Self::ToolFailed { .. } | Self::ModuleNotFound { .. }
        )
    }

    /// Is this a missing-output condition (distinct from an empty output)?
    #[must_use]
    pub const fn is_missing_output(&self) -> bool {
        matches!(self, Self::OutputMissing { .. })
    }

    /// Create a config error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-variables error.
    #[must_use]
    pub fn invalid_variables(reason: impl Into<String>) -> Self {
        Self::InvalidVariables {
            reason: reason.into(),
        }
    }
}

/// Result type using `HarnessError`.
pub type Result<T> = std::result::Result<T, HarnessError>;
