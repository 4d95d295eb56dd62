//! Structured error output for the CLI.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Context for debugging

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Tool Errors (exit code 2) ===
    /// Provisioning tool binary missing
    ToolNotFound,
    /// Provisioning tool exited non-zero
    ToolFailed,
    /// Module directory missing
    ModuleNotFound,

    // === Output Errors (exit code 3) ===
    /// Named output not declared by the module
    OutputMissing,
    /// Output has a different shape than requested
    OutputShape,

    // === Validation Errors (exit code 4) ===
    /// Variable bag invalid
    InvalidVariables,
    /// CLI argument invalid
    InvalidArgument,

    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,

    // === Internal Errors (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ToolNotFound => "TOOL_NOT_FOUND",
            Self::ToolFailed => "TOOL_FAILED",
            Self::ModuleNotFound => "MODULE_NOT_FOUND",
            Self::OutputMissing => "OUTPUT_MISSING",
            Self::OutputShape => "OUTPUT_SHAPE",
            Self::InvalidVariables => "INVALID_VARIABLES",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Get the exit code for this error category.
    ///
    /// - 1: Internal/unknown errors
    /// - 2: Provisioning tool errors
    /// - 3: Output errors
    /// - 4: Validation errors
    /// - 7: Config errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ToolNotFound | Self::ToolFailed | Self::ModuleNotFound => 2,
            Self::OutputMissing | Self::OutputShape => 3,
            Self::InvalidVariables | Self::InvalidArgument => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `HarnessError`.
    #[must_use]
    pub fn from_error(err: &HarnessError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        Self {
            code,
            message: err.to_string(),
            hint: Self::generate_hint(err),
            context,
        }
    }

    fn extract_code_and_context(err: &HarnessError) -> (ErrorCode, Option<Value>) {
        match err {
            HarnessError::ToolNotFound { binary } => (
                ErrorCode::ToolNotFound,
                Some(json!({ "binary": binary.display().to_string() })),
            ),
            HarnessError::ToolFailed {
                command,
                module,
                exit_code,
                ..
            } => (
                ErrorCode::ToolFailed,
                Some(json!({
                    "command": command,
                    "module": module.display().to_string(),
                    "exit_code": exit_code,
                })),
            ),
            HarnessError::ModuleNotFound { path } => (
                ErrorCode::ModuleNotFound,
                Some(json!({ "path": path.display().to_string() })),
            ),
            HarnessError::OutputMissing { name, module } => (
                ErrorCode::OutputMissing,
                Some(json!({ "name": name, "module": module.display().to_string() })),
            ),
            HarnessError::OutputShape {
                name,
                expected,
                found,
            } => (
                ErrorCode::OutputShape,
                Some(json!({ "name": name, "expected": expected, "found": found })),
            ),
            HarnessError::InvalidVariables { .. } => (ErrorCode::InvalidVariables, None),
            HarnessError::InvalidArgument { arg, .. } => {
                (ErrorCode::InvalidArgument, Some(json!({ "arg": arg })))
            }
            HarnessError::Config(_) => (ErrorCode::ConfigError, None),
            HarnessError::Io(_) => (ErrorCode::IoError, None),
            HarnessError::Json(_) => (ErrorCode::JsonError, None),
            HarnessError::Yaml(_) => (ErrorCode::YamlError, None),
            HarnessError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn generate_hint(err: &HarnessError) -> Option<String> {
        match err {
            HarnessError::ToolNotFound { .. } => Some(
                "Install terraform or point --terraform-bin / INFRATEST_TERRAFORM_BIN at it."
                    .to_string(),
            ),
            HarnessError::ToolFailed { command, .. } if command == "apply" => Some(
                "Resources may be partially created; run 'infratest destroy' with the same variables."
                    .to_string(),
            ),
            HarnessError::ModuleNotFound { .. } => {
                Some("Check the module path or --modules-root.".to_string())
            }
            HarnessError::OutputMissing { .. } => Some(
                "Run 'infratest output <module>' to list the outputs the module declares."
                    .to_string(),
            ),
            HarnessError::OutputShape { expected, .. } => {
                Some(format!("Read it with --shape {expected}."))
            }
            _ => None,
        }
    }

    /// Render as a JSON value (for stderr in `--json` mode).
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "context": self.context,
            }
        })
    }

    /// Render for a human, optionally with ANSI color.
    #[must_use]
    pub fn to_human(&self, use_color: bool) -> String {
        let label = if use_color {
            "\x1b[1;31mError:\x1b[0m"
        } else {
            "Error:"
        };
        let mut out = format!("{label} {}", self.message);
        if let Some(hint) = &self.hint {
            out.push_str("\n\nHint: ");
            out.push_str(hint);
        }
        out
    }
}
