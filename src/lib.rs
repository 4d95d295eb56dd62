//! `infratest`: a harness for testing infrastructure modules.
//!
//! Tests provision a module through an external tool, read its outputs,
//! assert on them, and rely on a drop guard to destroy everything afterwards.
//!
//! - [`util::unique_name`] gives each test its own resource names
//! - [`Harness`] runs init/apply/destroy in must-succeed or capture mode
//! - [`Deployment`] reads scalar, list, and map outputs and owns teardown
//! - [`suite`] holds skip preconditions and provider conventions

pub mod cli;
pub mod config;
pub mod error;
pub mod harness;
pub mod logging;
pub mod model;
pub mod provision;
pub mod suite;
pub mod util;

pub use config::HarnessConfig;
pub use error::{ErrorCode, HarnessError, Result, StructuredError};
pub use harness::{DeployFailure, Deployment, Harness, TeardownGuard};
pub use model::{ApplySummary, DestroySummary, OutputBag, RunOptions, Value, VarBag};
pub use provision::{MockProvisioner, Provisioner, TerraformCli, Workspace};
pub use util::{unique_id, unique_name};
