//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Provision, inspect, and tear down infrastructure modules under test
#[derive(Parser, Debug)]
#[command(name = "infratest", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project config file (default: ./infratest.yaml)
    #[arg(long, global = true, env = "INFRATEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Provisioning tool binary
    #[arg(long, global = true)]
    pub terraform_bin: Option<PathBuf>,

    /// Directory that relative module paths resolve against
    #[arg(long, global = true)]
    pub modules_root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Pass -no-color to the provisioning tool
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a unique id, or PREFIX-<id>
    Name {
        /// Name prefix (e.g., "test")
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Init and apply a module
    Apply(ModuleArgs),

    /// Destroy everything a module created
    Destroy(ModuleArgs),

    /// Read module outputs
    Output(OutputArgs),

    /// Deploy a plan file, print its outputs, then destroy
    Run(RunArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Show version information
    Version,
}

/// Module selection plus the variables and environment to run it with.
#[derive(Args, Debug, Clone, Default)]
pub struct ModuleArgs {
    /// Module directory (relative paths fall back to --modules-root)
    pub module: PathBuf,

    /// Set a string variable (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Set a variable from a JSON literal (repeatable)
    #[arg(long = "var-json", value_name = "KEY=JSON")]
    pub var_json: Vec<String>,

    /// Load variables from a JSON or YAML file
    #[arg(long)]
    pub vars_file: Option<PathBuf>,

    /// Set an environment variable for the tool (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Run in this copy of the module (the `work_dir` printed by `run --keep`)
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Module directory
    pub module: PathBuf,

    /// Output name (default: print all outputs)
    pub name: Option<String>,

    /// Expected shape of the named output
    #[arg(long, value_enum, default_value_t = OutputShape::Scalar)]
    pub shape: OutputShape,

    /// Read state from this copy of the module (the `work_dir` printed by `run --keep`)
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,
}

/// How a named output is read.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputShape {
    Scalar,
    List,
    Map,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Plan file (YAML)
    pub plan: PathBuf,

    /// Leave resources in place instead of destroying them
    #[arg(long)]
    pub keep: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    /// Elvish
    Elvish,
}
