use clap::Parser;
use infratest::cli::commands;
use infratest::cli::{Cli, Commands};
use infratest::config::{CliOverrides, HarnessConfig};
use infratest::logging::init_logging;
use infratest::{HarnessError, StructuredError};
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, None) {
        eprintln!("Failed to initialize logging: {e}");
    }

    if let Err(e) = run(&cli) {
        handle_error(&e, cli.json);
    }
}

fn run(cli: &Cli) -> infratest::Result<()> {
    // Commands that need no config resolve first so a broken config file
    // does not block `version` or `completions`.
    match &cli.command {
        Commands::Name { prefix } => return commands::name::execute(prefix.as_deref(), cli.json),
        Commands::Version => return commands::version::execute(cli.json),
        Commands::Completions(args) => return commands::completions::execute(args),
        _ => {}
    }

    let config = HarnessConfig::load(&build_cli_overrides(cli))?;
    tracing::debug!(?config, "configuration resolved");

    match &cli.command {
        Commands::Apply(args) => commands::apply::execute(args, &config, cli.json),
        Commands::Destroy(args) => commands::destroy::execute(args, &config, cli.json),
        Commands::Output(args) => commands::output::execute(args, &config, cli.json),
        Commands::Run(args) => commands::run::execute(args, &config, cli.json),
        Commands::Name { .. } | Commands::Version | Commands::Completions(_) => Ok(()),
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &HarnessError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> CliOverrides {
    CliOverrides {
        config: cli.config.clone(),
        terraform_bin: cli.terraform_bin.clone(),
        modules_root: cli.modules_root.clone(),
        no_color: cli.no_color.then_some(true),
    }
}
