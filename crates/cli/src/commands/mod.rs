//! CLI command definitions and execution
//!
//! `check` runs the conformance suite, `scenarios` lists it and
//! `completions` prints shell completion scripts.

use clap::{Parser, Subcommand};

use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

mod check;
mod completions;
mod scenarios;

/// fs3 - S3 conformance runner
///
/// Exercises an S3-compatible object store through bucket creation,
/// put/get/delete, copy, listing and batch delete scenarios.
#[derive(Parser, Debug)]
#[command(name = "fs3")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the conformance suite against a target
    Check(check::CheckArgs),

    /// List the scenarios of the suite
    Scenarios(scenarios::ScenariosArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Check(args) => check::execute(args, output_config).await,
        Commands::Scenarios(args) => scenarios::execute(args, output_config),
        Commands::Completions(args) => completions::execute(args),
    }
}
