//! `fs3 completions <shell>`
//!
//! Emits a completion script covering `check` (its `--target` values and
//! scenario filters) and `scenarios`. Install it the usual way for the
//! shell, e.g. `fs3 completions zsh > ~/.zfunc/_fs3`.

use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

use super::Cli;
use crate::exit_code::ExitCode;

/// Arguments for the completions command
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Print the completion script for `args.shell` to stdout
pub fn execute(args: CompletionsArgs) -> ExitCode {
    let mut stdout = std::io::stdout().lock();
    write_completions(args.shell, &mut stdout);
    if let Err(e) = stdout.flush() {
        tracing::debug!(error = %e, "Failed to flush completion script");
        return ExitCode::GeneralError;
    }
    ExitCode::Success
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin, out);
}
