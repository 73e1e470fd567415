//! scenarios command - List the conformance scenarios

use clap::Args;
use fs3_core::Scenario;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List the scenarios of the suite
#[derive(Args, Debug)]
pub struct ScenariosArgs {
    /// Only list scenarios that can run against a remote endpoint
    #[arg(long)]
    pub portable: bool,
}

/// One scenario entry (JSON format)
#[derive(Debug, Serialize)]
struct ScenarioEntry {
    name: &'static str,
    description: &'static str,
    portable: bool,
}

/// Execute the scenarios command
pub fn execute(args: ScenariosArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let entries = entries(args.portable);

    if formatter.is_json() {
        formatter.json(&entries);
        return ExitCode::Success;
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    for entry in &entries {
        let marker = if entry.portable { "" } else { " (in-process only)" };
        formatter.println(&format!(
            "{:<width$}  {}{marker}",
            entry.name, entry.description
        ));
    }
    ExitCode::Success
}

fn entries(portable_only: bool) -> Vec<ScenarioEntry> {
    Scenario::ALL
        .iter()
        .filter(|s| !portable_only || s.portable())
        .map(|s| ScenarioEntry {
            name: s.name(),
            description: s.description(),
            portable: s.portable(),
        })
        .collect()
}
