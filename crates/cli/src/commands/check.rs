//! check command - Run the conformance suite
//!
//! Builds the requested target, creates the suite bucket and runs the
//! selected scenarios one by one. The exit code is non-zero when any
//! scenario fails or the target cannot be reached.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use fs3_core::config::{BlobBackend, EngineConfig};
use fs3_core::conformance::{self, Scenario, SuiteOptions, SuiteReport};
use fs3_core::{Config, ConfigManager, ObjectService};
use fs3_engine::Engine;
use fs3_remote::RemoteService;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Spinner};

/// What the suite runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// In-process engine with in-memory bodies
    Memory,
    /// In-process engine with bodies under --data-dir
    Filesystem,
    /// Running S3-compatible endpoint
    Remote,
}

impl Target {
    fn from_backend(backend: BlobBackend) -> Self {
        match backend {
            BlobBackend::Memory => Target::Memory,
            BlobBackend::Filesystem => Target::Filesystem,
        }
    }
}

/// Run the conformance suite against a target
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Target to run against [default: engine backend from config]
    #[arg(long, value_enum)]
    pub target: Option<Target>,

    /// Endpoint URL for the remote target (default: http://$HOST:$PORT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Bucket the scenarios run in
    #[arg(long)]
    pub bucket: Option<String>,

    /// Only run scenarios whose name matches a glob pattern (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub only: Vec<String>,

    /// Size in bytes of the streamed upload/download
    #[arg(long, value_name = "BYTES")]
    pub big_size: Option<u64>,

    /// Body directory for the filesystem target
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Output structure for check command (JSON format)
#[derive(Debug, Serialize)]
struct CheckOutput<'a> {
    target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    big_object_size: u64,
    passed: usize,
    failed: usize,
    #[serde(flatten)]
    report: &'a SuiteReport,
}

/// Execute the check command
pub async fn execute(args: CheckArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let manager = match ConfigManager::new() {
        Ok(m) => m,
        Err(e) => {
            formatter.error(&format!("Failed to locate configuration: {e}"));
            return ExitCode::from_error(&e);
        }
    };
    let config = match manager.load() {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!(
                "Failed to load {}: {e}",
                manager.config_path().display()
            ));
            return ExitCode::from_error(&e);
        }
    };

    check(args, config, &formatter).await
}

/// Run the suite with an already loaded configuration
async fn check(args: CheckArgs, mut config: Config, formatter: &Formatter) -> ExitCode {
    let target = args
        .target
        .unwrap_or_else(|| Target::from_backend(config.engine.backend));
    if args.endpoint.is_some() {
        config.remote.endpoint = args.endpoint;
    }
    if args.data_dir.is_some() {
        config.engine.data_dir = args.data_dir;
    }

    let mut options = SuiteOptions::from(&config.suite);
    if let Some(bucket) = args.bucket {
        options.bucket = bucket;
    }
    if let Some(size) = args.big_size {
        options.big_object_size = size;
    }

    let scenarios = match select_scenarios(&args.only, target) {
        Ok(s) => s,
        Err(e) => {
            formatter.error(&e);
            return ExitCode::UsageError;
        }
    };
    if args.only.is_empty() {
        for skipped in Scenario::ALL.iter().filter(|s| !scenarios.contains(s)) {
            formatter.warning(&format!(
                "Skipping {skipped}: only meaningful against the in-process engine"
            ));
        }
    }

    let endpoint = match target {
        Target::Remote => match config.remote.endpoint_url() {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                formatter.error(&format!("Invalid endpoint: {e}"));
                return ExitCode::from_error(&e);
            }
        },
        _ => None,
    };

    let service = match connect(target, &config).await {
        Ok(s) => s,
        Err(e) => {
            formatter.error(&format!("Failed to set up {} target: {e}", target_name(target)));
            return ExitCode::from_error(&e);
        }
    };

    tracing::info!(
        kind = target_name(target),
        bucket = %options.bucket,
        scenarios = scenarios.len(),
        "Running conformance suite"
    );

    let spinner = Spinner::new(formatter.config(), "Preparing bucket");
    let outcome = tokio::select! {
        result = run(service.as_ref(), &scenarios, &options, &spinner) => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            spinner.finish_and_clear();
            formatter.error("Interrupted; objects written so far are left in place");
            return ExitCode::Interrupted;
        }
    };
    spinner.finish_and_clear();

    let report = match outcome {
        Ok(r) => r,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::from_anyhow(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&CheckOutput {
            target,
            endpoint,
            big_object_size: options.big_object_size,
            passed: report.passed(),
            failed: report.failed(),
            report: &report,
        });
    } else if !formatter.is_quiet() {
        let location = endpoint.as_deref().unwrap_or(target_name(target));
        formatter.println(&format!(
            "Target: {location}  Bucket: {}  Big object: {}",
            report.bucket,
            humansize::format_size(options.big_object_size, humansize::BINARY)
        ));
        formatter.println(&render_table(&report, formatter.colors_enabled()).to_string());
    }

    let total = report.scenarios.len();
    if report.is_success() {
        formatter.success(&format!("{total}/{total} scenarios passed"));
        ExitCode::Success
    } else {
        formatter.error(&format!("{} of {total} scenarios failed", report.failed()));
        ExitCode::GeneralError
    }
}

/// Pick the scenarios to run
///
/// Without patterns every scenario the target supports runs. With patterns,
/// every matching scenario runs, in suite order.
fn select_scenarios(only: &[String], target: Target) -> Result<Vec<Scenario>, String> {
    if only.is_empty() {
        return Ok(Scenario::ALL
            .into_iter()
            .filter(|s| target != Target::Remote || s.portable())
            .collect());
    }

    let patterns = only
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| format!("Invalid scenario pattern '{p}': {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let selected: Vec<_> = Scenario::ALL
        .into_iter()
        .filter(|s| patterns.iter().any(|p| p.matches(s.name())))
        .collect();
    if selected.is_empty() {
        return Err(format!(
            "No scenario matches {}; run 'fs3 scenarios' to list them",
            only.join(", ")
        ));
    }
    Ok(selected)
}

async fn connect(target: Target, config: &Config) -> fs3_core::Result<Box<dyn ObjectService>> {
    let backend = match target {
        Target::Memory => BlobBackend::Memory,
        Target::Filesystem => BlobBackend::Filesystem,
        Target::Remote => return Ok(Box::new(RemoteService::connect(&config.remote).await?)),
    };

    let engine_config = EngineConfig {
        backend,
        ..config.engine.clone()
    };
    Ok(Box::new(Engine::from_config(&engine_config).await?))
}

async fn run(
    service: &dyn ObjectService,
    scenarios: &[Scenario],
    options: &SuiteOptions,
    spinner: &Spinner,
) -> anyhow::Result<SuiteReport> {
    conformance::prepare_bucket(service, &options.bucket).await?;

    spinner.set_length(scenarios.len() as u64);
    let mut reports = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        spinner.set_message(scenario.description());
        let report = conformance::run_scenario(service, *scenario, options).await;
        if !report.passed {
            spinner.println(&format!("{} failed", report.name));
        }
        reports.push(report);
        spinner.inc();
    }

    Ok(SuiteReport {
        bucket: options.bucket.clone(),
        scenarios: reports,
    })
}

fn render_table(report: &SuiteReport, colors: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Scenario", "Result", "Duration", "Error"]);

    for scenario in &report.scenarios {
        let mut result = Cell::new(if scenario.passed { "PASS" } else { "FAIL" });
        if colors {
            result = result.fg(if scenario.passed {
                Color::Green
            } else {
                Color::Red
            });
        }
        table.add_row(vec![
            Cell::new(scenario.name),
            result,
            Cell::new(format!("{:.2}s", scenario.duration_ms as f64 / 1000.0)),
            Cell::new(scenario.error.as_deref().unwrap_or("")),
        ]);
    }
    table
}

fn target_name(target: Target) -> &'static str {
    match target {
        Target::Memory => "memory",
        Target::Filesystem => "filesystem",
        Target::Remote => "remote",
    }
}
