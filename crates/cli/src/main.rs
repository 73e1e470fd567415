//! fs3 - S3 conformance runner
//!
//! Runs the fs3 scenario suite against the in-process storage engine or a
//! running S3-compatible endpoint.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fs3::commands::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays parseable
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
