//! Sitesync CLI Binary
//!
//! Command-line interface for datasite reconciliation.

use anyhow::Context;
use clap::Parser;
use sitesync::logging::init_logging;
use sitesync::tooling::cli::{Cli, CliContext};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let context = CliContext::new(cli.workspace.clone(), cli.config.clone())
        .context("Error loading configuration")?;
    init_logging(&context.config().logging, &cli.log_overrides()).context("Error initializing logging")?;

    let output = context.execute(&cli.command)?;
    println!("{}", output);
    Ok(())
}
