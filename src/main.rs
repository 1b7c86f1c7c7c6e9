//! homediag - Home-automation health diagnostics CLI

use anyhow::Result;
use clap::Parser;
use homediag::cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Parse first so --log-level can seed the filter
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --log-level; logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run(cli)
}
