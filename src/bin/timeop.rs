//! `TimeOp [options] (read | write)`: time single operations against a cluster.
//!
//! stdout carries the resolved options followed by one line per sample. Diagnostics go
//! to stderr through `tracing`, filtered by `RUST_LOG` (default `warn`).

use std::io::{self, Write};

use clap::{error::ErrorKind, CommandFactory, Parser};
use timeop::{
    mem::{MemCluster, MemConnector},
    Args, Config, TIMEOP_TARGET,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut out = io::stdout().lock();
    writeln!(out, "{}", args.dump())?;
    out.flush()?;

    let config = match Config::try_from(&args) {
        Ok(config) => config,
        Err(err) => Args::command().error(ErrorKind::ValueValidation, err).exit(),
    };
    init_tracing();

    let connector = MemConnector::new(MemCluster::new());
    let summary = timeop::run(&connector, &config, &mut out)?;
    out.flush()?;

    tracing::info!(
        target: TIMEOP_TARGET,
        event = "run_finished",
        samples = summary.samples,
        exceptions = summary.exceptions,
        transactions = summary.transactions,
        commits = summary.commits,
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
