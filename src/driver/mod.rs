//! Orchestrates one run: connect, create the scratch table, pre-populate, measure,
//! tear down.

use std::io::{self, Write};

use thiserror::Error;

use crate::{
    buffer::AllocError,
    client::{ClientError, Connect},
    option::{Config, ConfigError, Verb},
    timer::Reporter,
};

mod read;

/// Name of the table created for, and dropped after, every read run.
pub const SCRATCH_TABLE: &str = "test";

/// Errors that end a run early.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The configuration breaks an invariant.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The storage client failed in a way the driver does not tolerate.
    #[error("storage client failure: {0}")]
    Client(#[from] ClientError),
    /// Key or value buffers of the configured size could not be allocated.
    #[error("buffer allocation failed: {0}")]
    Alloc(#[from] AllocError),
    /// Timing lines could not be written.
    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

/// Counters describing a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Timing lines emitted.
    pub samples: u64,
    /// Reads that failed with object-does-not-exist.
    pub exceptions: u64,
    /// Transactions begun and closed; one for the whole run when a transaction is reused.
    pub transactions: u64,
    /// Transactions committed rather than rolled back.
    pub commits: u64,
}

/// Execute `config` against the cluster reached through `connector`, writing report
/// lines to `out`.
///
/// The `write` verb prints its stub line without connecting.
pub fn run<C, W>(connector: &C, config: &Config, out: W) -> Result<RunSummary, DriverError>
where
    C: Connect,
    W: Write,
{
    config.validate()?;
    let mut reporter = Reporter::new(out);
    let summary = match config.verb() {
        Verb::Read => read::run(connector, config, &mut reporter)?,
        Verb::Write => {
            reporter.not_implemented()?;
            RunSummary::default()
        }
    };
    reporter.flush()?;
    Ok(summary)
}
