#![deny(missing_docs)]
//! Latency probe for single key/value operations against a RAMCloud-style cluster.
//!
//! A run connects to a coordinator, creates the scratch table `test`, optionally
//! pre-writes one or more fixed-size objects and then times a configurable number of
//! reads, either directly or grouped into client-side transactions. Every sample is
//! printed as one line of wall-clock microseconds.
//!
//! The storage client itself is an external collaborator reached through the
//! [`client`] traits. [`mem`] provides an embedded cluster for the `mem` transport.

mod observability;

/// Fixed, pre-allocated key and value buffers.
pub mod buffer;

/// Storage-client adapter traits and error kinds.
pub mod client;

/// Scenario driver: pre-population, measurement and teardown.
pub mod driver;

/// RAMCloud-style service locator parsing.
pub mod locator;

/// Embedded in-process cluster implementing the client adapter.
pub mod mem;

/// Command-line surface and the validated run configuration.
pub mod option;

/// Monotonic sampling and the fixed report format.
pub mod timer;

pub use crate::{
    driver::{run, DriverError, RunSummary, SCRATCH_TABLE},
    observability::TIMEOP_TARGET,
    option::{Args, Config, ConfigError, Verb},
};
