//! Structured logging for the latency probe.
//!
//! Every event uses target `timeop` and carries an `event` field for filtering.
//! The library never installs a subscriber; the binary routes events to stderr
//! so that stdout only carries the options dump and timing lines.
//!
//! ## Conventions
//!
//! - `event`: snake_case event name (required)
//! - `component`: subsystem emitting the event (e.g. "driver", "mem")
//! - Use `%` for Display, `?` for Debug formatting

/// Target for all log events emitted by this crate.
pub const TIMEOP_TARGET: &str = "timeop";

/// Macro for info-level log events.
///
/// # Example
/// ```ignore
/// log_info!(
///     component = "driver",
///     event = "connecting",
///     locator = %config.coordinator,
/// );
/// ```
macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::TIMEOP_TARGET, $($field)*)
    };
}

/// Macro for debug-level log events.
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::TIMEOP_TARGET, $($field)*)
    };
}

/// Macro for warn-level log events.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::TIMEOP_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_info;
pub(crate) use log_warn;
