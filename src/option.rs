use std::{collections::BTreeMap, fmt};

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::buffer::decimal_width;

/// Coordinator contacted when `-C` is not given.
pub const DEFAULT_COORDINATOR: &str = "tcp:host=127.0.0.1,port=12246";

/// Raw command line, mirroring `TimeOp [options] (read | write)`.
///
/// Options are global so they may be given before or after the verb. Numeric options
/// are parsed as 32-bit signed integers and range-checked by [`Config::try_from`].
#[derive(Debug, Clone, Parser)]
#[command(
    name = "TimeOp",
    version = "0.1",
    about = "Time individual RAMCloud operations.",
    long_about = None
)]
pub struct Args {
    /// RAMCloud coordinator's locator string.
    #[arg(short = 'C', value_name = "coord", default_value = DEFAULT_COORDINATOR, global = true)]
    pub coordinator: String,
    /// Size of object keys to use (in bytes).
    #[arg(long = "keySize", value_name = "b", default_value_t = 30, global = true)]
    pub key_size: i32,
    /// Size of object values to use (in bytes).
    #[arg(long = "valueSize", value_name = "b", default_value_t = 100, global = true)]
    pub value_size: i32,
    /// Perform op on nonexistent objects.
    #[arg(long = "nonexist", global = true)]
    pub nonexist: bool,
    /// Perform the op in a transaction context.
    #[arg(long = "tx", global = true)]
    pub tx: bool,
    /// If using transactions, number of objects per TX.
    #[arg(long = "objsPerTx", value_name = "n", default_value_t = 1, global = true)]
    pub objs_per_tx: i32,
    /// If using transactions, roll back the transaction in the end instead of committing.
    #[arg(long = "txRollback", global = true)]
    pub tx_rollback: bool,
    /// Number of times to perform the op. With transactions, the number of transactions.
    #[arg(long = "count", value_name = "n", default_value_t = 3, global = true)]
    pub count: i32,
    /// Append the running number of missing-object failures to every direct-read line.
    #[arg(long = "countExceptions", global = true)]
    pub count_exceptions: bool,
    /// If using transactions, issue every read through a single transaction.
    #[arg(long = "txReuse", global = true)]
    pub tx_reuse: bool,
    /// Operation to time.
    #[command(subcommand)]
    pub verb: Verb,
}

/// Operation selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Verb {
    /// Time object reads.
    Read,
    /// Time object writes (not implemented).
    Write,
}

impl Args {
    /// Resolved option map, printed before any measurement.
    pub fn dump(&self) -> OptionsDump {
        let mut entries = BTreeMap::new();
        entries.insert("--count", self.count.to_string());
        entries.insert("--countExceptions", self.count_exceptions.to_string());
        entries.insert("--help", false.to_string());
        entries.insert("--keySize", self.key_size.to_string());
        entries.insert("--nonexist", self.nonexist.to_string());
        entries.insert("--objsPerTx", self.objs_per_tx.to_string());
        entries.insert("--tx", self.tx.to_string());
        entries.insert("--txReuse", self.tx_reuse.to_string());
        entries.insert("--txRollback", self.tx_rollback.to_string());
        entries.insert("--valueSize", self.value_size.to_string());
        entries.insert("--version", false.to_string());
        entries.insert("-C", self.coordinator.clone());
        entries.insert("read", (self.verb == Verb::Read).to_string());
        entries.insert("write", (self.verb == Verb::Write).to_string());
        OptionsDump { entries }
    }
}

/// Sorted `{key=value, ...}` rendering of every option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsDump {
    entries: BTreeMap<&'static str, String>,
}

impl OptionsDump {
    /// Value recorded for `key`, if the key is known.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl fmt::Display for OptionsDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

/// Rejected option values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A numeric option is below its lower bound.
    #[error("{option} must be at least {min}, got {value}")]
    OutOfRange {
        /// Option name as typed on the command line.
        option: &'static str,
        /// Smallest accepted value.
        min: i64,
        /// Value supplied.
        value: i64,
    },
    /// The key cannot hold the decimal index of every object in a transaction.
    #[error("--keySize={key_size} cannot hold object index {index} ({width} digits)")]
    KeyTooShort {
        /// Configured key length.
        key_size: usize,
        /// Largest object index of a transaction.
        index: usize,
        /// Number of digits needed for `index`.
        width: usize,
    },
    /// `--txReuse` was given without `--tx`.
    #[error("--txReuse requires --tx")]
    ReuseWithoutTx,
}

/// Validated, immutable description of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub(crate) coordinator: String,
    pub(crate) verb: Verb,
    pub(crate) key_size: usize,
    pub(crate) value_size: usize,
    pub(crate) nonexistent: bool,
    pub(crate) transactional: bool,
    pub(crate) objects_per_tx: usize,
    pub(crate) rollback: bool,
    pub(crate) reuse: bool,
    pub(crate) count: u64,
    pub(crate) count_exceptions: bool,
}

impl Config {
    /// Defaults of the command line for `verb`.
    pub fn new(verb: Verb) -> Self {
        Config {
            coordinator: DEFAULT_COORDINATOR.to_string(),
            verb,
            key_size: 30,
            value_size: 100,
            nonexistent: false,
            transactional: false,
            objects_per_tx: 1,
            rollback: false,
            reuse: false,
            count: 3,
            count_exceptions: false,
        }
    }

    /// Coordinator locator to contact.
    pub fn coordinator(self, coordinator: impl Into<String>) -> Self {
        Config {
            coordinator: coordinator.into(),
            ..self
        }
    }

    /// Length of every key in bytes.
    pub fn key_size(self, key_size: usize) -> Self {
        Config { key_size, ..self }
    }

    /// Length of every pre-written value in bytes.
    pub fn value_size(self, value_size: usize) -> Self {
        Config { value_size, ..self }
    }

    /// Skip pre-population so every read targets a missing object.
    pub fn nonexistent(self, nonexistent: bool) -> Self {
        Config {
            nonexistent,
            ..self
        }
    }

    /// Group reads into transactions.
    pub fn transactional(self, transactional: bool) -> Self {
        Config {
            transactional,
            ..self
        }
    }

    /// Number of distinct objects read by each transaction.
    pub fn objects_per_tx(self, objects_per_tx: usize) -> Self {
        Config {
            objects_per_tx,
            ..self
        }
    }

    /// Close transactions without committing them.
    pub fn rollback(self, rollback: bool) -> Self {
        Config { rollback, ..self }
    }

    /// Issue every read of the run through one long-lived transaction.
    pub fn reuse(self, reuse: bool) -> Self {
        Config { reuse, ..self }
    }

    /// Number of reads, or of transactions when transactional.
    pub fn count(self, count: u64) -> Self {
        Config { count, ..self }
    }

    /// Report the running missing-object count on direct-read lines.
    pub fn count_exceptions(self, count_exceptions: bool) -> Self {
        Config {
            count_exceptions,
            ..self
        }
    }

    /// Locator of the coordinator to contact.
    pub fn locator(&self) -> &str {
        &self.coordinator
    }

    /// Operation this run times.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Checks the invariants the builder methods cannot express in their types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_size < 1 {
            return Err(ConfigError::OutOfRange {
                option: "--keySize",
                min: 1,
                value: self.key_size as i64,
            });
        }
        if self.objects_per_tx < 1 {
            return Err(ConfigError::OutOfRange {
                option: "--objsPerTx",
                min: 1,
                value: self.objects_per_tx as i64,
            });
        }
        if self.reuse && !self.transactional {
            return Err(ConfigError::ReuseWithoutTx);
        }
        if self.transactional {
            let index = self.objects_per_tx - 1;
            let width = decimal_width(index);
            if width > self.key_size {
                return Err(ConfigError::KeyTooShort {
                    key_size: self.key_size,
                    index,
                    width,
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<&Args> for Config {
    type Error = ConfigError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let config = Config {
            coordinator: args.coordinator.clone(),
            verb: args.verb,
            key_size: at_least("--keySize", args.key_size, 1)?,
            value_size: at_least("--valueSize", args.value_size, 0)?,
            nonexistent: args.nonexist,
            transactional: args.tx,
            objects_per_tx: at_least("--objsPerTx", args.objs_per_tx, 1)?,
            rollback: args.tx_rollback,
            reuse: args.tx_reuse,
            count: at_least("--count", args.count, 0)? as u64,
            count_exceptions: args.count_exceptions,
        };
        config.validate()?;
        Ok(config)
    }
}

fn at_least(option: &'static str, value: i32, min: i32) -> Result<usize, ConfigError> {
    usize::try_from(value)
        .ok()
        .filter(|_| value >= min)
        .ok_or(ConfigError::OutOfRange {
            option,
            min: min.into(),
            value: value.into(),
        })
}
