//! Common test utilities for integration tests.
#![allow(dead_code)]

use std::{collections::HashSet, sync::Arc};

use clap::Parser;
use parking_lot::Mutex;
use timeop::{
    client::{Client, ClientError, Connect, RejectRules, TableId, Transaction, Version},
    Args, Config,
};

/// Every adapter call the driver made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(String),
    CreateTable(String),
    DropTable(String),
    Write {
        table: TableId,
        key: Vec<u8>,
        value_len: usize,
    },
    Read {
        table: TableId,
        key: Vec<u8>,
    },
    Begin,
    TxRead {
        table: TableId,
        key: Vec<u8>,
    },
    Commit,
    Close,
    Disconnect,
}

/// Failures to inject into the recording client.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Zero-based index of the read (direct or transactional) that fails generically.
    pub fail_read_at: Option<usize>,
    /// Every commit fails with transaction-aborted.
    pub abort_commit: bool,
}

pub const TABLE: TableId = TableId::new(7);

/// Connector whose clients log every call and keep written keys in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    calls: Arc<Mutex<Vec<Call>>>,
    faults: Faults,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

impl Connect for RecordingConnector {
    type Client = RecordingClient;

    fn connect(&self, locator: &str) -> Result<RecordingClient, ClientError> {
        self.calls.lock().push(Call::Connect(locator.to_string()));
        Ok(RecordingClient {
            calls: Arc::clone(&self.calls),
            faults: self.faults,
            objects: HashSet::new(),
            reads: 0,
            version: Version::NONE,
        })
    }
}

#[derive(Debug)]
pub struct RecordingClient {
    calls: Arc<Mutex<Vec<Call>>>,
    faults: Faults,
    objects: HashSet<Vec<u8>>,
    reads: usize,
    version: Version,
}

impl RecordingClient {
    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn lookup(&mut self, key: &[u8], value: &mut Vec<u8>) -> Result<(), ClientError> {
        let index = self.reads;
        self.reads += 1;
        if self.faults.fail_read_at == Some(index) {
            return Err(ClientError::Other(format!("injected failure on read {index}")));
        }
        if !self.objects.contains(key) {
            return Err(ClientError::ObjectDoesNotExist { table: TABLE });
        }
        value.clear();
        Ok(())
    }
}

impl Client for RecordingClient {
    type Transaction<'a> = RecordingTransaction<'a>;

    fn create_table(&mut self, name: &str) -> Result<TableId, ClientError> {
        self.record(Call::CreateTable(name.to_string()));
        Ok(TABLE)
    }

    fn drop_table(&mut self, name: &str) -> Result<(), ClientError> {
        self.record(Call::DropTable(name.to_string()));
        Ok(())
    }

    fn write(
        &mut self,
        table: TableId,
        key: &[u8],
        value: &[u8],
        _rules: Option<&RejectRules>,
    ) -> Result<Version, ClientError> {
        self.record(Call::Write {
            table,
            key: key.to_vec(),
            value_len: value.len(),
        });
        self.objects.insert(key.to_vec());
        self.version = self.version.next();
        Ok(self.version)
    }

    fn read(
        &mut self,
        table: TableId,
        key: &[u8],
        value: &mut Vec<u8>,
    ) -> Result<(), ClientError> {
        self.record(Call::Read {
            table,
            key: key.to_vec(),
        });
        self.lookup(key, value)
    }

    fn begin_transaction(&mut self) -> Result<RecordingTransaction<'_>, ClientError> {
        self.record(Call::Begin);
        Ok(RecordingTransaction { client: self })
    }

    fn disconnect(self) -> Result<(), ClientError> {
        self.record(Call::Disconnect);
        Ok(())
    }
}

#[derive(Debug)]
pub struct RecordingTransaction<'a> {
    client: &'a mut RecordingClient,
}

impl Transaction for RecordingTransaction<'_> {
    fn read(
        &mut self,
        table: TableId,
        key: &[u8],
        value: &mut Vec<u8>,
    ) -> Result<(), ClientError> {
        self.client.record(Call::TxRead {
            table,
            key: key.to_vec(),
        });
        self.client.lookup(key, value)
    }

    fn write(&mut self, _table: TableId, _key: &[u8], _value: &[u8]) -> Result<(), ClientError> {
        Ok(())
    }

    fn commit_and_sync(&mut self) -> Result<(), ClientError> {
        self.client.record(Call::Commit);
        if self.client.faults.abort_commit {
            return Err(ClientError::TransactionAborted {
                reason: "injected".into(),
            });
        }
        Ok(())
    }

    fn close(self) {
        self.client.record(Call::Close);
    }
}

/// Validated configuration for `TimeOp <argv...>`.
pub fn config(argv: &[&str]) -> Config {
    let args = Args::try_parse_from(std::iter::once("TimeOp").chain(argv.iter().copied()))
        .expect("arguments should parse");
    Config::try_from(&args).expect("configuration should validate")
}

/// Key of object `index`: its digits, zero-padded to `len` bytes.
pub fn indexed_key(index: usize, len: usize) -> Vec<u8> {
    let mut key = index.to_string().into_bytes();
    key.resize(len, 0);
    key
}

/// Parsed `Time: <us>us` / `Time[<j>]: <us>us` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLine {
    pub index: Option<usize>,
    pub micros: u128,
}

pub fn parse_time_line(line: &str) -> Option<TimeLine> {
    let rest = line.strip_prefix("Time")?;
    let (index, rest) = match rest.strip_prefix('[') {
        Some(rest) => {
            let (index, rest) = rest.split_once(']')?;
            (Some(index.parse().ok()?), rest)
        }
        None => (None, rest),
    };
    let digits = rest.strip_prefix(": ")?.strip_suffix("us")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(TimeLine {
        index,
        micros: digits.parse().ok()?,
    })
}

pub fn output_lines(out: &[u8]) -> Vec<String> {
    String::from_utf8(out.to_vec())
        .expect("report is utf-8")
        .lines()
        .map(str::to_string)
        .collect()
}
