//! Capability set the driver needs from a storage client.
//!
//! The traits carry no transport of their own: an implementation binds them to whatever
//! client the environment provides. [`crate::mem`] is the in-process binding.

use std::fmt;

mod error;

pub use error::{ClientError, ErrorKind};

/// Identifier the cluster assigns to a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId(u64);

impl TableId {
    /// Construct a table id from its raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value of the id.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Object version; grows with every write of the object.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// Version reported for an object that does not exist.
    pub const NONE: Self = Self(0);

    /// Construct a version from its raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value of the version.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The following version, saturating on overflow.
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Version").field(&self.0).finish()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conditions under which a write is refused.
///
/// The default rejects nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectRules {
    /// Version compared by the two version rules.
    pub given_version: Version,
    /// Refuse if the object does not exist.
    pub doesnt_exist: bool,
    /// Refuse if the object exists.
    pub exists: bool,
    /// Refuse if the object exists at a version `<= given_version`.
    pub version_le_given: bool,
    /// Refuse if the object exists at a version `!= given_version`.
    pub version_ne_given: bool,
}

impl RejectRules {
    /// Apply the rules to an object currently at `current` (`None` when absent).
    pub fn check(&self, table: TableId, current: Option<Version>) -> Result<(), ClientError> {
        match current {
            None if self.doesnt_exist => Err(ClientError::ObjectDoesNotExist { table }),
            None => Ok(()),
            Some(_) if self.exists => Err(ClientError::ObjectExists { table }),
            Some(version) if self.version_le_given && version <= self.given_version => {
                Err(ClientError::WrongVersion { current: version })
            }
            Some(version) if self.version_ne_given && version != self.given_version => {
                Err(ClientError::WrongVersion { current: version })
            }
            Some(_) => Ok(()),
        }
    }
}

/// Opens client sessions for a locator.
pub trait Connect {
    /// Session type produced on success.
    type Client: Client;

    /// Connect to the cluster entry point named by `locator`.
    fn connect(&self, locator: &str) -> Result<Self::Client, ClientError>;
}

/// A connected session. Calls block until the cluster answers.
pub trait Client {
    /// Transaction bound to this session.
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// Create table `name`, or return its id if it already exists.
    fn create_table(&mut self, name: &str) -> Result<TableId, ClientError>;

    /// Drop table `name` and all of its objects. Missing tables are ignored.
    fn drop_table(&mut self, name: &str) -> Result<(), ClientError>;

    /// Store `value` under `key`, returning the new version.
    fn write(
        &mut self,
        table: TableId,
        key: &[u8],
        value: &[u8],
        rules: Option<&RejectRules>,
    ) -> Result<Version, ClientError>;

    /// Read the object under `key` into `value`, replacing its contents.
    fn read(&mut self, table: TableId, key: &[u8], value: &mut Vec<u8>)
        -> Result<(), ClientError>;

    /// Start a client-side transaction.
    fn begin_transaction(&mut self) -> Result<Self::Transaction<'_>, ClientError>;

    /// End the session.
    fn disconnect(self) -> Result<(), ClientError>
    where
        Self: Sized;
}

/// Client-side grouping of reads and writes, committed atomically or discarded.
pub trait Transaction {
    /// Read through the transaction; staged writes of the same key are visible.
    fn read(&mut self, table: TableId, key: &[u8], value: &mut Vec<u8>)
        -> Result<(), ClientError>;

    /// Stage a write, applied on commit.
    fn write(&mut self, table: TableId, key: &[u8], value: &[u8]) -> Result<(), ClientError>;

    /// Commit and return only once the outcome is durable and visible.
    fn commit_and_sync(&mut self) -> Result<(), ClientError>;

    /// Release the transaction. Without a prior commit its effects are discarded.
    fn close(self)
    where
        Self: Sized;
}
