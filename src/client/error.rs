use thiserror::Error;

use crate::{
    client::{TableId, Version},
    locator::LocatorError,
};

/// Coarse classification the driver acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The addressed object is absent.
    ObjectDoesNotExist,
    /// A transaction failed validation at commit.
    TransactionAborted,
    /// Any other client failure.
    Client,
}

/// Errors surfaced by a storage client.
///
/// Clients do not retry; every call either succeeds or fails with one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Read of a key that holds no object.
    #[error("object does not exist in table {table}")]
    ObjectDoesNotExist {
        /// Table that was addressed.
        table: TableId,
    },
    /// Commit found that an object read by the transaction changed.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// What failed validation.
        reason: String,
    },
    /// Write rejected because the object already exists.
    #[error("object exists in table {table}")]
    ObjectExists {
        /// Table that was addressed.
        table: TableId,
    },
    /// Write rejected by a version rule.
    #[error("wrong version: object is at {current}")]
    WrongVersion {
        /// Version the object currently holds.
        current: Version,
    },
    /// Table id not known to the cluster.
    #[error("table {0} does not exist")]
    TableDoesNotExist(TableId),
    /// Commit on a transaction that was already committed.
    #[error("transaction already committed")]
    AlreadyCommitted,
    /// The locator cannot be reached through this client.
    #[error("no transport registered for `{transport}`")]
    UnsupportedTransport {
        /// Transport named by the locator.
        transport: String,
    },
    /// Locator could not be parsed.
    #[error("invalid locator: {0}")]
    Locator(#[from] LocatorError),
    /// Failure reported by an external client library.
    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Classification used by the driver.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::ObjectDoesNotExist { .. } => ErrorKind::ObjectDoesNotExist,
            ClientError::TransactionAborted { .. } => ErrorKind::TransactionAborted,
            _ => ErrorKind::Client,
        }
    }
}
