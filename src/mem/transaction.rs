//! Optimistic transactions over the embedded cluster.
//!
//! Reads record the version they observed ([`Version::NONE`] for a missing object) and
//! writes are staged locally. Commit re-checks every recorded version under the cluster
//! lock and only then applies the staged writes.

use std::collections::HashMap;

use super::MemCluster;
use crate::{
    client::{ClientError, TableId, Transaction, Version},
    observability::log_debug,
};

/// Transaction on a [`MemCluster`].
#[derive(Debug)]
pub struct MemTransaction<'a> {
    cluster: &'a MemCluster,
    /// First version observed per key.
    reads: HashMap<TableId, HashMap<Vec<u8>, Version>>,
    /// Latest staged value per key.
    writes: HashMap<TableId, HashMap<Vec<u8>, Vec<u8>>>,
    committed: bool,
}

impl<'a> MemTransaction<'a> {
    pub(crate) fn new(cluster: &'a MemCluster) -> Self {
        Self {
            cluster,
            reads: HashMap::new(),
            writes: HashMap::new(),
            committed: false,
        }
    }

    fn staged(&self) -> usize {
        self.writes.values().map(HashMap::len).sum()
    }
}

impl Transaction for MemTransaction<'_> {
    fn read(
        &mut self,
        table: TableId,
        key: &[u8],
        value: &mut Vec<u8>,
    ) -> Result<(), ClientError> {
        if let Some(staged) = self.writes.get(&table).and_then(|keys| keys.get(key)) {
            value.clear();
            value.extend_from_slice(staged);
            return Ok(());
        }

        let cluster = self.cluster;
        let state = cluster.state.lock();
        let observed = state.read_into(table, key, value);
        drop(state);

        let version = match &observed {
            Ok(version) => *version,
            Err(ClientError::ObjectDoesNotExist { .. }) => Version::NONE,
            Err(err) => return Err(err.clone()),
        };
        let reads = self.reads.entry(table).or_default();
        if !reads.contains_key(key) {
            reads.insert(key.to_vec(), version);
        }
        observed.map(|_| ())
    }

    fn write(&mut self, table: TableId, key: &[u8], value: &[u8]) -> Result<(), ClientError> {
        self.writes
            .entry(table)
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn commit_and_sync(&mut self) -> Result<(), ClientError> {
        if self.committed {
            return Err(ClientError::AlreadyCommitted);
        }

        let cluster = self.cluster;
        let mut state = cluster.state.lock();
        for (table, keys) in &self.reads {
            for (key, observed) in keys {
                let current = match state.version_of(*table, key) {
                    Ok(current) => current.unwrap_or(Version::NONE),
                    Err(err) => {
                        return Err(ClientError::TransactionAborted {
                            reason: err.to_string(),
                        })
                    }
                };
                if current != *observed {
                    return Err(ClientError::TransactionAborted {
                        reason: format!(
                            "object in table {table} moved from version {observed} to {current}"
                        ),
                    });
                }
            }
        }
        for table in self.writes.keys() {
            if let Err(err) = state.table(*table) {
                return Err(ClientError::TransactionAborted {
                    reason: err.to_string(),
                });
            }
        }
        for (table, keys) in &self.writes {
            for (key, value) in keys {
                state.apply_write(*table, key, value, None)?;
            }
        }
        drop(state);

        self.committed = true;
        log_debug!(
            component = "mem",
            event = "transaction_committed",
            reads = self.reads.values().map(HashMap::len).sum::<usize>(),
            writes = self.staged(),
        );
        Ok(())
    }

    fn close(self) {
        if !self.committed {
            log_debug!(
                component = "mem",
                event = "transaction_discarded",
                writes = self.staged(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        client::{Client, ClientError, Connect, ErrorKind, Transaction},
        mem::{MemClient, MemCluster, MemConnector},
    };

    fn two_clients() -> (MemConnector, MemClient, MemClient) {
        let connector = MemConnector::new(MemCluster::new());
        let a = connector.connect("mem:").unwrap();
        let b = connector.connect("mem:").unwrap();
        (connector, a, b)
    }

    #[test]
    fn commit_applies_staged_writes() {
        let (connector, mut client, _) = two_clients();
        let table = client.create_table("test").unwrap();
        client.write(table, b"a", b"1", None).unwrap();

        let mut tx = client.begin_transaction().unwrap();
        let mut value = Vec::new();
        tx.read(table, b"a", &mut value).unwrap();
        assert_eq!(value, b"1");
        tx.write(table, b"b", b"2").unwrap();
        tx.read(table, b"b", &mut value).unwrap();
        assert_eq!(value, b"2");
        tx.commit_and_sync().unwrap();
        assert_eq!(tx.commit_and_sync(), Err(ClientError::AlreadyCommitted));
        tx.close();

        assert_eq!(connector.cluster().object("test", b"b"), Some(b"2".to_vec()));
    }

    #[test]
    fn close_without_commit_discards() {
        let (connector, mut client, _) = two_clients();
        let table = client.create_table("test").unwrap();

        let mut tx = client.begin_transaction().unwrap();
        tx.write(table, b"k", b"v").unwrap();
        tx.close();

        assert_eq!(connector.cluster().object_count("test"), Some(0));
    }

    #[test]
    fn concurrent_write_aborts_commit() {
        let (connector, mut a, mut b) = two_clients();
        let table = a.create_table("test").unwrap();
        a.write(table, b"k", b"old", None).unwrap();

        let mut tx = a.begin_transaction().unwrap();
        let mut value = Vec::new();
        tx.read(table, b"k", &mut value).unwrap();
        tx.write(table, b"other", b"x").unwrap();
        b.write(table, b"k", b"new", None).unwrap();

        let err = tx.commit_and_sync().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionAborted);
        tx.close();
        assert_eq!(connector.cluster().object("test", b"other"), None);
    }

    #[test]
    fn missing_read_is_validated_on_commit() {
        let (_connector, mut a, mut b) = two_clients();
        let table = a.create_table("test").unwrap();

        let mut tx = a.begin_transaction().unwrap();
        let mut value = Vec::new();
        assert_eq!(
            tx.read(table, b"k", &mut value),
            Err(ClientError::ObjectDoesNotExist { table })
        );
        tx.commit_and_sync().unwrap();
        tx.close();

        let mut tx = a.begin_transaction().unwrap();
        assert!(tx.read(table, b"k", &mut value).is_err());
        b.write(table, b"k", b"appeared", None).unwrap();
        assert!(matches!(
            tx.commit_and_sync(),
            Err(ClientError::TransactionAborted { .. })
        ));
        tx.close();
    }
}
