//! In-process cluster bound to the `mem` transport.
//!
//! Tables live in a shared map behind a mutex; every [`MemClient`] connected through the
//! same [`MemConnector`] sees the same objects. Each write stamps the object with the next
//! value of a cluster-wide version clock, which transactions use for commit validation.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use crate::{
    client::{Client, ClientError, Connect, RejectRules, TableId, Version},
    locator::{self, ServiceLocator},
    observability::{log_debug, log_info},
};

mod transaction;

pub use transaction::MemTransaction;

/// Transport name served by [`MemConnector`].
pub const MEM_TRANSPORT: &str = "mem";

/// Hands out object versions in increasing order.
#[derive(Debug, Clone, Copy)]
struct VersionClock {
    next: Version,
}

impl VersionClock {
    /// Allocate and return the next version.
    #[inline]
    fn next(&mut self) -> Version {
        let current = self.next;
        self.next = current.next();
        current
    }
}

impl Default for VersionClock {
    fn default() -> Self {
        Self {
            next: Version::NONE.next(),
        }
    }
}

#[derive(Debug)]
struct Object {
    value: Vec<u8>,
    version: Version,
}

#[derive(Debug, Default)]
struct Table {
    objects: HashMap<Vec<u8>, Object>,
}

#[derive(Debug, Default)]
struct ClusterState {
    last_table: u64,
    names: HashMap<String, TableId>,
    tables: HashMap<TableId, Table>,
    clock: VersionClock,
}

impl ClusterState {
    fn table(&self, id: TableId) -> Result<&Table, ClientError> {
        self.tables
            .get(&id)
            .ok_or(ClientError::TableDoesNotExist(id))
    }

    fn version_of(&self, id: TableId, key: &[u8]) -> Result<Option<Version>, ClientError> {
        Ok(self.table(id)?.objects.get(key).map(|object| object.version))
    }

    fn read_into(
        &self,
        id: TableId,
        key: &[u8],
        value: &mut Vec<u8>,
    ) -> Result<Version, ClientError> {
        let object = self
            .table(id)?
            .objects
            .get(key)
            .ok_or(ClientError::ObjectDoesNotExist { table: id })?;
        value.clear();
        value.extend_from_slice(&object.value);
        Ok(object.version)
    }

    fn apply_write(
        &mut self,
        id: TableId,
        key: &[u8],
        value: &[u8],
        rules: Option<&RejectRules>,
    ) -> Result<Version, ClientError> {
        if let Some(rules) = rules {
            rules.check(id, self.version_of(id, key)?)?;
        }
        let version = self.clock.next();
        let table = self
            .tables
            .get_mut(&id)
            .ok_or(ClientError::TableDoesNotExist(id))?;
        match table.objects.get_mut(key) {
            Some(object) => {
                object.value.clear();
                object.value.extend_from_slice(value);
                object.version = version;
            }
            None => {
                table.objects.insert(
                    key.to_vec(),
                    Object {
                        value: value.to_vec(),
                        version,
                    },
                );
            }
        }
        Ok(version)
    }
}

/// Shared storage of the embedded cluster. Clones refer to the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl MemCluster {
    /// Empty cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all existing tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state.names.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of objects in table `name`, or `None` if it does not exist.
    pub fn object_count(&self, name: &str) -> Option<usize> {
        let state = self.state.lock();
        let id = state.names.get(name)?;
        state.tables.get(id).map(|table| table.objects.len())
    }

    /// Value stored under `key` in table `name`.
    pub fn object(&self, name: &str, key: &[u8]) -> Option<Vec<u8>> {
        let state = self.state.lock();
        let id = state.names.get(name)?;
        state
            .tables
            .get(id)?
            .objects
            .get(key)
            .map(|object| object.value.clone())
    }
}

/// Connects sessions to a [`MemCluster`] for locators of the `mem` transport.
#[derive(Debug, Clone, Default)]
pub struct MemConnector {
    cluster: MemCluster,
}

impl MemConnector {
    /// Connector serving `cluster`.
    pub fn new(cluster: MemCluster) -> Self {
        Self { cluster }
    }

    /// Cluster behind this connector.
    pub fn cluster(&self) -> &MemCluster {
        &self.cluster
    }
}

impl Connect for MemConnector {
    type Client = MemClient;

    fn connect(&self, locator: &str) -> Result<MemClient, ClientError> {
        let locators = locator::parse_all(locator)?;
        let Some(chosen) = locators.iter().find(|l| l.transport() == MEM_TRANSPORT) else {
            let transport = locators
                .first()
                .map(|l| l.transport().to_string())
                .unwrap_or_default();
            return Err(ClientError::UnsupportedTransport { transport });
        };
        log_info!(component = "mem", event = "connected", locator = %chosen);
        Ok(MemClient {
            cluster: self.cluster.clone(),
            locator: chosen.clone(),
        })
    }
}

/// Session on a [`MemCluster`].
#[derive(Debug)]
pub struct MemClient {
    cluster: MemCluster,
    locator: ServiceLocator,
}

impl MemClient {
    /// Locator this session was opened with.
    pub fn locator(&self) -> &ServiceLocator {
        &self.locator
    }
}

impl Client for MemClient {
    type Transaction<'a> = MemTransaction<'a>;

    fn create_table(&mut self, name: &str) -> Result<TableId, ClientError> {
        let mut state = self.cluster.state.lock();
        if let Some(id) = state.names.get(name) {
            return Ok(*id);
        }
        state.last_table += 1;
        let id = TableId::new(state.last_table);
        state.names.insert(name.to_string(), id);
        state.tables.insert(id, Table::default());
        log_debug!(component = "mem", event = "table_created", table = name, id = id.get());
        Ok(id)
    }

    fn drop_table(&mut self, name: &str) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock();
        if let Some(id) = state.names.remove(name) {
            state.tables.remove(&id);
            log_debug!(component = "mem", event = "table_dropped", table = name, id = id.get());
        }
        Ok(())
    }

    fn write(
        &mut self,
        table: TableId,
        key: &[u8],
        value: &[u8],
        rules: Option<&RejectRules>,
    ) -> Result<Version, ClientError> {
        self.cluster
            .state
            .lock()
            .apply_write(table, key, value, rules)
    }

    fn read(
        &mut self,
        table: TableId,
        key: &[u8],
        value: &mut Vec<u8>,
    ) -> Result<(), ClientError> {
        self.cluster
            .state
            .lock()
            .read_into(table, key, value)
            .map(|_| ())
    }

    fn begin_transaction(&mut self) -> Result<MemTransaction<'_>, ClientError> {
        Ok(MemTransaction::new(&self.cluster))
    }

    fn disconnect(self) -> Result<(), ClientError> {
        log_debug!(component = "mem", event = "disconnected", locator = %self.locator);
        Ok(())
    }
}
