/// Test doubles for the inventory, catalog and admin seams
use crate::admin::{AdminExecutor, AdminStatement, Table};
use crate::core::{Account, CatalogAccount, RoutingGroup};
use crate::credentials::AccountCatalog;
use crate::error::BoxError;
use crate::topology::{ContainerRecord, PodInventory, PodRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A `mysql_servers` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRow {
    pub hostgroup_id: u32,
    pub hostname: String,
    pub port: u16,
}

impl ServerRow {
    pub fn new(hostgroup_id: u32, hostname: &str, port: u16) -> Self {
        Self {
            hostgroup_id,
            hostname: hostname.to_string(),
            port,
        }
    }
}

/// Admin catalog with staged, runtime and disk copies of each table
#[derive(Debug, Default)]
pub struct InMemoryProxy {
    groups: Vec<RoutingGroup>,
    servers: Vec<ServerRow>,
    users: Vec<Account>,
    runtime_servers: Vec<ServerRow>,
    disk_servers: Vec<ServerRow>,
    runtime_users: Vec<Account>,
    disk_users: Vec<Account>,
    executed: Vec<AdminStatement>,
    fail_on: Option<String>,
}

impl InMemoryProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any statement whose SQL contains `pattern`
    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.fail_on = Some(pattern.to_string());
        self
    }

    /// Successfully executed statements, in order
    pub fn executed(&self) -> Vec<AdminStatement> {
        self.executed.clone()
    }

    pub fn replication_groups(&self) -> Vec<RoutingGroup> {
        self.groups.clone()
    }

    pub fn servers(&self) -> Vec<ServerRow> {
        self.servers.clone()
    }

    pub fn runtime_servers(&self) -> Vec<ServerRow> {
        self.runtime_servers.clone()
    }

    pub fn disk_servers(&self) -> Vec<ServerRow> {
        self.disk_servers.clone()
    }

    pub fn users(&self) -> Vec<Account> {
        self.users.clone()
    }

    pub fn runtime_users(&self) -> Vec<Account> {
        self.runtime_users.clone()
    }

    pub fn disk_users(&self) -> Vec<Account> {
        self.disk_users.clone()
    }
}

#[async_trait]
impl AdminExecutor for InMemoryProxy {
    async fn execute(&mut self, statement: &AdminStatement) -> Result<(), BoxError> {
        if let Some(pattern) = &self.fail_on {
            if statement.to_string().contains(pattern.as_str()) {
                return Err("injected failure".into());
            }
        }

        match statement {
            AdminStatement::DeleteReplicationGroups(group) => self.groups.retain(|g| {
                g.group_label != group.group_label
                    && !group.contains(g.writer_group_id)
                    && !group.contains(g.reader_group_id)
            }),
            AdminStatement::InsertReplicationGroup(group) => self.groups.push(group.clone()),
            AdminStatement::DeleteServers(group) => {
                self.servers.retain(|row| !group.contains(row.hostgroup_id))
            }
            AdminStatement::InsertServer {
                hostgroup_id,
                address,
                port,
            } => {
                let row = ServerRow::new(*hostgroup_id, address, *port);
                self.servers.retain(|existing| *existing != row);
                self.servers.push(row);
            }
            AdminStatement::DeleteUsers { default_hostgroup } => self
                .users
                .retain(|user| user.assigned_group_id != *default_hostgroup),
            AdminStatement::InsertUser(account) => {
                self.users.retain(|user| user.username != account.username);
                self.users.push(account.clone());
            }
            AdminStatement::LoadToRuntime(Table::Servers) => {
                self.runtime_servers = self.servers.clone()
            }
            AdminStatement::SaveToDisk(Table::Servers) => {
                self.disk_servers = self.runtime_servers.clone()
            }
            AdminStatement::LoadToRuntime(Table::Users) => self.runtime_users = self.users.clone(),
            AdminStatement::SaveToDisk(Table::Users) => self.disk_users = self.runtime_users.clone(),
        }

        self.executed.push(statement.clone());
        Ok(())
    }
}

/// Pod with one container and an optional read-only label
pub fn pod(name: &str, ip: &str, read_only: Option<&str>, container: &str, port: i32) -> PodRecord {
    let mut labels = BTreeMap::new();
    if let Some(value) = read_only {
        labels.insert("dbscale.service.read-only".to_string(), value.to_string());
    }

    PodRecord {
        name: name.to_string(),
        ip: Some(ip.to_string()),
        labels,
        containers: vec![ContainerRecord {
            name: container.to_string(),
            ports: vec![port],
        }],
    }
}

/// Inventory returning a fixed pod list
#[derive(Clone, Default)]
pub struct StaticInventory {
    pods: Vec<PodRecord>,
    error: Option<String>,
    queries: Arc<Mutex<Vec<(String, String)>>>,
}

impl StaticInventory {
    pub fn new(pods: Vec<PodRecord>) -> Self {
        Self {
            pods,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// (namespace, selector) pairs queried so far
    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PodInventory for StaticInventory {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodRecord>, BoxError> {
        self.queries
            .lock()
            .unwrap()
            .push((namespace.to_string(), selector.to_string()));

        match &self.error {
            Some(message) => Err(message.clone().into()),
            None => Ok(self.pods.clone()),
        }
    }
}

pub fn catalog_account(username: &str, password: &str, connection_limit: u32) -> CatalogAccount {
    CatalogAccount {
        username: username.to_string(),
        password: password.to_string(),
        connection_limit,
    }
}

/// Catalog holding (granted host, account) pairs
#[derive(Default)]
pub struct StaticCatalog {
    grants: Vec<(String, CatalogAccount)>,
    error: Option<String>,
    hosts_queried: Vec<String>,
}

impl StaticCatalog {
    pub fn new(grants: Vec<(&str, CatalogAccount)>) -> Self {
        Self {
            grants: grants
                .into_iter()
                .map(|(host, account)| (host.to_string(), account))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn hosts_queried(&self) -> Vec<String> {
        self.hosts_queried.clone()
    }
}

#[async_trait]
impl AccountCatalog for StaticCatalog {
    async fn accounts_for_host(&mut self, host: &str) -> Result<Vec<CatalogAccount>, BoxError> {
        self.hosts_queried.push(host.to_string());

        if let Some(message) = &self.error {
            return Err(message.clone().into());
        }

        Ok(self
            .grants
            .iter()
            .filter(|(granted, _)| granted == host)
            .map(|(_, account)| account.clone())
            .collect())
    }
}
