/// Proxy admin catalog: typed statements and the write/activate/persist sequence
pub mod mysql;

use crate::core::{Account, RoutingGroup};
use crate::error::{BoxError, SyncError, SyncResult};
use async_trait::async_trait;
use std::fmt;

/// Admin catalog table family an activate/persist directive applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Servers,
    Users,
}

impl Table {
    fn directive_name(&self) -> &'static str {
        match self {
            Table::Servers => "MYSQL SERVERS",
            Table::Users => "MYSQL USERS",
        }
    }
}

/// A statement against the proxy's admin catalog.
///
/// Rendering escapes every externally sourced string, so the text protocol
/// can be used against the admin interface (which has no prepared statements).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminStatement {
    /// Remove the group's replication hostgroup definition, and any row that
    /// would collide with its writer or reader id
    DeleteReplicationGroups(RoutingGroup),
    InsertReplicationGroup(RoutingGroup),
    /// Remove server rows belonging to either of the group's hostgroups
    DeleteServers(RoutingGroup),
    InsertServer {
        hostgroup_id: u32,
        address: String,
        port: u16,
    },
    /// Remove user rows whose default hostgroup is the given id
    DeleteUsers { default_hostgroup: u32 },
    InsertUser(Account),
    LoadToRuntime(Table),
    SaveToDisk(Table),
}

impl AdminStatement {
    /// Whether this statement is an activate/persist directive
    pub fn is_directive(&self) -> bool {
        matches!(
            self,
            AdminStatement::LoadToRuntime(_) | AdminStatement::SaveToDisk(_)
        )
    }

    /// Statement text with secrets masked, for logs and error messages
    pub fn redacted(&self) -> String {
        match self {
            AdminStatement::InsertUser(account) => format!(
                "REPLACE INTO mysql_users(username,password,default_hostgroup,max_connections) VALUES ({},'***',{},{})",
                quote(&account.username),
                account.assigned_group_id,
                account.max_connections
            ),
            other => other.to_string(),
        }
    }
}

/// Quote a string literal for the admin SQL dialect.
///
/// The admin catalog is SQLite-backed: quotes are doubled, backslashes are literal.
pub fn quote(value: &str) -> String {
    mysql_async::Value::from(value).as_sql(true)
}

impl fmt::Display for AdminStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminStatement::DeleteReplicationGroups(group) => write!(
                f,
                "DELETE FROM mysql_replication_hostgroups WHERE comment = {} OR writer_hostgroup IN ({w},{r}) OR reader_hostgroup IN ({w},{r})",
                quote(&group.group_label),
                w = group.writer_group_id,
                r = group.reader_group_id
            ),
            AdminStatement::InsertReplicationGroup(group) => write!(
                f,
                "INSERT INTO mysql_replication_hostgroups(writer_hostgroup,reader_hostgroup,comment) VALUES ({},{},{})",
                group.writer_group_id,
                group.reader_group_id,
                quote(&group.group_label)
            ),
            AdminStatement::DeleteServers(group) => write!(
                f,
                "DELETE FROM mysql_servers WHERE hostgroup_id IN ({},{})",
                group.writer_group_id, group.reader_group_id
            ),
            AdminStatement::InsertServer {
                hostgroup_id,
                address,
                port,
            } => write!(
                f,
                "REPLACE INTO mysql_servers(hostgroup_id,hostname,port) VALUES ({},{},{})",
                hostgroup_id,
                quote(address),
                port
            ),
            AdminStatement::DeleteUsers { default_hostgroup } => write!(
                f,
                "DELETE FROM mysql_users WHERE default_hostgroup = {}",
                default_hostgroup
            ),
            AdminStatement::InsertUser(account) => write!(
                f,
                "REPLACE INTO mysql_users(username,password,default_hostgroup,max_connections) VALUES ({},{},{},{})",
                quote(&account.username),
                quote(&account.password),
                account.assigned_group_id,
                account.max_connections
            ),
            AdminStatement::LoadToRuntime(table) => {
                write!(f, "LOAD {} TO RUNTIME", table.directive_name())
            }
            AdminStatement::SaveToDisk(table) => {
                write!(f, "SAVE {} TO DISK", table.directive_name())
            }
        }
    }
}

/// Execution seam for the proxy's admin interface
#[async_trait]
pub trait AdminExecutor: Send {
    /// Execute a single admin statement
    async fn execute(&mut self, statement: &AdminStatement) -> Result<(), BoxError>;
}

/// Ordered statements of one full-replace pass over a table family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyPlan {
    pub table: Table,
    pub writes: Vec<AdminStatement>,
}

impl ApplyPlan {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            writes: Vec::new(),
        }
    }

    pub fn push(&mut self, statement: AdminStatement) {
        self.writes.push(statement);
    }

    /// All statements in execution order, directives included
    pub fn statements(&self) -> Vec<AdminStatement> {
        let mut statements = self.writes.clone();
        statements.push(AdminStatement::LoadToRuntime(self.table));
        statements.push(AdminStatement::SaveToDisk(self.table));
        statements
    }
}

/// Execute a plan: writes, then activate, then persist.
///
/// The first failing statement aborts the rest. Write failures surface as
/// `Apply`, directive failures as `Activation`. Nothing is rolled back.
pub async fn apply<E: AdminExecutor + ?Sized>(executor: &mut E, plan: &ApplyPlan) -> SyncResult<()> {
    for statement in &plan.writes {
        executor
            .execute(statement)
            .await
            .map_err(|source| SyncError::Apply {
                statement: statement.redacted(),
                source,
            })?;
        tracing::debug!(statement = %statement.redacted(), "executed");
    }

    tracing::info!(table = ?plan.table, writes = plan.writes.len(), "catalog rows written");

    for directive in [
        AdminStatement::LoadToRuntime(plan.table),
        AdminStatement::SaveToDisk(plan.table),
    ] {
        executor
            .execute(&directive)
            .await
            .map_err(|source| SyncError::Activation {
                directive: directive.to_string(),
                source,
            })?;
        tracing::info!(directive = %directive, "directive executed");
    }

    Ok(())
}
