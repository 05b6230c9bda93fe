/// Core data model shared by discovery and reconciliation
use std::fmt;

/// Role a backend plays inside its replication group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Writer,
    Reader,
    /// No role label configured; routed as a writer
    Unspecified,
}

impl Role {
    /// Classify a read-only label value ("true" means read replica)
    pub fn from_read_only(value: &str) -> Option<Self> {
        match value {
            "true" => Some(Role::Reader),
            "false" => Some(Role::Writer),
            _ => None,
        }
    }

    /// Whether this endpoint takes writes
    pub fn is_writer(&self) -> bool {
        matches!(self, Role::Writer | Role::Unspecified)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Writer => write!(f, "writer"),
            Role::Reader => write!(f, "reader"),
            Role::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// A live database endpoint discovered from the pod inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
    pub role: Role,
}

impl Endpoint {
    pub fn new<S: Into<String>>(address: S, port: u16, role: Role) -> Self {
        Self {
            address: address.into(),
            port,
            role,
        }
    }

    /// Identity of the endpoint; role is not part of it
    pub fn key(&self) -> (&str, u16) {
        (&self.address, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.address, self.port, self.role)
    }
}

/// One logical backend cluster's replication hostgroup pair inside the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingGroup {
    pub writer_group_id: u32,
    pub reader_group_id: u32,
    pub group_label: String,
}

impl RoutingGroup {
    pub fn new<S: Into<String>>(writer_group_id: u32, reader_group_id: u32, group_label: S) -> Self {
        Self {
            writer_group_id,
            reader_group_id,
            group_label: group_label.into(),
        }
    }

    /// Hostgroup an endpoint with the given role is routed to
    pub fn group_for(&self, role: Role) -> u32 {
        if role.is_writer() {
            self.writer_group_id
        } else {
            self.reader_group_id
        }
    }

    pub fn contains(&self, hostgroup_id: u32) -> bool {
        hostgroup_id == self.writer_group_id || hostgroup_id == self.reader_group_id
    }
}

/// Account as stored in the upstream database's user catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogAccount {
    pub username: String,
    pub password: String,
    /// Per-user connection limit, 0 means unlimited
    pub connection_limit: u32,
}

/// Account row as written into the proxy's user table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub assigned_group_id: u32,
    pub max_connections: u32,
}

impl Account {
    /// Build the proxy row for a catalog account.
    ///
    /// The connection ceiling is lowered to the catalog's own per-user limit
    /// when one is set.
    pub fn from_catalog(account: &CatalogAccount, assigned_group_id: u32, max_connections: u32) -> Self {
        let max_connections = match account.connection_limit {
            0 => max_connections,
            limit => limit.min(max_connections),
        };

        Self {
            username: account.username.clone(),
            password: account.password.clone(),
            assigned_group_id,
            max_connections,
        }
    }
}
