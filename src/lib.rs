/// proxysql-sync - keeps ProxySQL's routing and user tables in line with the cluster
///
/// Two one-shot passes are provided:
/// 1. Servers: discover database pods by label and replace the service
///    group's replication hostgroup and server rows
/// 2. Users: read the accounts granted to the management address from the
///    upstream user catalog and replace the proxy's user rows
///
/// Both passes are full-replace: rows in scope are deleted, the desired set is
/// inserted, then the proxy is told to load the tables to runtime and save
/// them to disk.
pub mod admin;
pub mod config;
pub mod core;
pub mod credentials;
pub mod error;
pub mod reconcile;
pub mod sync;
pub mod topology;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::core::{Account, CatalogAccount, Endpoint, Role, RoutingGroup};
pub use crate::error::{SyncError, SyncResult};

/// Which pass a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Servers,
    Users,
    /// Servers, then users; stops at the first failing pass
    All,
}

impl SyncMode {
    /// Get the mode as a string for logging
    pub fn mode_name(&self) -> &'static str {
        match self {
            SyncMode::Servers => "servers",
            SyncMode::Users => "users",
            SyncMode::All => "all",
        }
    }

    /// Run this pass once with the given configuration
    pub async fn run(&self, config: &config::Config) -> SyncResult<()> {
        match self {
            SyncMode::Servers => sync::run_servers(config).await,
            SyncMode::Users => sync::run_users(config).await,
            SyncMode::All => sync::run_all(config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_name() {
        assert_eq!(SyncMode::Servers.mode_name(), "servers");
        assert_eq!(SyncMode::Users.mode_name(), "users");
        assert_eq!(SyncMode::All.mode_name(), "all");
    }

    #[tokio::test]
    async fn test_run_validates_before_connecting() {
        let config = config::Config::default();
        for mode in [SyncMode::Servers, SyncMode::Users, SyncMode::All] {
            let err = mode.run(&config).await.unwrap_err();
            assert_eq!(err.stage(), error::Stage::Config);
        }
    }
}
