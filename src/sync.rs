/// One-shot sync passes: open connections, discover, reconcile, close
use crate::admin::mysql::MySqlAdmin;
use crate::admin::AdminExecutor;
use crate::config::Config;
use crate::credentials::mysql::MySqlCatalog;
use crate::credentials::{AccountCatalog, CredentialSource};
use crate::error::SyncResult;
use crate::reconcile::{reconcile_accounts, reconcile_routing, with_deadline};
use crate::topology::kubernetes::KubePodInventory;
use crate::topology::{PodInventory, TopologySource};

/// Discover database pods and replace the group's routing
pub async fn sync_servers<I, E>(config: &Config, inventory: I, admin: &mut E) -> SyncResult<()>
where
    I: PodInventory,
    E: AdminExecutor + ?Sized,
{
    let scope = config.topology.scope();
    let group = config.topology.routing_group();

    let endpoints = TopologySource::new(inventory).discover(&scope).await?;
    reconcile_routing(admin, &endpoints, &group).await
}

/// Discover catalog accounts and replace the proxy's users
pub async fn sync_users<C, E>(config: &Config, source: &mut CredentialSource<C>, admin: &mut E) -> SyncResult<()>
where
    C: AccountCatalog,
    E: AdminExecutor + ?Sized,
{
    let accounts = source.discover(&config.accounts.management_address).await?;
    reconcile_accounts(
        admin,
        &accounts,
        config.accounts.default_hostgroup,
        config.accounts.max_connections,
    )
    .await
}

/// Server sync, then user sync through the same admin connection.
///
/// A failed server pass returns before the catalog is queried.
pub async fn sync_all<I, C, E>(
    config: &Config,
    inventory: I,
    source: &mut CredentialSource<C>,
    admin: &mut E,
) -> SyncResult<()>
where
    I: PodInventory,
    C: AccountCatalog,
    E: AdminExecutor + ?Sized,
{
    sync_servers(config, inventory, admin).await?;
    sync_users(config, source, admin).await
}

/// Server sync against the live cluster and proxy, bounded by the configured deadline
pub async fn run_servers(config: &Config) -> SyncResult<()> {
    config.validate_for_servers()?;

    with_deadline("sync servers", config.sync.deadline(), async {
        let inventory = KubePodInventory::connect().await?;
        let mut admin = MySqlAdmin::connect(&config.admin).await?;

        let result = sync_servers(config, inventory, &mut admin).await;
        admin.close().await;
        result
    })
    .await
}

/// User sync against the live catalog and proxy, bounded by the configured deadline
pub async fn run_users(config: &Config) -> SyncResult<()> {
    config.validate_for_users()?;

    with_deadline("sync users", config.sync.deadline(), async {
        let mut admin = MySqlAdmin::connect(&config.admin).await?;
        let catalog = match MySqlCatalog::connect(&config.accounts.upstream).await {
            Ok(catalog) => catalog,
            Err(e) => {
                admin.close().await;
                return Err(e);
            }
        };

        let mut source = CredentialSource::new(catalog);
        let result = sync_users(config, &mut source, &mut admin).await;

        source.into_inner().close().await;
        admin.close().await;
        result
    })
    .await
}

/// Both passes against the live cluster, catalog and proxy, under one deadline
pub async fn run_all(config: &Config) -> SyncResult<()> {
    config.validate_for_servers()?;
    config.validate_for_users()?;

    with_deadline("sync all", config.sync.deadline(), async {
        let inventory = KubePodInventory::connect().await?;
        let mut admin = MySqlAdmin::connect(&config.admin).await?;
        let catalog = match MySqlCatalog::connect(&config.accounts.upstream).await {
            Ok(catalog) => catalog,
            Err(e) => {
                admin.close().await;
                return Err(e);
            }
        };

        let mut source = CredentialSource::new(catalog);
        let result = sync_all(config, inventory, &mut source, &mut admin).await;

        source.into_inner().close().await;
        admin.close().await;
        result
    })
    .await
}
