/// Credential discovery from the upstream database's account catalog
pub mod mysql;

use crate::core::CatalogAccount;
use crate::error::{BoxError, ConfigError, SyncError, SyncResult};
use async_trait::async_trait;

/// Read-only view of an account catalog
#[async_trait]
pub trait AccountCatalog: Send {
    /// Accounts granted from exactly `host`, in catalog order
    async fn accounts_for_host(&mut self, host: &str) -> Result<Vec<CatalogAccount>, BoxError>;
}

/// Discovers the accounts a proxy should expose
pub struct CredentialSource<C> {
    catalog: C,
}

impl<C: AccountCatalog> CredentialSource<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Accounts granted to `management_address`. An empty result is not an error.
    pub async fn discover(&mut self, management_address: &str) -> SyncResult<Vec<CatalogAccount>> {
        if management_address.is_empty() {
            return Err(ConfigError::ValidationError(
                "management address cannot be empty".to_string(),
            )
            .into());
        }

        let accounts = self
            .catalog
            .accounts_for_host(management_address)
            .await
            .map_err(|e| SyncError::lookup(format!("accounts for host {}", management_address), e))?;

        for account in &accounts {
            tracing::info!(user = %account.username, "found user");
        }
        tracing::info!(host = %management_address, users = accounts.len(), "account lookup complete");

        Ok(accounts)
    }

    /// Give back the catalog, e.g. to close its connection
    pub fn into_inner(self) -> C {
        self.catalog
    }
}
