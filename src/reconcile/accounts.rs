/// Credential reconciler: mirrors catalog accounts into the proxy's user table
use crate::admin::{apply, AdminExecutor, AdminStatement, ApplyPlan, Table};
use crate::core::{Account, CatalogAccount};
use crate::error::SyncResult;
use std::collections::HashSet;

/// Build the full-replace plan for the users assigned to `assigned_group_id`.
///
/// Returns `None` when there is nothing to sync; no statement is issued then.
pub fn accounts_plan(
    accounts: &[CatalogAccount],
    assigned_group_id: u32,
    max_connections: u32,
) -> Option<ApplyPlan> {
    if accounts.is_empty() {
        return None;
    }

    let mut plan = ApplyPlan::new(Table::Users);
    plan.push(AdminStatement::DeleteUsers {
        default_hostgroup: assigned_group_id,
    });

    let mut seen = HashSet::new();
    for account in accounts {
        if !seen.insert(account.username.as_str()) {
            tracing::warn!(user = %account.username, "duplicate user in catalog, skipping");
            continue;
        }
        plan.push(AdminStatement::InsertUser(Account::from_catalog(
            account,
            assigned_group_id,
            max_connections,
        )));
    }

    Some(plan)
}

/// Replace the proxy's users for `assigned_group_id`, then activate and persist.
///
/// An empty account set is a successful no-op: it means nothing is
/// configured yet, not that access should be revoked.
pub async fn reconcile_accounts<E: AdminExecutor + ?Sized>(
    executor: &mut E,
    accounts: &[CatalogAccount],
    assigned_group_id: u32,
    max_connections: u32,
) -> SyncResult<()> {
    let Some(plan) = accounts_plan(accounts, assigned_group_id, max_connections) else {
        tracing::info!("not found user to sync");
        return Ok(());
    };

    tracing::info!(
        default_hostgroup = assigned_group_id,
        max_connections,
        users = plan.writes.len() - 1,
        "reconciling users"
    );

    apply(executor, &plan).await?;

    tracing::info!(default_hostgroup = assigned_group_id, "users reconciled");
    Ok(())
}
