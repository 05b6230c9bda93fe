/// Routing reconciler: replication hostgroups and server rows for one group
use crate::admin::{apply, AdminExecutor, AdminStatement, ApplyPlan, Table};
use crate::core::{Endpoint, RoutingGroup};
use crate::error::{SyncError, SyncResult};

/// Build the full-replace plan for a group's routing rows.
///
/// Fails with `EmptyInput` when there is nothing to route, so a group is
/// never activated with an empty server set.
pub fn routing_plan(endpoints: &[Endpoint], group: &RoutingGroup) -> SyncResult<ApplyPlan> {
    if endpoints.is_empty() {
        return Err(SyncError::EmptyInput {
            group: group.group_label.clone(),
        });
    }

    let mut plan = ApplyPlan::new(Table::Servers);
    plan.push(AdminStatement::DeleteReplicationGroups(group.clone()));
    plan.push(AdminStatement::InsertReplicationGroup(group.clone()));
    plan.push(AdminStatement::DeleteServers(group.clone()));

    for endpoint in endpoints {
        plan.push(AdminStatement::InsertServer {
            hostgroup_id: group.group_for(endpoint.role),
            address: endpoint.address.clone(),
            port: endpoint.port,
        });
    }

    Ok(plan)
}

/// Replace the proxy's routing for `group` with `endpoints`, then activate and persist
pub async fn reconcile_routing<E: AdminExecutor + ?Sized>(
    executor: &mut E,
    endpoints: &[Endpoint],
    group: &RoutingGroup,
) -> SyncResult<()> {
    let plan = routing_plan(endpoints, group)?;

    tracing::info!(
        group = %group.group_label,
        writer_hostgroup = group.writer_group_id,
        reader_hostgroup = group.reader_group_id,
        endpoints = endpoints.len(),
        "reconciling routing"
    );

    apply(executor, &plan).await?;

    tracing::info!(group = %group.group_label, "routing reconciled");
    Ok(())
}
