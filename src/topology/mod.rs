/// Topology discovery: live database endpoints from the pod inventory
///
/// Pods are selected by the service-group and workload-type labels. Within
/// each pod only the container named after the workload type contributes an
/// endpoint, so sidecars never end up in the routing table.
pub mod kubernetes;

use crate::core::{Endpoint, Role};
use crate::error::{BoxError, SyncError, SyncResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// How many writers a discovery pass may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CardinalityPolicy {
    /// Exactly one writer, and at least one matching pod
    #[default]
    SingleWriter,
    /// Any number of endpoints
    Any,
}

/// What to look for in the inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryScope {
    pub namespace: String,
    pub group_label_key: String,
    pub group_name: String,
    pub type_label_key: String,
    /// Workload type label value, also the database container name
    pub workload_type: String,
    pub role_label_key: Option<String>,
    pub policy: CardinalityPolicy,
}

impl DiscoveryScope {
    /// Label selector matching every pod of the group's workload type
    pub fn label_selector(&self) -> String {
        format!(
            "{}={},{}={}",
            self.group_label_key, self.group_name, self.type_label_key, self.workload_type
        )
    }
}

/// A container as declared in the pod spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub name: String,
    /// Declared container ports, in declaration order
    pub ports: Vec<i32>,
}

/// The parts of a pod discovery needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRecord {
    pub name: String,
    pub ip: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub containers: Vec<ContainerRecord>,
}

/// Read-only view of the workload inventory
#[async_trait]
pub trait PodInventory: Send + Sync {
    /// List pods in `namespace` matching every term of `selector`
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodRecord>, BoxError>;
}

/// Discovers endpoints for a scope from a pod inventory
pub struct TopologySource<I> {
    inventory: I,
}

impl<I: PodInventory> TopologySource<I> {
    pub fn new(inventory: I) -> Self {
        Self { inventory }
    }

    /// Discover the endpoints of a scope.
    ///
    /// Role labels of every pod are validated before anything is returned, so
    /// a single bad label fails the whole discovery.
    pub async fn discover(&self, scope: &DiscoveryScope) -> SyncResult<Vec<Endpoint>> {
        let selector = scope.label_selector();
        let pods = self
            .inventory
            .list_pods(&scope.namespace, &selector)
            .await
            .map_err(|e| {
                SyncError::lookup(
                    format!("list pods in {} with {}", scope.namespace, selector),
                    e,
                )
            })?;

        tracing::info!(
            group = %scope.group_name,
            namespace = %scope.namespace,
            pods = pods.len(),
            "found pods"
        );

        if pods.is_empty() && scope.policy == CardinalityPolicy::SingleWriter {
            return Err(SyncError::ambiguous(
                scope.group_name.as_str(),
                format!("no pods match {}", selector),
            ));
        }

        let roles = pods
            .iter()
            .map(|pod| classify(pod, scope.role_label_key.as_deref()))
            .collect::<SyncResult<Vec<Role>>>()?;

        let mut seen = HashSet::new();
        let mut endpoints = Vec::new();

        for (pod, role) in pods.iter().zip(roles) {
            let Some(ip) = pod.ip.as_deref().filter(|ip| !ip.is_empty()) else {
                tracing::warn!(pod = %pod.name, "pod has no IP yet, skipping");
                continue;
            };

            for container in pod.containers.iter().filter(|c| c.name == scope.workload_type) {
                let port = first_port(pod, container)?;
                if !seen.insert((ip.to_string(), port)) {
                    tracing::warn!(pod = %pod.name, address = %ip, port, "duplicate endpoint, skipping");
                    continue;
                }

                let endpoint = Endpoint::new(ip, port, role);
                tracing::info!(pod = %pod.name, endpoint = %endpoint, "discovered endpoint");
                endpoints.push(endpoint);
            }
        }

        if scope.policy == CardinalityPolicy::SingleWriter {
            check_single_writer(&scope.group_name, &endpoints)?;
        }

        Ok(endpoints)
    }
}

fn classify(pod: &PodRecord, role_label_key: Option<&str>) -> SyncResult<Role> {
    let Some(key) = role_label_key else {
        return Ok(Role::Unspecified);
    };

    let value = pod.labels.get(key);
    value
        .and_then(|v| Role::from_read_only(v))
        .ok_or_else(|| SyncError::LabelInvalid {
            pod: pod.name.clone(),
            label: key.to_string(),
            value: value.cloned(),
        })
}

fn first_port(pod: &PodRecord, container: &ContainerRecord) -> SyncResult<u16> {
    container
        .ports
        .first()
        .and_then(|port| u16::try_from(*port).ok())
        .filter(|port| *port != 0)
        .ok_or_else(|| SyncError::MissingPort {
            pod: pod.name.clone(),
            container: container.name.clone(),
        })
}

fn check_single_writer(group: &str, endpoints: &[Endpoint]) -> SyncResult<()> {
    let writers: Vec<&Endpoint> = endpoints.iter().filter(|e| e.role.is_writer()).collect();

    match writers.len() {
        1 => Ok(()),
        0 if endpoints.is_empty() => Err(SyncError::ambiguous(group, "no database endpoints")),
        0 => Err(SyncError::ambiguous(group, "no pod claims the writer role")),
        n => Err(SyncError::ambiguous(
            group,
            format!(
                "{} pods claim the writer role: {}",
                n,
                writers
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )),
    }
}
