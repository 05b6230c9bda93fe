/// Kubernetes pod inventory
use super::{ContainerRecord, PodInventory, PodRecord};
use crate::error::{BoxError, SyncError, SyncResult};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};

/// Pod inventory backed by the Kubernetes API
#[derive(Clone)]
pub struct KubePodInventory {
    client: Client,
}

impl KubePodInventory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using in-cluster configuration, falling back to the local kubeconfig
    pub async fn connect() -> SyncResult<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| SyncError::connect("kubernetes api", e))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PodInventory for KubePodInventory {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodRecord>, BoxError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().labels(selector);

        let list = pods.list(&lp).await?;
        Ok(list.items.iter().map(pod_record).collect())
    }
}

/// Reduce a pod object to what discovery reads
fn pod_record(pod: &Pod) -> PodRecord {
    let containers = pod
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|c| ContainerRecord {
                    name: c.name.clone(),
                    ports: c
                        .ports
                        .as_ref()
                        .map(|ports| ports.iter().map(|p| p.container_port).collect())
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    PodRecord {
        name: pod.name_any(),
        ip: pod.status.as_ref().and_then(|s| s.pod_ip.clone()),
        labels: pod.labels().clone(),
        containers,
    }
}
