use std::fmt::Debug;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    Node,
    Pod,
    Service,
};
use kube::api::ListParams;
use kube::{
    Api,
    Client,
};
use log::debug;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::models::{
    DeploymentSummary,
    NodeSummary,
    PodSummary,
    ServiceSummary,
};

/// Read-only access to the cluster.
///
/// Cloning is cheap; all clones share the underlying connection pool, so one
/// instance is built at startup and handed to every consumer.
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
}

impl ClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_nodes(
        &self, cancel: &CancellationToken,
    ) -> Result<Vec<NodeSummary>, FetchError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = list(api, "nodes", cancel).await?;
        debug!("Listed {} node(s)", nodes.len());
        Ok(nodes.into_iter().map(NodeSummary::from).collect())
    }

    pub async fn get_pods(
        &self, cancel: &CancellationToken, namespace: &str,
    ) -> Result<Vec<PodSummary>, FetchError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = list(api, "pods", cancel).await?;
        debug!("Listed {} pod(s) in namespace '{namespace}'", pods.len());
        Ok(pods.into_iter().map(PodSummary::from).collect())
    }

    pub async fn get_services(
        &self, cancel: &CancellationToken, namespace: &str,
    ) -> Result<Vec<ServiceSummary>, FetchError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let services = list(api, "services", cancel).await?;
        debug!(
            "Listed {} service(s) in namespace '{namespace}'",
            services.len()
        );
        Ok(services.into_iter().map(ServiceSummary::from).collect())
    }

    pub async fn get_deployments(
        &self, cancel: &CancellationToken, namespace: &str,
    ) -> Result<Vec<DeploymentSummary>, FetchError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let deployments = list(api, "deployments", cancel).await?;
        debug!(
            "Listed {} deployment(s) in namespace '{namespace}'",
            deployments.len()
        );
        Ok(deployments
            .into_iter()
            .map(DeploymentSummary::from)
            .collect())
    }
}

/// One list call, abandoned as soon as `cancel` fires.
async fn list<K>(
    api: Api<K>, kind: &'static str, cancel: &CancellationToken,
) -> Result<Vec<K>, FetchError>
where
    K: Clone + DeserializeOwned + Debug,
{
    let params = ListParams::default();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled { kind }),
        result = api.list(&params) => result
            .map(|list| list.items)
            .map_err(|source| FetchError::Api { kind, source }),
    }
}
