use kube::config::{
    InClusterError,
    KubeconfigError,
};
use thiserror::Error;

/// Failure to establish cluster credentials or build the API client.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read kubeconfig from {path}: {source}")]
    ReadKubeconfig {
        path: String,
        #[source]
        source: KubeconfigError,
    },

    #[error("Failed to merge kubeconfig from {path}: {source}")]
    MergeKubeconfig {
        path: String,
        #[source]
        source: KubeconfigError,
    },

    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] KubeconfigError),

    #[error("Failed to load in-cluster configuration: {0}")]
    InCluster(#[from] InClusterError),

    #[error("Failed to create kubernetes client: {0}")]
    Client(#[from] kube::Error),
}

/// Failure of a single list call against the API server.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to get {kind}: {source}")]
    Api {
        kind: &'static str,
        #[source]
        source: kube::Error,
    },

    #[error("failed to get {kind}: request cancelled")]
    Cancelled { kind: &'static str },
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Api { kind, .. } | FetchError::Cancelled { kind } => kind,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled { .. })
    }
}

#[derive(Debug, Error)]
#[error("Error formatting as JSON: {0}")]
pub struct FormatError(#[from] pub serde_json::Error);
