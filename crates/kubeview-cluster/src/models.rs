//! Summary types built from raw cluster records.
//!
//! Each summary owns the record it was built from and adds the fields the
//! formatter needs that are not stored directly on the record.

use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ContainerStatus,
    Node,
    Pod,
    Service,
};
use kube::ResourceExt;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeReadiness {
    Ready,
    NotReady,
    Unknown,
}

impl NodeReadiness {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeReadiness::Ready => "Ready",
            NodeReadiness::NotReady => "NotReady",
            NodeReadiness::Unknown => "Unknown",
        }
    }

    /// Reads the first `Ready` condition on the node.
    pub fn from_node(node: &Node) -> Self {
        let ready = node
            .status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"));

        match ready {
            Some(condition) if condition.status == "True" => NodeReadiness::Ready,
            Some(_) => NodeReadiness::NotReady,
            None => NodeReadiness::Unknown,
        }
    }
}

impl fmt::Display for NodeReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub node: Node,
    pub status: NodeReadiness,
}

impl NodeSummary {
    pub fn name(&self) -> String {
        self.node.name_any()
    }
}

impl From<Node> for NodeSummary {
    fn from(node: Node) -> Self {
        let status = NodeReadiness::from_node(&node);
        Self { node, status }
    }
}

/// Lifecycle state of a container. At most one state applies at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state")]
pub enum ContainerState {
    Running,
    Waiting { reason: String, message: String },
    Terminated { reason: String, message: String },
    Unknown,
}

impl ContainerState {
    /// Checks running, waiting and terminated in that order.
    pub fn from_status(status: &ContainerStatus) -> Self {
        let Some(state) = status.state.as_ref() else {
            return ContainerState::Unknown;
        };

        if state.running.is_some() {
            ContainerState::Running
        } else if let Some(waiting) = &state.waiting {
            ContainerState::Waiting {
                reason: waiting.reason.clone().unwrap_or_default(),
                message: waiting.message.clone().unwrap_or_default(),
            }
        } else if let Some(terminated) = &state.terminated {
            ContainerState::Terminated {
                reason: terminated.reason.clone().unwrap_or_default(),
                message: terminated.message.clone().unwrap_or_default(),
            }
        } else {
            ContainerState::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Running => "Running",
            ContainerState::Waiting { .. } => "Waiting",
            ContainerState::Terminated { .. } => "Terminated",
            ContainerState::Unknown => "Unknown",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            ContainerState::Waiting { reason, .. } | ContainerState::Terminated { reason, .. } => {
                reason
            }
            ContainerState::Running | ContainerState::Unknown => "",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ContainerState::Waiting { message, .. }
            | ContainerState::Terminated { message, .. } => message,
            ContainerState::Running | ContainerState::Unknown => "",
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerSummary {
    pub name: String,
    pub image: String,
    pub ready: bool,
    pub restart_count: i32,
    #[serde(flatten)]
    pub state: ContainerState,
}

impl From<&ContainerStatus> for ContainerSummary {
    fn from(status: &ContainerStatus) -> Self {
        Self {
            name: status.name.clone(),
            image: status.image.clone(),
            ready: status.ready,
            restart_count: status.restart_count,
            state: ContainerState::from_status(status),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PodSummary {
    pub pod: Pod,
    pub ready_count: usize,
    pub total_count: usize,
    pub restarts: i32,
    pub containers: Vec<ContainerSummary>,
}

impl PodSummary {
    pub fn name(&self) -> String {
        self.pod.name_any()
    }

    /// Ready containers over total containers, e.g. `2/3`.
    pub fn ready(&self) -> String {
        format!("{}/{}", self.ready_count, self.total_count)
    }
}

impl From<Pod> for PodSummary {
    fn from(pod: Pod) -> Self {
        let containers: Vec<ContainerSummary> = pod
            .status
            .as_ref()
            .and_then(|status| status.container_statuses.as_ref())
            .map(|statuses| statuses.iter().map(ContainerSummary::from).collect())
            .unwrap_or_default();

        let ready_count = containers.iter().filter(|c| c.ready).count();
        let restarts = containers.iter().map(|c| c.restart_count).sum();

        Self {
            total_count: containers.len(),
            ready_count,
            restarts,
            containers,
            pod,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceSummary {
    pub service: Service,
}

impl ServiceSummary {
    pub fn name(&self) -> String {
        self.service.name_any()
    }
}

impl From<Service> for ServiceSummary {
    fn from(service: Service) -> Self {
        Self { service }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentSummary {
    pub deployment: Deployment,
}

impl DeploymentSummary {
    pub fn name(&self) -> String {
        self.deployment.name_any()
    }
}

impl From<Deployment> for DeploymentSummary {
    fn from(deployment: Deployment) -> Self {
        Self { deployment }
    }
}
