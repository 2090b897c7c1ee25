//! Read-only Kubernetes introspection.
//!
//! [`ClusterClient`] lists nodes, pods, services and deployments and turns
//! each record into a summary; the [`format`] module renders those summaries
//! as text for tool output.

pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod models;

pub use client::ClusterClient;
pub use config::{
    ClusterOptions,
    KubeconfigSource,
    create_client,
};
pub use error::{
    ConfigError,
    FetchError,
    FormatError,
};
pub use models::{
    ContainerState,
    ContainerSummary,
    DeploymentSummary,
    NodeReadiness,
    NodeSummary,
    PodSummary,
    ServiceSummary,
};
