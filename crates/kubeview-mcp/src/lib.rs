//! kubeview MCP server - read-only Kubernetes introspection for LLMs.
//!
//! Exposes `k8s_get_nodes`, `k8s_get_pods`, `k8s_get_services` and
//! `k8s_get_deployments` as MCP tools over stdio.

pub mod protocol;
pub mod server;
pub mod tools;
