//! Plain-text renderers for summary collections.
//!
//! The output is meant to be read by a language model or a human, so every
//! block uses the same `**name** (status)` heading followed by indented
//! `  - Key: value` lines. All renderers are deterministic: label maps are
//! ordered and nothing depends on the local clock or timezone.

use std::collections::BTreeMap;
use std::fmt::Write;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;

use crate::error::FormatError;
use crate::models::{
    DeploymentSummary,
    NodeSummary,
    PodSummary,
    ServiceSummary,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_nodes(nodes: &[NodeSummary]) -> String {
    if nodes.is_empty() {
        return "No nodes found".to_string();
    }

    let mut output = format!("Found {} node(s):\n\n", nodes.len());
    for summary in nodes {
        let status = summary.node.status.as_ref();
        let info = status.and_then(|s| s.node_info.as_ref());

        let _ = writeln!(output, "**{}** ({})", summary.name(), summary.status);
        let _ = writeln!(
            output,
            "  - Version: {}",
            info.map(|i| i.kubelet_version.as_str()).unwrap_or_default()
        );
        let _ = writeln!(
            output,
            "  - OS: {}",
            info.map(|i| i.os_image.as_str()).unwrap_or_default()
        );
        let _ = writeln!(
            output,
            "  - Kernel: {}",
            info.map(|i| i.kernel_version.as_str()).unwrap_or_default()
        );
        let _ = writeln!(
            output,
            "  - Created: {}",
            format_timestamp(summary.node.metadata.creation_timestamp.as_ref())
        );

        if let Some(addresses) = status.and_then(|s| s.addresses.as_ref())
            && !addresses.is_empty()
        {
            output.push_str("  - Addresses:\n");
            for addr in addresses {
                let _ = writeln!(output, "    - {}: {}", addr.type_, addr.address);
            }
        }

        if let Some(capacity) = status.and_then(|s| s.capacity.as_ref()) {
            if let Some(cpu) = capacity.get("cpu").filter(|q| !is_zero_quantity(q)) {
                let _ = writeln!(output, "  - CPU: {}", cpu.0);
            }
            if let Some(memory) = capacity.get("memory").filter(|q| !is_zero_quantity(q)) {
                let _ = writeln!(output, "  - Memory: {}", memory.0);
            }
        }
        output.push('\n');
    }

    output
}

pub fn format_pods(pods: &[PodSummary], namespace: &str) -> String {
    if pods.is_empty() {
        return format!("No pods found in namespace '{namespace}'");
    }

    let mut output = format!("Found {} pod(s) in namespace '{namespace}':\n\n", pods.len());
    for summary in pods {
        let status = summary.pod.status.as_ref();
        let phase = status
            .and_then(|s| s.phase.as_deref())
            .unwrap_or_default();
        let node_name = summary
            .pod
            .spec
            .as_ref()
            .and_then(|s| s.node_name.as_deref())
            .unwrap_or_default();
        let pod_ip = status.and_then(|s| s.pod_ip.as_deref()).unwrap_or_default();

        let _ = writeln!(output, "**{}** ({phase})", summary.name());
        let _ = writeln!(output, "  - Node: {node_name}");
        let _ = writeln!(output, "  - Ready: {}", summary.ready());
        let _ = writeln!(output, "  - Restarts: {}", summary.restarts);
        let _ = writeln!(output, "  - IP: {pod_ip}");
        let _ = writeln!(
            output,
            "  - Created: {}",
            format_timestamp(summary.pod.metadata.creation_timestamp.as_ref())
        );

        if !summary.containers.is_empty() {
            output.push_str("  - Containers:\n");
            for container in &summary.containers {
                let _ = writeln!(
                    output,
                    "    - {}: {} (restarts: {})",
                    container.name, container.state, container.restart_count
                );
                let reason = container.state.reason();
                if !reason.is_empty() {
                    let _ = writeln!(output, "      Reason: {reason}");
                }
            }
        }
        output.push('\n');
    }

    output
}

pub fn format_services(services: &[ServiceSummary], namespace: &str) -> String {
    if services.is_empty() {
        return format!("No services found in namespace '{namespace}'");
    }

    let mut output = format!(
        "Found {} service(s) in namespace '{namespace}':\n\n",
        services.len()
    );
    for summary in services {
        let spec = summary.service.spec.as_ref();
        let service_type = spec
            .and_then(|s| s.type_.as_deref())
            .unwrap_or_default();
        let cluster_ip = spec
            .and_then(|s| s.cluster_ip.as_deref())
            .unwrap_or_default();

        let _ = writeln!(output, "**{}** ({service_type})", summary.name());
        let _ = writeln!(output, "  - Cluster IP: {cluster_ip}");

        if let Some(ports) = spec.and_then(|s| s.ports.as_ref())
            && !ports.is_empty()
        {
            output.push_str("  - Ports:\n");
            for port in ports {
                let protocol = port.protocol.as_deref().unwrap_or("TCP");
                let _ = write!(output, "    - {}/{protocol}", port.port);
                match &port.target_port {
                    Some(IntOrString::Int(target)) if *target != 0 => {
                        let _ = write!(output, " -> {target}");
                    }
                    Some(IntOrString::String(target)) if !target.is_empty() => {
                        let _ = write!(output, " -> {target}");
                    }
                    _ => {}
                }
                if let Some(name) = port.name.as_deref().filter(|n| !n.is_empty()) {
                    let _ = write!(output, " ({name})");
                }
                output.push('\n');
            }
        }

        write_labels(&mut output, spec.and_then(|s| s.selector.as_ref()));

        let _ = writeln!(
            output,
            "  - Created: {}",
            format_timestamp(summary.service.metadata.creation_timestamp.as_ref())
        );
        output.push('\n');
    }

    output
}

pub fn format_deployments(deployments: &[DeploymentSummary], namespace: &str) -> String {
    if deployments.is_empty() {
        return format!("No deployments found in namespace '{namespace}'");
    }

    let mut output = format!(
        "Found {} deployment(s) in namespace '{namespace}':\n\n",
        deployments.len()
    );
    for summary in deployments {
        let status = summary.deployment.status.as_ref();
        let spec = summary.deployment.spec.as_ref();
        let replicas = status.and_then(|s| s.replicas).unwrap_or(0);
        let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
        let updated = status.and_then(|s| s.updated_replicas).unwrap_or(0);
        let available = status.and_then(|s| s.available_replicas).unwrap_or(0);
        let strategy = spec
            .and_then(|s| s.strategy.as_ref())
            .and_then(|s| s.type_.as_deref())
            .unwrap_or_default();

        let _ = writeln!(output, "**{}**", summary.name());
        let _ = writeln!(output, "  - Replicas: {ready}/{replicas} ready");
        let _ = writeln!(output, "  - Updated: {updated}");
        let _ = writeln!(output, "  - Available: {available}");
        let _ = writeln!(output, "  - Strategy: {strategy}");
        let _ = writeln!(
            output,
            "  - Created: {}",
            format_timestamp(summary.deployment.metadata.creation_timestamp.as_ref())
        );

        write_labels(
            &mut output,
            spec.and_then(|s| s.selector.match_labels.as_ref()),
        );

        // Only conditions that are not satisfied are worth surfacing.
        if let Some(conditions) = status.and_then(|s| s.conditions.as_ref()) {
            for condition in conditions.iter().filter(|c| c.status != "True") {
                let _ = writeln!(
                    output,
                    "  - Issue: {} - {}",
                    condition.reason.as_deref().unwrap_or_default(),
                    condition.message.as_deref().unwrap_or_default()
                );
            }
        }

        output.push('\n');
    }

    output
}

/// Pretty-prints any serializable value as two-space indented JSON.
pub fn try_format_as_json<T: Serialize + ?Sized>(data: &T) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Like [`try_format_as_json`], but a serialization failure is rendered as
/// inline text instead of being returned.
pub fn format_as_json<T: Serialize + ?Sized>(data: &T) -> String {
    try_format_as_json(data).unwrap_or_else(|e| e.to_string())
}

fn write_labels(output: &mut String, labels: Option<&BTreeMap<String, String>>) {
    if let Some(labels) = labels
        && !labels.is_empty()
    {
        output.push_str("  - Selector:\n");
        for (key, value) in labels {
            let _ = writeln!(output, "    - {key}: {value}");
        }
    }
}

fn format_timestamp(time: Option<&Time>) -> String {
    match time {
        Some(time) => time.0.strftime(TIMESTAMP_FORMAT).to_string(),
        None => "unknown".to_string(),
    }
}

/// Quantities are strings such as `4`, `0`, `16Gi` or `500m`; only the
/// numeric part decides whether the value is zero.
fn is_zero_quantity(quantity: &Quantity) -> bool {
    let value = quantity.0.trim();
    if value.is_empty() {
        return true;
    }
    let numeric = value.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    numeric.parse::<f64>().is_ok_and(|n| n == 0.0)
}
