//! Kubernetes introspection tools for MCP.
//!
//! Nodes are cluster-scoped and take no arguments. Pods, services and
//! deployments take an optional `namespace` that falls back to `default`.

use kubeview_cluster::ClusterClient;
use kubeview_cluster::format::{
    format_as_json,
    format_deployments,
    format_nodes,
    format_pods,
    format_services,
};
use log::debug;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Value,
    json,
};
use tokio_util::sync::CancellationToken;

use crate::protocol::{
    CallToolResult,
    Tool,
};
use crate::tools::{
    McpTool,
    OutputFormat,
    ToolError,
};

pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Default, Deserialize)]
struct NamespaceArgs {
    #[serde(default)]
    namespace: Option<String>,
}

/// Reads the optional `namespace` argument; absent, null or empty values
/// select [`DEFAULT_NAMESPACE`].
fn namespace_from(arguments: Option<Value>) -> Result<String, ToolError> {
    let args: NamespaceArgs = match arguments {
        None | Some(Value::Null) => NamespaceArgs::default(),
        Some(v) => serde_json::from_value(v)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?,
    };

    Ok(args
        .namespace
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()))
}

fn namespace_schema(kind: &str) -> Value {
    json!({
        "namespace": {
            "type": "string",
            "description": format!("Kubernetes namespace to list {kind} from (defaults to 'default')")
        }
    })
}

fn render<T: Serialize>(
    output: OutputFormat, items: &[T], as_text: impl FnOnce(&[T]) -> String,
) -> CallToolResult {
    match output {
        OutputFormat::Text => CallToolResult::text(as_text(items)),
        OutputFormat::Json => CallToolResult::text(format_as_json(items)),
    }
}

// ============================================================================
// Get Nodes Tool
// ============================================================================

pub struct GetNodesTool {
    client: ClusterClient,
    output: OutputFormat,
}

impl GetNodesTool {
    pub fn new(client: ClusterClient, output: OutputFormat) -> Self {
        Self { client, output }
    }
}

#[async_trait::async_trait]
impl McpTool for GetNodesTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "k8s_get_nodes",
            "Get all Kubernetes nodes with their readiness, kubelet version, OS, addresses and capacity.",
        )
    }

    async fn execute(
        &self, _arguments: Option<Value>, cancel: &CancellationToken,
    ) -> Result<CallToolResult, ToolError> {
        let nodes = self.client.get_nodes(cancel).await?;
        Ok(render(self.output, &nodes, format_nodes))
    }
}

// ============================================================================
// Get Pods Tool
// ============================================================================

pub struct GetPodsTool {
    client: ClusterClient,
    output: OutputFormat,
}

impl GetPodsTool {
    pub fn new(client: ClusterClient, output: OutputFormat) -> Self {
        Self { client, output }
    }
}

#[async_trait::async_trait]
impl McpTool for GetPodsTool {
    fn definition(&self) -> Tool {
        Tool::with_schema(
            "k8s_get_pods",
            "Get Kubernetes pods in a namespace with phase, readiness, restarts and per-container state.",
            namespace_schema("pods"),
            None,
        )
    }

    async fn execute(
        &self, arguments: Option<Value>, cancel: &CancellationToken,
    ) -> Result<CallToolResult, ToolError> {
        let namespace = namespace_from(arguments)?;
        debug!("Getting pods in namespace '{namespace}'");
        let pods = self.client.get_pods(cancel, &namespace).await?;
        Ok(render(self.output, &pods, |pods| {
            format_pods(pods, &namespace)
        }))
    }
}

// ============================================================================
// Get Services Tool
// ============================================================================

pub struct GetServicesTool {
    client: ClusterClient,
    output: OutputFormat,
}

impl GetServicesTool {
    pub fn new(client: ClusterClient, output: OutputFormat) -> Self {
        Self { client, output }
    }
}

#[async_trait::async_trait]
impl McpTool for GetServicesTool {
    fn definition(&self) -> Tool {
        Tool::with_schema(
            "k8s_get_services",
            "Get Kubernetes services in a namespace with type, cluster IP, ports and selector.",
            namespace_schema("services"),
            None,
        )
    }

    async fn execute(
        &self, arguments: Option<Value>, cancel: &CancellationToken,
    ) -> Result<CallToolResult, ToolError> {
        let namespace = namespace_from(arguments)?;
        debug!("Getting services in namespace '{namespace}'");
        let services = self.client.get_services(cancel, &namespace).await?;
        Ok(render(self.output, &services, |services| {
            format_services(services, &namespace)
        }))
    }
}

// ============================================================================
// Get Deployments Tool
// ============================================================================

pub struct GetDeploymentsTool {
    client: ClusterClient,
    output: OutputFormat,
}

impl GetDeploymentsTool {
    pub fn new(client: ClusterClient, output: OutputFormat) -> Self {
        Self { client, output }
    }
}

#[async_trait::async_trait]
impl McpTool for GetDeploymentsTool {
    fn definition(&self) -> Tool {
        Tool::with_schema(
            "k8s_get_deployments",
            "Get Kubernetes deployments in a namespace with replica counts, strategy, selector and failing conditions.",
            namespace_schema("deployments"),
            None,
        )
    }

    async fn execute(
        &self, arguments: Option<Value>, cancel: &CancellationToken,
    ) -> Result<CallToolResult, ToolError> {
        let namespace = namespace_from(arguments)?;
        debug!("Getting deployments in namespace '{namespace}'");
        let deployments = self.client.get_deployments(cancel, &namespace).await?;
        Ok(render(self.output, &deployments, |deployments| {
            format_deployments(deployments, &namespace)
        }))
    }
}

#[cfg(test)]
mod tests {
    use http::{
        Request,
        Response,
    };
    use k8s_openapi::api::apps::v1::{
        Deployment,
        DeploymentCondition,
        DeploymentStatus,
    };
    use k8s_openapi::api::core::v1::Pod;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ListMeta;
    use kube::Client;
    use kube::client::Body;
    use tower_test::mock;

    use super::*;

    type MockHandle = mock::Handle<Request<Body>, Response<Body>>;

    fn mock_client() -> (ClusterClient, MockHandle) {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        (
            ClusterClient::new(Client::new(mock_service, "default")),
            handle,
        )
    }

    fn list_response<K: k8s_openapi::ListableResource + Serialize>(items: Vec<K>) -> Response<Body> {
        let list = k8s_openapi::List {
            metadata: ListMeta::default(),
            items,
        };
        Response::builder()
            .status(200)
            .body(Body::from(serde_json::to_vec(&list).unwrap()))
            .unwrap()
    }

    /// Answers one request with `items` and returns the requested path.
    fn serve_once<K>(mut handle: MockHandle, items: Vec<K>) -> tokio::task::JoinHandle<String>
    where
        K: k8s_openapi::ListableResource + Serialize + Send + 'static,
    {
        tokio::spawn(async move {
            let (request, send) = handle.next_request().await.unwrap();
            let path = request.uri().path().to_string();
            send.send_response(list_response(items));
            path
        })
    }

    #[test]
    fn test_namespace_defaults() {
        assert_eq!(namespace_from(None).unwrap(), "default");
        assert_eq!(namespace_from(Some(Value::Null)).unwrap(), "default");
        assert_eq!(namespace_from(Some(json!({}))).unwrap(), "default");
        assert_eq!(
            namespace_from(Some(json!({"namespace": ""}))).unwrap(),
            "default"
        );
        assert_eq!(
            namespace_from(Some(json!({"namespace": null}))).unwrap(),
            "default"
        );
        assert_eq!(
            namespace_from(Some(json!({"namespace": "kube-system"}))).unwrap(),
            "kube-system"
        );
    }

    #[test]
    fn test_namespace_with_wrong_type_is_rejected() {
        let err = namespace_from(Some(json!({"namespace": 42}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_definitions() {
        let (client, _handle) = mock_client();

        let nodes = GetNodesTool::new(client.clone(), OutputFormat::Text).definition();
        assert_eq!(nodes.input_schema.properties, Some(json!({})));
        assert!(nodes.input_schema.required.is_none());

        let pods = GetPodsTool::new(client, OutputFormat::Text).definition();
        let properties = pods.input_schema.properties.unwrap();
        assert_eq!(properties["namespace"]["type"], "string");
        assert!(pods.input_schema.required.is_none());
    }

    #[tokio::test]
    async fn test_get_pods_without_namespace_uses_default() {
        let (client, handle) = mock_client();
        let server = serve_once::<Pod>(handle, vec![]);

        let result = GetPodsTool::new(client, OutputFormat::Text)
            .execute(None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(server.await.unwrap(), "/api/v1/namespaces/default/pods");
        assert_eq!(
            result.text_content(),
            "No pods found in namespace 'default'"
        );
    }

    #[tokio::test]
    async fn test_get_pods_in_staging() {
        let (client, handle) = mock_client();
        let server = serve_once::<Pod>(handle, vec![]);

        let result = GetPodsTool::new(client, OutputFormat::Text)
            .execute(
                Some(json!({"namespace": "staging"})),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(server.await.unwrap(), "/api/v1/namespaces/staging/pods");
        assert_eq!(
            result.text_content(),
            "No pods found in namespace 'staging'"
        );
    }

    #[tokio::test]
    async fn test_get_deployments_reports_issue() {
        let (client, handle) = mock_client();

        let mut deployment = Deployment::default();
        deployment.metadata.name = Some("checkout".to_string());
        deployment.status = Some(DeploymentStatus {
            replicas: Some(2),
            conditions: Some(vec![DeploymentCondition {
                type_: "Available".to_string(),
                status: "False".to_string(),
                reason: Some("MinimumReplicasUnavailable".to_string()),
                message: Some("Deployment does not have minimum availability.".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        });
        let server = serve_once(handle, vec![deployment]);

        let result = GetDeploymentsTool::new(client, OutputFormat::Text)
            .execute(Some(json!({"namespace": "shop"})), &CancellationToken::new())
            .await
            .unwrap();
        server.await.unwrap();

        let text = result.text_content();
        let issues: Vec<&str> = text.lines().filter(|l| l.contains("Issue:")).collect();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("MinimumReplicasUnavailable"));
        assert!(text.starts_with("Found 1 deployment(s) in namespace 'shop':"));
    }

    #[tokio::test]
    async fn test_get_nodes_json_output() {
        let (client, handle) = mock_client();
        let server = serve_once::<k8s_openapi::api::core::v1::Node>(handle, vec![]);

        let result = GetNodesTool::new(client, OutputFormat::Json)
            .execute(None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(server.await.unwrap(), "/api/v1/nodes");
        assert_eq!(result.text_content(), "[]");
    }

    #[tokio::test]
    async fn test_fetch_error_is_propagated() {
        let (client, mut handle) = mock_client();
        let server = tokio::spawn(async move {
            let (_request, send) = handle.next_request().await.unwrap();
            let response = Response::builder()
                .status(500)
                .body(Body::from(b"internal error".to_vec()))
                .unwrap();
            send.send_response(response);
        });

        let err = GetServicesTool::new(client, OutputFormat::Text)
            .execute(None, &CancellationToken::new())
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, ToolError::Fetch(_)));
        assert!(err.to_string().starts_with("failed to get services: "));
    }
}
