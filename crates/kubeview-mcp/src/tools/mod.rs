//! MCP tools for cluster introspection.
//!
//! Every tool shares one [`ClusterClient`]; the registry is built once at
//! startup and consulted for `tools/list` and `tools/call`.

pub mod kubernetes;

use kubeview_cluster::{
    ClusterClient,
    FetchError,
};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::protocol::{
    CallToolResult,
    Tool,
    error_codes,
};

/// Trait for implementing MCP tools
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Get the tool definition
    fn definition(&self) -> Tool;

    /// Execute the tool with the given arguments
    async fn execute(
        &self, arguments: Option<Value>, cancel: &CancellationToken,
    ) -> Result<CallToolResult, ToolError>;
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ToolError {
    /// JSON-RPC error code reported to the caller.
    pub fn code(&self) -> i32 {
        match self {
            ToolError::UnknownTool(_) | ToolError::InvalidArguments(_) => {
                error_codes::INVALID_PARAMS
            }
            ToolError::Fetch(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

/// How tool results are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summaries
    #[default]
    Text,
    /// Pretty-printed JSON of the summaries, raw records included
    Json,
}

pub struct ToolRegistry {
    tools: Vec<Box<dyn McpTool>>,
}

impl ToolRegistry {
    pub fn new(client: ClusterClient, output: OutputFormat) -> Self {
        let tools: Vec<Box<dyn McpTool>> = vec![
            Box::new(kubernetes::GetNodesTool::new(client.clone(), output)),
            Box::new(kubernetes::GetPodsTool::new(client.clone(), output)),
            Box::new(kubernetes::GetServicesTool::new(client.clone(), output)),
            Box::new(kubernetes::GetDeploymentsTool::new(client, output)),
        ];
        Self { tools }
    }

    /// Get all available tools
    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    /// Execute a tool by name
    pub async fn call(
        &self, name: &str, arguments: Option<Value>, cancel: &CancellationToken,
    ) -> Result<CallToolResult, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.definition().name == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tool.execute(arguments, cancel).await
    }
}
