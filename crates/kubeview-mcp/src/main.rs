//! kubeview MCP Server - Model Context Protocol server for cluster introspection.
//!
//! The server speaks JSON-RPC over stdin/stdout, so it is meant to be
//! launched by an MCP client rather than run interactively. Logs go to
//! stderr.
//!
//! # Usage
//!
//! ```bash
//! # Use KUBECONFIG, ~/.kube/config or in-cluster credentials
//! kubeview-mcp
//!
//! # Use a specific kubeconfig and context
//! kubeview-mcp --kubeconfig ~/.kube/staging --context staging-admin
//!
//! # Return JSON instead of text summaries
//! kubeview-mcp --output json
//! ```

use clap::Parser;
use kubeview_cluster::{
    ClusterClient,
    ClusterOptions,
};
use kubeview_mcp::server::McpServer;
use kubeview_mcp::tools::{
    OutputFormat,
    ToolRegistry,
};
use log::{
    LevelFilter,
    error,
    info,
};
use tokio_util::sync::CancellationToken;

/// kubeview MCP Server - read-only Kubernetes introspection via Model Context Protocol
#[derive(Parser, Debug)]
#[command(
    name = "kubeview-mcp",
    version,
    about = "MCP server for read-only Kubernetes cluster introspection",
    long_about = "A Model Context Protocol (MCP) server that exposes nodes, pods, services \
                  and deployments of a Kubernetes cluster to LLMs as human-readable summaries."
)]
struct Args {
    /// Kubeconfig path list (overrides KUBECONFIG)
    #[arg(short, long)]
    kubeconfig: Option<String>,

    /// Kubeconfig context to use instead of the current context
    #[arg(short, long)]
    context: Option<String>,

    /// Tool output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging; stdout belongs to the protocol.
    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_secs()
        .target(env_logger::Target::Stderr)
        .init();

    info!("Starting kubeview MCP Server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Protocol version: {}",
        kubeview_mcp::protocol::MCP_PROTOCOL_VERSION
    );

    let options = ClusterOptions {
        kubeconfig: args.kubeconfig,
        context: args.context,
    };
    let client = match kubeview_cluster::create_client(&options).await {
        Ok(client) => ClusterClient::new(client),
        Err(e) => {
            error!("Failed to create Kubernetes client: {e}");
            std::process::exit(1);
        }
    };

    let registry = ToolRegistry::new(client, args.output);
    info!("Available tools:");
    for tool in registry.definitions() {
        info!("  - {}: {}", tool.name, tool.description.unwrap_or_default());
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C");
            signal_token.cancel();
        }
    });

    let result = McpServer::new(registry).serve_stdio(shutdown).await;

    // The stdin reader holds a blocking thread that would keep the runtime
    // alive after a Ctrl-C shutdown.
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("Server error: {e}");
            std::process::exit(1);
        }
    }
}
