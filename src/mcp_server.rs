//! RAGFlow MCP Server
//!
//! This binary implements the Model Context Protocol (MCP) server for the
//! bridge, exposing RAGFlow search, knowledge-base listing and chat as tools
//! over stdio.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod mcp;
mod ragflow;

#[derive(Parser)]
#[command(name = "ragflow-mcp")]
#[command(about = "MCP server bridging to a RAGFlow instance over stdio")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.ragflow-bridge/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    logging::init("info");
    let args = Args::parse();

    let config = config::Config::load(args.config.as_deref())?;
    let client = ragflow::RagflowClient::new(&config)?;
    tracing::info!("RAGFlow MCP Bridge started ({})", config.base_url());

    let server = Arc::new(mcp::McpServer::new(Arc::new(client), config.server));
    mcp::run_stdio(server).await
}
