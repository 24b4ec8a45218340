use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod cli;
mod config;
mod error;
mod logging;
mod mcp;
mod ragflow;

use cli::OutputFormat;

#[derive(Parser)]
#[command(name = "ragflow-bridge")]
#[command(about = "RAGFlow MCP bridge and command-line client")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.ragflow-bridge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdin/stdout
    Serve,

    /// Search documents
    Search {
        /// Search query
        query: String,

        /// Restrict to one knowledge base
        #[arg(long)]
        kb: Option<String>,

        /// Maximum number of results (default from config)
        #[arg(long, short)]
        limit: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List knowledge bases
    Kbs {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Ask a question against a knowledge base
    Chat {
        /// Your message
        message: String,

        /// Knowledge base ID
        #[arg(long)]
        kb: Option<String>,

        /// Conversation ID to continue
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Print the MCP tool definitions
    Tools,

    /// Create the default config file
    Init,

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let is_server = matches!(cli.command, Commands::Serve);
    logging::init(if is_server { "info" } else { "warn" });

    let config_path = match cli.config {
        Some(path) => path,
        None => config::Config::config_path()?,
    };

    let config = config::Config::load(Some(config_path.as_path()))?;

    match cli.command {
        Commands::Serve => {
            let client = ragflow::RagflowClient::new(&config)?;
            tracing::info!("RAGFlow MCP Bridge started ({})", config.base_url());
            let server = Arc::new(mcp::McpServer::new(Arc::new(client), config.server));
            mcp::run_stdio(server).await?;
        }

        Commands::Search {
            query,
            kb,
            limit,
            format,
        } => {
            let client = ragflow::RagflowClient::new(&config)?;
            let limit = limit.unwrap_or(config.server.default_limit);
            cli::search(&client, &query, kb.as_deref(), limit, format).await?;
        }

        Commands::Kbs { format } => {
            let client = ragflow::RagflowClient::new(&config)?;
            cli::list_kbs(&client, format).await?;
        }

        Commands::Chat {
            message,
            kb,
            conversation,
        } => {
            let client = ragflow::RagflowClient::new(&config)?;
            cli::chat(&client, &message, kb.as_deref(), conversation.as_deref()).await?;
        }

        Commands::Tools => {
            cli::print_tools(&config)?;
        }

        Commands::Init => {
            cli::init(&config_path)?;
        }

        Commands::Config => {
            cli::show_config(&config, &config_path)?;
        }
    }

    Ok(())
}
