use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "switchboard",
    version,
    about = "Customer-support assistant that routes each query across specialized agents"
)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that override config files and environment.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Path to config file (overrides ./switchboard.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// MCP tool server endpoint (e.g. "http://localhost:8001/mcp")
    #[arg(long, global = true)]
    pub mcp_url: Option<String>,

    /// Model used for routing decisions
    #[arg(long, global = true)]
    pub router_model: Option<String>,

    /// Maximum executor turns per query
    #[arg(long, global = true)]
    pub max_iterations: Option<usize>,

    /// Wall-clock limit per query in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Directory for JSONL run logs
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Conversation thread id (a fresh one is generated if omitted)
        #[arg(short, long)]
        thread: Option<String>,
    },
    /// Answer a single query and exit
    Ask {
        /// The query text
        query: String,

        /// Conversation thread id (a fresh one is generated if omitted)
        #[arg(short, long)]
        thread: Option<String>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved configuration
    Config,
    /// List the tools advertised by the MCP server
    Tools,
}
