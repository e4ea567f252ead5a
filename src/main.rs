use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use switchboard::agent::GenaiChat;
use switchboard::agent::logging::RunLogger;
use switchboard::app::App;
use switchboard::chat::{run_ask, run_chat, spawn_event_sink};
use switchboard::cli::{Cli, Commands};
use switchboard::config::{self, AppConfig};
use switchboard::mcp::{HttpMcpClient, McpClient};
use switchboard::orchestration::ThreadId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr, so answers on stdout stay clean)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.overrides)?;
    tracing::info!(mcp_url = %config.mcp_url, router_model = %config.models.router, "Config loaded");

    match cli.command {
        Commands::Config => {
            print_config(&config);
            Ok(())
        }
        Commands::Tools => list_tools(&config).await,
        Commands::Ask { query, thread, json } => {
            let thread = thread.map(ThreadId::new).unwrap_or_else(ThreadId::generate);
            let ok = run_session(config, false, |app| async move {
                let ok = run_ask(&app, &query, &thread, json).await?;
                Ok((1, ok))
            })
            .await?;
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Chat { thread } => {
            let shutdown = CancellationToken::new();
            {
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        shutdown.cancel();
                    }
                });
            }
            run_session(config, true, |app| async move {
                let answered = run_chat(&app, thread.map(ThreadId::new), shutdown).await?;
                Ok((answered, true))
            })
            .await?;
            // A pending stdin read would otherwise block runtime shutdown.
            std::process::exit(0)
        }
    }
}

/// Build the app with an event sink and run log around `body`.
async fn run_session<F, Fut>(config: AppConfig, echo: bool, body: F) -> anyhow::Result<bool>
where
    F: FnOnce(App) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<(u64, bool)>>,
{
    let mut logger = match RunLogger::new(&config.log_dir) {
        Ok(logger) => Some(logger),
        Err(e) => {
            tracing::warn!("Run log disabled ({}): {e}", config.log_dir.display());
            None
        }
    };
    if let Some(log) = logger.as_mut() {
        log.log_run_start(&config.models.router, &config.mcp_url, config.max_iterations)?;
        tracing::info!(log = %log.log_path().display(), "Run log opened");
    }

    let mcp = HttpMcpClient::new(&config.mcp_url, Duration::from_secs(config.query_timeout_secs))?;
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
    let sink = spawn_event_sink(event_rx, logger, echo);

    let app = App::new(
        config,
        Arc::new(GenaiChat::default()),
        Arc::new(mcp),
        Some(event_tx),
    );

    // Dropping the app inside body closes the event channel and ends the sink.
    let (queries, ok) = body(app).await?;

    if let Some(mut log) = sink.await? {
        log.log_run_end(queries)?;
    }
    Ok(ok)
}

fn print_config(config: &AppConfig) {
    println!("Configuration");
    println!("  MCP server:       {}", config.mcp_url);
    println!("  Max iterations:   {}", config.max_iterations);
    println!("  Decision retries: {}", config.decision_retries);
    println!("  Query timeout:    {}s", config.query_timeout_secs);
    println!("  Memory turns:     {}", config.memory_turns);
    println!("  Max tool rounds:  {}", config.max_tool_rounds);
    println!("  Log directory:    {}", config.log_dir.display());
    println!("Models");
    println!("  router:        {}", config.models.router);
    println!("  customer_data: {}", config.models.customer_data);
    println!("  support:       {}", config.models.support);
    println!("  sql:           {}", config.models.sql);
    let key_status = if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        "set"
    } else {
        "not set"
    };
    println!("Environment");
    println!("  OPENAI_API_KEY: {key_status}");
}

async fn list_tools(config: &AppConfig) -> anyhow::Result<()> {
    let client = HttpMcpClient::new(&config.mcp_url, Duration::from_secs(config.query_timeout_secs))?;
    let tools = client.list_tools().await?;
    println!("{} tools at {}", tools.len(), config.mcp_url);
    for tool in tools {
        println!("  - {}: {}", tool.name, tool.description.lines().next().unwrap_or(""));
    }
    Ok(())
}
