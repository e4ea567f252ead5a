//! Terminal front end: interactive chat, one-shot answers, and rendering.
//!
//! Answers go to stdout; handoff progress and diagnostics go to stderr.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::agent::logging::RunLogger;
use crate::app::App;
use crate::error::QueryFailure;
use crate::orchestration::{FinalResponse, Outcome, SupervisorEvent, ThreadId};

const HELP: &str = "\
Commands:
  exit, quit, bye, q   Leave the chat
  clear                Start a new conversation thread
  help, ?              Show this help

Examples:
  Get customer 5
  Show all active customers
  Get customer 5 and their tickets
  Create a high priority ticket for customer 3: cannot log in
  How many customers were created last month?";

/// One line of chat input, classified.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput {
    Exit,
    Clear,
    Help,
    Empty,
    Query(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => ChatInput::Empty,
            "exit" | "quit" | "bye" | "q" => ChatInput::Exit,
            "clear" => ChatInput::Clear,
            "help" | "?" => ChatInput::Help,
            _ => ChatInput::Query(trimmed.to_string()),
        }
    }
}

/// User-facing text for a completed query.
pub fn render_response(response: &FinalResponse) -> String {
    let mut out = if response.text.is_empty() {
        "No agent output was needed for this request.".to_string()
    } else {
        response.text.clone()
    };
    if response.outcome == Outcome::Exceeded {
        out.push_str(&format!(
            "\n\nNote: this request was not fully resolved within {} agent turns; the answer above may be incomplete.",
            response.iterations
        ));
    }
    out
}

/// User-facing text for a failed query.
pub fn render_failure(failure: &QueryFailure) -> String {
    if failure.error.is_system_error() {
        format!("System error: {}", failure.error)
    } else {
        format!("Could not complete request: {}", failure.error)
    }
}

/// Progress line for events worth showing during chat.
pub fn render_event(event: &SupervisorEvent) -> Option<String> {
    match event {
        SupervisorEvent::Handoff {
            from_agent: None,
            to_agent,
            reason,
            ..
        } => Some(format!("-> Routing to {to_agent}_agent: {reason}")),
        SupervisorEvent::Handoff {
            from_agent: Some(from),
            to_agent,
            reason,
            ..
        } => Some(format!("-> Handoff {from}_agent -> {to_agent}_agent: {reason}")),
        SupervisorEvent::AgentCompleted {
            agent,
            succeeded: false,
            preview,
            ..
        } => Some(format!("x {agent}_agent failed: {preview}")),
        _ => None,
    }
}

/// Drain supervisor events into the run log, optionally echoing progress.
pub fn spawn_event_sink(
    mut rx: UnboundedReceiver<SupervisorEvent>,
    mut logger: Option<RunLogger>,
    echo: bool,
) -> JoinHandle<Option<RunLogger>> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(log) = logger.as_mut() {
                if let Err(e) = log.log_event(&event) {
                    tracing::warn!("Run log write failed, disabling: {e}");
                    logger = None;
                }
            }
            if echo {
                if let Some(line) = render_event(&event) {
                    eprintln!("{line}");
                }
            }
        }
        logger
    })
}

/// Answer one query and print the result. Returns whether it succeeded.
pub async fn run_ask(app: &App, query: &str, thread: &ThreadId, json: bool) -> anyhow::Result<bool> {
    match app.ask(query, thread).await {
        Ok(response) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", render_response(&response));
            }
            Ok(true)
        }
        Err(failure) => {
            if json {
                let value = serde_json::json!({
                    "thread_id": thread,
                    "error": failure.error.to_string(),
                    "system_error": failure.error.is_system_error(),
                    "records": failure.records,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", render_failure(&failure));
            }
            Ok(false)
        }
    }
}

/// Interactive loop. Returns the number of queries answered.
///
/// Ctrl+C (via `shutdown`) ends the session between or during queries.
pub async fn run_chat(app: &App, thread: Option<ThreadId>, shutdown: CancellationToken) -> anyhow::Result<u64> {
    let mut thread = thread.unwrap_or_else(ThreadId::generate);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut answered = 0u64;

    println!("Customer support assistant. Type 'help' for commands, 'exit' to quit.");
    println!("Thread: {thread}");

    loop {
        print!("\nYou: ");
        std::io::stdout().flush().ok();

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.cancelled() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => continue,
            ChatInput::Exit => break,
            ChatInput::Help => println!("{HELP}"),
            ChatInput::Clear => {
                thread = ThreadId::generate();
                println!("Started a new conversation. Thread: {thread}");
            }
            ChatInput::Query(query) => {
                let result = tokio::select! {
                    result = app.ask(&query, &thread) => Some(result),
                    _ = shutdown.cancelled() => None,
                };
                let Some(result) = result else {
                    println!("\nInterrupted.");
                    break;
                };
                answered += 1;
                match result {
                    Ok(response) => println!("\nAssistant:\n{}", render_response(&response)),
                    Err(failure) => println!("\nAssistant: {}", render_failure(&failure)),
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(answered)
}
