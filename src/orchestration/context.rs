//! Rendering of accumulated iteration context into prompt text.

use super::types::IterationRecord;

/// Per-record output budget in the router prompt.
const ROUTER_OUTPUT_CHARS: usize = 300;
/// Per-record output budget in executor input.
const EXECUTOR_OUTPUT_CHARS: usize = 500;

/// Build the router's user message: the query plus a summary of every turn so far.
pub fn render_router_prompt(query: &str, history: &[IterationRecord]) -> String {
    if history.is_empty() {
        return query.to_string();
    }

    let results = history
        .iter()
        .map(|r| {
            format!(
                "Agent: {}\nStatus: {}\nResponse: {}",
                r.agent,
                if r.succeeded { "succeeded" } else { "failed" },
                truncate_chars(&r.output, ROUTER_OUTPUT_CHARS),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{query}\n\nPREVIOUS AGENT RESULTS:\n{results}")
}

/// Build the text handed to the next executor.
///
/// The first executor sees the bare query. Later executors see earlier results
/// first so that references like "their tickets" can be resolved.
pub fn render_executor_input(query: &str, history: &[IterationRecord]) -> String {
    if history.is_empty() {
        return query.to_string();
    }

    let results = history
        .iter()
        .map(|r| {
            let status = if r.succeeded { "" } else { " (failed)" };
            format!(
                "- {}_agent{status}: {}",
                r.agent,
                truncate_chars(&r.output, EXECUTOR_OUTPUT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Previous agent results:\n{results}\n\nOriginal user query: {query}\n\n\
         Continue processing based on previous results."
    )
}

/// Truncate to `max_chars` characters, appending "..." if anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::types::AgentId;

    fn record(agent: AgentId, output: &str, succeeded: bool) -> IterationRecord {
        IterationRecord {
            iteration: 1,
            agent,
            input: String::new(),
            output: output.to_string(),
            succeeded,
        }
    }

    #[test]
    fn first_turn_is_the_bare_query() {
        assert_eq!(render_router_prompt("Get customer 5", &[]), "Get customer 5");
        assert_eq!(render_executor_input("Get customer 5", &[]), "Get customer 5");
    }

    #[test]
    fn router_prompt_lists_results_with_status() {
        let history = vec![
            record(AgentId::CustomerData, "Customer 5: Alice", true),
            record(AgentId::Support, "connection refused", false),
        ];
        let prompt = render_router_prompt("Get customer 5 and tickets", &history);

        assert!(prompt.starts_with("Get customer 5 and tickets\n\nPREVIOUS AGENT RESULTS:"));
        assert!(prompt.contains("Agent: customer_data\nStatus: succeeded\nResponse: Customer 5: Alice"));
        assert!(prompt.contains("Agent: support\nStatus: failed"));
    }

    #[test]
    fn executor_input_puts_results_before_query() {
        let history = vec![record(AgentId::CustomerData, "Customer 5: Alice", true)];
        let input = render_executor_input("show their tickets", &history);

        let results_at = input.find("- customer_data_agent: Customer 5: Alice").unwrap();
        let query_at = input.find("Original user query: show their tickets").unwrap();
        assert!(results_at < query_at);
    }

    #[test]
    fn long_outputs_are_truncated() {
        let history = vec![record(AgentId::Sql, &"x".repeat(1000), true)];
        let prompt = render_router_prompt("q", &history);
        assert!(prompt.contains(&format!("{}...", "x".repeat(300))));
        assert!(!prompt.contains(&"x".repeat(301)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("héllo", 5), "héllo");
        assert_eq!(truncate_chars("", 3), "");
    }
}
