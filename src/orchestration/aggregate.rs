//! Folding iteration records into the user-facing answer.

use super::types::{IterationRecord, Section};

/// Labeled sections for every successful record, in iteration order.
///
/// Failed records are left out of the answer; they stay on
/// [`super::types::FinalResponse::records`] for diagnostics.
pub fn collect_sections(records: &[IterationRecord]) -> Vec<Section> {
    records
        .iter()
        .filter(|r| r.succeeded)
        .map(|r| Section {
            agent: r.agent,
            text: r.output.trim().to_string(),
        })
        .collect()
}

/// Render sections as `"<Agent Name>:\n<text>"` blocks separated by a blank line.
///
/// No sections renders as the empty string.
pub fn render_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|s| format!("{}:\n{}", s.agent.display_name(), s.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
