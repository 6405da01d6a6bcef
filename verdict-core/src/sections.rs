//! Section-mode interpreter for `SUMMARY: ... ACTIONS: ...` completions.
//! Never fails; the upstream format is not guaranteed.

use crate::models::AnalysisReport;

pub const SUMMARY_MARKER: &str = "SUMMARY:";
pub const ACTIONS_MARKER: &str = "ACTIONS:";
pub const ACTIONS_FALLBACK: &str = "Could not parse actions.";

pub fn parse_sections(raw_text: &str) -> AnalysisReport {
    let mut parts = raw_text.splitn(2, ACTIONS_MARKER);
    let head = parts.next().unwrap_or_default();

    let summary = head.replace(SUMMARY_MARKER, "").trim().to_string();
    let actions = match parts.next() {
        Some(tail) => tail.trim().to_string(),
        None => ACTIONS_FALLBACK.to_string(),
    };

    AnalysisReport { summary, actions }
}
