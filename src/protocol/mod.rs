//! Console protocol handling.
//!
//! The binary drives a session with one command per input line and answers
//! with one or more response lines. This module holds the command parser and
//! the response formatting shared by the session and its tests.

pub mod parser;

pub use parser::{parse_command, Command};

use crate::ledger::{UndoReport, UndoableAction};

/// Formats one action as a `move <json>` response line.
pub fn format_action(action: &UndoableAction) -> serde_json::Result<String> {
    Ok(format!("move {}", serde_json::to_string(action)?))
}

/// Formats a batch undo as response lines: one `undone` line listing the
/// indices in issue order (if any), then one `rejected` line per failure.
pub fn format_report(report: &UndoReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(1 + report.failures.len());
    if !report.undone.is_empty() {
        let indices: Vec<String> = report.undone.iter().map(|i| i.to_string()).collect();
        lines.push(format!("undone {}", indices.join(" ")));
    }
    for failure in &report.failures {
        lines.push(format!("rejected {} {}", failure.index, failure.reason));
    }
    lines
}
