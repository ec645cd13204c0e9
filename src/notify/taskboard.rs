//! Task board aggregation
//!
//! Single pass over the persisted task list. `Doing` tasks are counted and
//! their titles collected; `Pending` tasks bucket by priority. Priorities
//! are meaningful only for `Pending`; unmatched priorities are silently
//! ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notify::repair::parse_json_lenient;

/// Aggregated board state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub doing_count: usize,
    pub pending_hot: usize,
    pub pending_warm: usize,
    pub pending_cold: usize,
    /// Titles of tasks currently in progress, in board order
    pub doing_task_titles: Vec<String>,
}

/// Aggregate a stored board payload
pub fn summarize_board(raw: &str) -> BoardSummary {
    let Some(board) = parse_json_lenient(raw) else {
        return BoardSummary::default();
    };
    let Some(tasks) = board.get("tasks").and_then(Value::as_array) else {
        return BoardSummary::default();
    };

    let mut summary = BoardSummary::default();
    for task in tasks {
        let status = task.get("status").and_then(Value::as_str).unwrap_or("");
        match status {
            "Doing" => {
                summary.doing_count += 1;
                if let Some(title) = task.get("title").and_then(Value::as_str) {
                    summary.doing_task_titles.push(title.to_string());
                }
            }
            "Pending" => {
                match task.get("priority").and_then(Value::as_str) {
                    Some("Hot") => summary.pending_hot += 1,
                    Some("Warm") => summary.pending_warm += 1,
                    Some("Cold") => summary.pending_cold += 1,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    summary
}
