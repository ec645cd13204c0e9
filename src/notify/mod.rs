//! Notification aggregation
//!
//! Three independent pure transforms from raw persisted payloads to
//! actionable summaries. No I/O happens here; absent or unparseable input
//! always yields the zero-value summary, never an error.

pub mod leitner;
pub mod planner;
pub mod repair;
pub mod taskboard;

pub use leitner::{summarize_deck, BoxSummary, DeckSummary};
pub use planner::{summarize_week, PlannerSummary};
pub use taskboard::{summarize_board, BoardSummary};

use chrono::NaiveDate;

/// Parse a persisted date value at day granularity.
///
/// Payloads carry dates either as plain `YYYY-MM-DD` or as a full
/// timestamp; both truncate to the day. Anything else is unparseable.
pub(crate) fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    // Timestamp without offset
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day_formats() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(parse_day("2024-06-01"), Some(day));
        assert_eq!(parse_day("2024-06-01T08:30:00"), Some(day));
        assert_eq!(parse_day("2024-06-01T08:30:00+02:00"), Some(day));
        assert_eq!(parse_day(" 2024-06-01 "), Some(day));
        assert_eq!(parse_day("yesterday"), None);
        assert_eq!(parse_day(""), None);
    }
}
