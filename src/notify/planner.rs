//! Weekly planner aggregation
//!
//! A stored plan is visible only while its `weekStart` equals the Monday
//! of the current calendar week. A plan from any other week is invisible
//! (zero summary) rather than carried forward or deleted.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notify::parse_day;
use crate::notify::repair::parse_json_lenient;

/// Aggregated planner state for the current week
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerSummary {
    /// Number of sessions planned this week
    pub count: usize,
    /// One `"start - subject (length)"` line per session
    pub session_details: Vec<String>,
}

/// Monday of the week containing `today`
pub fn current_week_monday(today: NaiveDate) -> NaiveDate {
    let back = match today.weekday() {
        Weekday::Sun => 6,
        wd => wd.num_days_from_monday() as u64,
    };
    today - Days::new(back)
}

/// Aggregate a stored plan payload as of `today`.
///
/// Unparseable payloads and plans anchored to any week other than the
/// current one yield the zero summary.
pub fn summarize_week(raw: &str, today: NaiveDate) -> PlannerSummary {
    let Some(plan) = parse_json_lenient(raw) else {
        return PlannerSummary::default();
    };

    let week_start = plan
        .get("weekStart")
        .and_then(Value::as_str)
        .and_then(parse_day);

    if week_start != Some(current_week_monday(today)) {
        return PlannerSummary::default();
    }

    let Some(sessions) = plan.get("sessions").and_then(Value::as_object) else {
        return PlannerSummary::default();
    };

    let mut details = Vec::new();
    for day_sessions in sessions.values() {
        let Some(entries) = day_sessions.as_array() else {
            continue;
        };
        for session in entries {
            details.push(format_session(session));
        }
    }

    PlannerSummary {
        count: details.len(),
        session_details: details,
    }
}

fn format_session(session: &Value) -> String {
    let field = |name: &str| {
        session
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string()
    };
    format!(
        "{} - {} ({})",
        field("start"),
        field("subject"),
        field("length")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monday_anchoring() {
        // 2024-06-03 is a Monday
        assert_eq!(current_week_monday(date(2024, 6, 3)), date(2024, 6, 3));
        // Wednesday of the same week
        assert_eq!(current_week_monday(date(2024, 6, 5)), date(2024, 6, 3));
        // Sunday belongs to the week that started six days earlier
        assert_eq!(current_week_monday(date(2024, 6, 9)), date(2024, 6, 3));
    }

    fn plan_for(week_start: &str) -> String {
        json!({
            "weekStart": week_start,
            "sessions": {
                "mon": [
                    {"start": "16:00", "subject": "Algebra", "length": "45min"},
                    {"start": "17:00", "subject": "French", "length": "30min"},
                ],
                "thu": [
                    {"start": "15:30", "subject": "Biology", "length": "60min"},
                ],
            },
        })
        .to_string()
    }

    #[test]
    fn test_current_week_plan_flattened() {
        let summary = summarize_week(&plan_for("2024-06-03"), date(2024, 6, 5));
        assert_eq!(summary.count, 3);
        assert!(summary
            .session_details
            .contains(&"16:00 - Algebra (45min)".to_string()));
        assert!(summary
            .session_details
            .contains(&"15:30 - Biology (60min)".to_string()));
    }

    #[test]
    fn test_previous_week_plan_invisible() {
        // Plan anchored one week earlier: zero summary regardless of content
        let summary = summarize_week(&plan_for("2024-05-27"), date(2024, 6, 5));
        assert_eq!(summary, PlannerSummary::default());
    }

    #[test]
    fn test_next_week_plan_invisible() {
        let summary = summarize_week(&plan_for("2024-06-10"), date(2024, 6, 5));
        assert_eq!(summary, PlannerSummary::default());
    }

    #[test]
    fn test_missing_week_start_invisible() {
        let raw = json!({"sessions": {"mon": [{"start": "16:00"}]}}).to_string();
        assert_eq!(
            summarize_week(&raw, date(2024, 6, 5)),
            PlannerSummary::default()
        );
    }

    #[test]
    fn test_garbage_payload_zero_summary() {
        assert_eq!(
            summarize_week("not a plan", date(2024, 6, 5)),
            PlannerSummary::default()
        );
    }

    #[test]
    fn test_session_with_missing_fields_still_listed() {
        let raw = json!({
            "weekStart": "2024-06-03",
            "sessions": {"fri": [{"start": "14:00"}]},
        })
        .to_string();

        let summary = summarize_week(&raw, date(2024, 6, 5));
        assert_eq!(summary.count, 1);
        assert_eq!(summary.session_details[0], "14:00 - ? (?)");
    }
}
