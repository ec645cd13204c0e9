//! Spaced-repetition deck aggregation
//!
//! A deck record carries five ordered box fields, each holding a JSON
//! array of cards (possibly percent-encoded, possibly mangled by earlier
//! script revisions). A card is due iff its `nextReviewDate`, truncated to
//! day, is on or before today. Cards without a parseable date count toward
//! the box total but are never due.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notify::parse_day;
use crate::notify::repair::{decode_if_percent_encoded, parse_json_lenient};
use crate::types::FieldMap;

/// Field identifiers of the five Leitner boxes, in box order
pub const BOX_FIELDS: [&str; 5] = ["box_1", "box_2", "box_3", "box_4", "box_5"];

/// Due/total counts for one box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxSummary {
    /// Cards whose review date has arrived
    pub due: usize,
    /// All cards in the box, parseable review date or not
    pub total: usize,
}

/// Aggregated deck state across the five boxes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSummary {
    /// Sum of `due` across all boxes
    pub total_due: usize,
    /// Per-box counts, boxes 1..=5
    pub boxes: [BoxSummary; 5],
}

/// Aggregate a deck record's box fields as of `today`.
///
/// Absent fields, undecodable payloads and non-array JSON all collapse to
/// empty boxes; total counts per box are stable across re-parsing.
pub fn summarize_deck(fields: &FieldMap, today: NaiveDate) -> DeckSummary {
    let mut summary = DeckSummary::default();

    for (i, field) in BOX_FIELDS.iter().enumerate() {
        let Some(raw) = fields.get(*field).and_then(Value::as_str) else {
            continue;
        };
        summary.boxes[i] = summarize_box(raw, today);
    }

    summary.total_due = summary.boxes.iter().map(|b| b.due).sum();
    summary
}

/// Aggregate one box payload
fn summarize_box(raw: &str, today: NaiveDate) -> BoxSummary {
    let decoded = decode_if_percent_encoded(raw);
    let Some(Value::Array(cards)) = parse_json_lenient(&decoded) else {
        return BoxSummary::default();
    };

    let total = cards.len();
    let due = cards
        .iter()
        .filter(|card| {
            card.get("nextReviewDate")
                .and_then(Value::as_str)
                .and_then(parse_day)
                .is_some_and(|date| date <= today)
        })
        .count();

    BoxSummary { due, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn deck_fields(value: serde_json::Value) -> FieldMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_due_determination() {
        let fields = deck_fields(json!({
            "box_1": r#"[{"nextReviewDate": "2024-01-01"}, {"nextReviewDate": "2099-01-01"}]"#,
        }));

        let summary = summarize_deck(&fields, today());
        assert_eq!(summary.boxes[0], BoxSummary { due: 1, total: 2 });
        assert_eq!(summary.total_due, 1);
    }

    #[test]
    fn test_card_due_on_today_exactly() {
        let fields = deck_fields(json!({
            "box_2": r#"[{"nextReviewDate": "2024-06-01"}]"#,
        }));

        let summary = summarize_deck(&fields, today());
        assert_eq!(summary.boxes[1], BoxSummary { due: 1, total: 1 });
    }

    #[test]
    fn test_timestamp_truncated_to_day() {
        // Later-in-the-day timestamp still counts as due today
        let fields = deck_fields(json!({
            "box_1": r#"[{"nextReviewDate": "2024-06-01T23:59:00"}]"#,
        }));

        let summary = summarize_deck(&fields, today());
        assert_eq!(summary.boxes[0].due, 1);
    }

    #[test]
    fn test_malformed_date_counts_total_not_due() {
        let fields = deck_fields(json!({
            "box_1": r#"[{"nextReviewDate": "soon"}, {"other": 1}, {"nextReviewDate": "2024-01-01"}]"#,
        }));

        let summary = summarize_deck(&fields, today());
        assert_eq!(summary.boxes[0], BoxSummary { due: 1, total: 3 });
    }

    #[test]
    fn test_percent_encoded_box() {
        let raw = urlencoding::encode(r#"[{"nextReviewDate": "2024-01-01"}]"#).into_owned();
        let fields = deck_fields(json!({ "box_3": raw }));

        let summary = summarize_deck(&fields, today());
        assert_eq!(summary.boxes[2], BoxSummary { due: 1, total: 1 });
    }

    #[test]
    fn test_repaired_payload_keeps_totals_stable() {
        let fields = deck_fields(json!({
            "box_1": r#"[{\"nextReviewDate\": \"2024-01-01\"}, {\"nextReviewDate\": \"2099-01-01\"},]"#,
        }));

        let first = summarize_deck(&fields, today());
        let second = summarize_deck(&fields, today());
        assert_eq!(first.boxes[0].total, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unrepairable_box_is_empty() {
        let fields = deck_fields(json!({
            "box_1": "complete garbage",
            "box_2": r#"{"not": "an array"}"#,
        }));

        let summary = summarize_deck(&fields, today());
        assert_eq!(summary, DeckSummary::default());
    }

    #[test]
    fn test_missing_fields_zero_summary() {
        let summary = summarize_deck(&FieldMap::new(), today());
        assert_eq!(summary, DeckSummary::default());
    }

    #[test]
    fn test_total_due_sums_across_boxes() {
        let fields = deck_fields(json!({
            "box_1": r#"[{"nextReviewDate": "2024-01-01"}]"#,
            "box_4": r#"[{"nextReviewDate": "2024-05-31"}, {"nextReviewDate": "2099-01-01"}]"#,
        }));

        let summary = summarize_deck(&fields, today());
        assert_eq!(summary.total_due, 2);
        assert_eq!(summary.boxes[3], BoxSummary { due: 1, total: 2 });
    }
}
