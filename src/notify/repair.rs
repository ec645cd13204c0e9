//! Tolerant decoding of persisted JSON blobs
//!
//! Raw payloads come out of the record store exactly as page scripts left
//! them: sometimes percent-encoded, sometimes with escaped quotes or
//! trailing commas from hand-edited exports. Decoding is best-effort all
//! the way down; nothing here returns an error.

use std::borrow::Cow;

use serde_json::Value;
use tracing::debug;

/// Percent-decode a value when it looks encoded, falling back to the raw
/// string when decoding fails.
pub fn decode_if_percent_encoded(raw: &str) -> Cow<'_, str> {
    if !raw.contains('%') {
        return Cow::Borrowed(raw);
    }

    match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(_) => {
            debug!("Percent-decode failed, keeping raw payload");
            Cow::Borrowed(raw)
        }
    }
}

/// Parse JSON, applying a repair pass on failure: strip escaped quotes,
/// strip trailing commas, retry. `None` when the payload is beyond repair.
pub fn parse_json_lenient(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }

    let repaired = strip_trailing_commas(&raw.replace("\\\"", "\""));
    match serde_json::from_str(&repaired) {
        Ok(value) => {
            debug!("Recovered malformed JSON payload via repair pass");
            Some(value)
        }
        Err(_) => None,
    }
}

/// Remove commas that sit directly before a closing bracket or brace
fn strip_trailing_commas(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_comma = false;

    for ch in raw.chars() {
        match ch {
            ',' => {
                if pending_comma {
                    out.push(',');
                }
                pending_comma = true;
            }
            ']' | '}' => {
                pending_comma = false;
                out.push(ch);
            }
            c if c.is_whitespace() && pending_comma => {
                // Hold the comma across whitespace
            }
            c => {
                if pending_comma {
                    out.push(',');
                    pending_comma = false;
                }
                out.push(c);
            }
        }
    }
    if pending_comma {
        out.push(',');
    }
    out
}
