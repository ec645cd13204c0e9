//! Reference-field resolution
//!
//! Connection fields on directory records arrive in heterogeneous shapes
//! depending on which platform surface last wrote them: a direct id
//! string, an object carrying `id`/`identifier`/`_id`, or a single-item
//! collection wrapping either. Resolution is an ordered chain of
//! type-guarded extractors with a fixed priority; anything that matches no
//! extractor is absent, not an error.

use serde_json::Value;

/// Resolve a connection value to its referenced record id.
///
/// Priority: direct string, explicit `id`, explicit `identifier`,
/// single-element collection (resolved recursively), `_id`.
pub fn resolve_reference_id(value: &Value) -> Option<String> {
    const EXTRACTORS: [fn(&Value) -> Option<String>; 5] = [
        extract_direct,
        extract_id,
        extract_identifier,
        extract_single_element,
        extract_underscore_id,
    ];

    EXTRACTORS.iter().find_map(|extract| extract(value))
}

/// Resolve every element of a collection value, discarding unresolvable ones
pub fn resolve_reference_ids(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(resolve_reference_id).collect(),
        other => resolve_reference_id(other).into_iter().collect(),
    }
}

fn extract_direct(value: &Value) -> Option<String> {
    id_string(value)
}

fn extract_id(value: &Value) -> Option<String> {
    id_string(value.as_object()?.get("id")?)
}

fn extract_identifier(value: &Value) -> Option<String> {
    id_string(value.as_object()?.get("identifier")?)
}

fn extract_single_element(value: &Value) -> Option<String> {
    let items = value.as_array()?;
    if items.len() != 1 {
        return None;
    }
    resolve_reference_id(&items[0])
}

fn extract_underscore_id(value: &Value) -> Option<String> {
    id_string(value.as_object()?.get("_id")?)
}

/// An id value is a non-empty string or a number
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_string() {
        assert_eq!(
            resolve_reference_id(&json!("org_42")),
            Some("org_42".to_string())
        );
        assert_eq!(resolve_reference_id(&json!("  ")), None);
    }

    #[test]
    fn test_explicit_id_beats_identifier_and_underscore() {
        let value = json!({"id": "a", "identifier": "b", "_id": "c"});
        assert_eq!(resolve_reference_id(&value), Some("a".to_string()));
    }

    #[test]
    fn test_identifier_beats_underscore_id() {
        let value = json!({"identifier": "b", "_id": "c"});
        assert_eq!(resolve_reference_id(&value), Some("b".to_string()));
    }

    #[test]
    fn test_underscore_id_last_resort() {
        assert_eq!(
            resolve_reference_id(&json!({"_id": "c"})),
            Some("c".to_string())
        );
    }

    #[test]
    fn test_single_element_collection() {
        assert_eq!(
            resolve_reference_id(&json!([{"id": "wrapped"}])),
            Some("wrapped".to_string())
        );
        assert_eq!(
            resolve_reference_id(&json!(["direct"])),
            Some("direct".to_string())
        );
    }

    #[test]
    fn test_multi_element_collection_discarded() {
        assert_eq!(resolve_reference_id(&json!(["a", "b"])), None);
        assert_eq!(resolve_reference_id(&json!([])), None);
    }

    #[test]
    fn test_numeric_id_stringified() {
        assert_eq!(
            resolve_reference_id(&json!({"id": 7})),
            Some("7".to_string())
        );
    }

    #[test]
    fn test_unresolvable_shapes_absent() {
        assert_eq!(resolve_reference_id(&json!(null)), None);
        assert_eq!(resolve_reference_id(&json!(true)), None);
        assert_eq!(resolve_reference_id(&json!({"name": "no ids here"})), None);
    }

    #[test]
    fn test_resolve_many_discards_unresolvable() {
        let groups = json!([{"id": "g1"}, "g2", {"nope": 1}, [{"_id": "g3"}]]);
        assert_eq!(
            resolve_reference_ids(&groups),
            vec!["g1".to_string(), "g2".to_string(), "g3".to_string()]
        );
    }
}
