//! Dot-notation field extraction over nested JSON records.

use serde_json::Value;

/// Resolve a dot-separated path against a record.
///
/// An empty path returns the record itself. Each segment is resolved
/// against the current value:
/// - mapping: key lookup, missing key resolves to `None`
/// - list: a segment that parses as a non-negative integer indexes into
///   the list; any other segment is resolved against every element, with
///   the non-nil hits collected into a new list (fan-out). No hits
///   resolves to `None`.
/// - anything else: `None`
///
/// The fan-out rule lets a caller write `track.artists.name` to pull
/// every artist name out of an array of artist objects.
pub fn resolve_path(record: &Value, path: &str) -> Option<Value> {
    if path.is_empty() {
        return Some(record.clone());
    }

    let mut current = record.clone();
    for segment in path.split('.') {
        current = resolve_segment(&current, segment)?;
    }
    Some(current)
}

/// Resolve a single path segment against a value.
fn resolve_segment(current: &Value, segment: &str) -> Option<Value> {
    match current {
        Value::Object(map) => map.get(segment).filter(|v| !v.is_null()).cloned(),
        Value::Array(items) => {
            if let Ok(idx) = segment.parse::<usize>() {
                items.get(idx).filter(|v| !v.is_null()).cloned()
            } else {
                // Fan out over every element, keeping non-nil hits
                let hits: Vec<Value> = items
                    .iter()
                    .filter_map(|item| resolve_segment(item, segment))
                    .collect();
                if hits.is_empty() {
                    None
                } else {
                    Some(Value::Array(hits))
                }
            }
        }
        _ => None,
    }
}
