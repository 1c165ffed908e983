//! Total-order comparison across heterogeneous JSON values.
//!
//! The comparator drives filtering, sorting and aggregation without
//! per-field type declarations: nil sorts below everything, numbers
//! compare numerically, recognized timestamps compare chronologically,
//! and everything else falls back to its string rendering.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// Compare two values, nil-aware and coercion-ordered.
///
/// Policy, in priority order:
/// 1. Null is less than any non-null value; both null compare equal.
/// 2. If both values coerce to a number, compare numerically.
/// 3. If both parse as a recognized timestamp, compare chronologically.
/// 4. Otherwise compare the default string renderings lexically.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    if let (Some(num_a), Some(num_b)) = (to_number(a), to_number(b)) {
        return num_a.partial_cmp(&num_b).unwrap_or(Ordering::Equal);
    }

    if let (Some(time_a), Some(time_b)) = (to_timestamp(a), to_timestamp(b)) {
        return time_a.cmp(&time_b);
    }

    render_value(a).cmp(&render_value(b))
}

/// Coerce a value to f64. Only JSON numbers coerce; strings never do.
pub fn to_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Parse a value as a timestamp using a short fixed list of formats,
/// most specific first.
pub fn to_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}

/// Default string rendering of a value.
///
/// Strings render bare (no quotes), null renders "null", other scalars
/// via Display, lists and maps as compact JSON. Distinct/group keys and
/// substring matching all go through this rendering.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}
