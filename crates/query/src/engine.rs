//! Query engine over named JSON record sources.
//!
//! A caller builds a [`Query`] and hands it to the [`Engine`], which loads
//! and caches the named source file, applies the filters, and dispatches
//! to a per-operation handler. All engine-level failures (bad source,
//! unknown operation, missing required parameter) are reported inside
//! [`QueryResult::error`]; the engine never panics on malformed input.

use crate::path::resolve_path;
use crate::value::{compare_values, render_value, to_number};
use melos_core::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// A structured query against a named record source.
///
/// Plain JSON-serializable, suitable for exposure as a tool-call argument
/// schema to an LLM-driven caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    /// Source file to query
    pub source: String,

    /// Operation to perform: select, count, aggregate, search, filter,
    /// sort, distinct, stats, sample
    pub operation: String,

    /// Field path to operate on (dot notation, e.g. "track.artists.0.name")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Filter conditions, ANDed together
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,

    /// Sort configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,

    /// "asc" or "desc"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,

    /// Limit results (<= 0 means no limit)
    #[serde(default)]
    pub limit: i64,

    /// Offset for pagination
    #[serde(default)]
    pub offset: i64,

    /// Search term for search operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,

    /// Aggregation function: count, sum, avg, min, max, group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agg_func: Option<String>,

    /// Group-by field for aggregations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

/// A single filter condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOp,
    #[serde(default)]
    pub value: Value,
}

/// Filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    Regex,
    In,
    Exists,
    NotExists,
}

/// The result of a query operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// Build an error result. An error implies no further processing
    /// occurred.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Processes queries against JSON record sources.
///
/// The engine owns its source cache (no global state), so multiple
/// engines over different base directories can coexist. The cache is not
/// concurrency-safe; treat each engine as single-writer.
pub struct Engine {
    data_dir: PathBuf,
    cache: HashMap<String, Arc<Vec<Value>>>,
}

impl Engine {
    /// Create a new query engine rooted at the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Run a query and return results.
    pub fn execute(&mut self, query: &Query) -> QueryResult {
        let records = match self.load_source(&query.source) {
            Ok(records) => records,
            Err(e) => return QueryResult::error(format!("failed to load data: {}", e)),
        };

        let filtered = apply_filters(&records, &query.filters);

        match query.operation.as_str() {
            "select" => select_op(filtered, query),
            "count" => count_op(&filtered),
            "aggregate" => aggregate_op(&filtered, query),
            "search" => search_op(filtered, query),
            // filter is select with the filters already applied
            "filter" => select_op(filtered, query),
            "sort" => sort_op(filtered, query),
            "distinct" => distinct_op(&filtered, query),
            "stats" => stats_op(&filtered, query),
            "sample" => sample_op(filtered, query),
            other => QueryResult::error(format!("unknown operation: {}", other)),
        }
    }

    /// Drop all cached sources; the next query re-reads from disk.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Load and normalize a named source, serving repeats from the cache.
    fn load_source(&mut self, source: &str) -> AppResult<Arc<Vec<Value>>> {
        if let Some(cached) = self.cache.get(source) {
            return Ok(Arc::clone(cached));
        }

        let file_path = if !self.data_dir.as_os_str().is_empty()
            && !Path::new(source).is_absolute()
            && !source.contains(':')
        {
            self.data_dir.join(source)
        } else {
            PathBuf::from(source)
        };

        // Lexically normalize the path before reading
        let clean_path = normalize_path(&file_path);

        let contents = std::fs::read_to_string(&clean_path).map_err(|e| {
            AppError::Query(format!("failed to read source {:?}: {}", clean_path, e))
        })?;

        let parsed: Value = serde_json::from_str(&contents)
            .map_err(|e| AppError::Query(format!("failed to parse JSON: {}", e)))?;

        // Normalize: a top-level list stays as-is, anything else becomes
        // a one-element sequence.
        let records = match parsed {
            Value::Array(items) => items,
            other => vec![other],
        };

        tracing::debug!("loaded {} records from source '{}'", records.len(), source);

        let records = Arc::new(records);
        self.cache.insert(source.to_string(), Arc::clone(&records));
        Ok(records)
    }
}

/// Lexically resolve `.` and `..` components without touching the
/// filesystem, preventing traversal through the configured base directory.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Keep only the records matching every filter.
fn apply_filters(records: &[Value], filters: &[Filter]) -> Vec<Value> {
    if filters.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|item| filters.iter().all(|f| matches_filter(item, f)))
        .cloned()
        .collect()
}

/// Check a single filter against a record.
fn matches_filter(item: &Value, filter: &Filter) -> bool {
    let resolved = resolve_path(item, &filter.field);

    match filter.operator {
        FilterOp::Eq => compare_resolved(&resolved, &filter.value) == Ordering::Equal,
        FilterOp::Ne => compare_resolved(&resolved, &filter.value) != Ordering::Equal,
        FilterOp::Gt => compare_resolved(&resolved, &filter.value) == Ordering::Greater,
        FilterOp::Gte => compare_resolved(&resolved, &filter.value) != Ordering::Less,
        FilterOp::Lt => compare_resolved(&resolved, &filter.value) == Ordering::Less,
        FilterOp::Lte => compare_resolved(&resolved, &filter.value) != Ordering::Greater,
        FilterOp::Contains => {
            let haystack = render_resolved(&resolved).to_lowercase();
            let needle = render_value(&filter.value).to_lowercase();
            haystack.contains(&needle)
        }
        FilterOp::Regex => match Regex::new(&render_value(&filter.value)) {
            Ok(re) => re.is_match(&render_resolved(&resolved)),
            // an invalid pattern is treated as no match, not an error
            Err(_) => false,
        },
        FilterOp::In => filter
            .value
            .as_array()
            .map(|list| {
                let value = resolved.clone().unwrap_or(Value::Null);
                list.iter()
                    .any(|candidate| compare_values(&value, candidate) == Ordering::Equal)
            })
            .unwrap_or(false),
        FilterOp::Exists => resolved.is_some(),
        FilterOp::NotExists => resolved.is_none(),
    }
}

fn compare_resolved(resolved: &Option<Value>, rhs: &Value) -> Ordering {
    compare_values(resolved.as_ref().unwrap_or(&Value::Null), rhs)
}

fn render_resolved(resolved: &Option<Value>) -> String {
    render_value(resolved.as_ref().unwrap_or(&Value::Null))
}

/// select: optional sort, then offset, then limit, then optional
/// single-field projection (dropping records where the field is nil).
fn select_op(mut data: Vec<Value>, query: &Query) -> QueryResult {
    if let Some(sort_by) = non_empty(&query.sort_by) {
        sort_records(&mut data, sort_by, query.sort_order.as_deref());
    }

    if query.offset > 0 {
        let offset = query.offset as usize;
        data = if offset >= data.len() {
            Vec::new()
        } else {
            data.split_off(offset)
        };
    }

    if query.limit > 0 && (query.limit as usize) < data.len() {
        data.truncate(query.limit as usize);
    }

    if let Some(field) = non_empty(&query.field) {
        let extracted: Vec<Value> = data
            .iter()
            .filter_map(|item| resolve_path(item, field))
            .collect();
        return QueryResult {
            count: extracted.len(),
            data: Some(Value::Array(extracted)),
            ..Default::default()
        };
    }

    QueryResult {
        count: data.len(),
        data: Some(Value::Array(data)),
        ..Default::default()
    }
}

fn count_op(data: &[Value]) -> QueryResult {
    QueryResult {
        count: data.len(),
        summary: Some(format!("Found {} items", data.len())),
        ..Default::default()
    }
}

fn aggregate_op(data: &[Value], query: &Query) -> QueryResult {
    let field = non_empty(&query.field).unwrap_or("");

    match query.agg_func.as_deref().unwrap_or("") {
        "count" => count_op(data),
        "sum" => sum_op(data, field),
        "avg" => avg_op(data, field),
        "min" => min_op(data, field),
        "max" => max_op(data, field),
        "group" => group_op(data, query),
        other => QueryResult::error(format!("unknown aggregation function: {}", other)),
    }
}

fn sum_op(data: &[Value], field: &str) -> QueryResult {
    let sum: f64 = data
        .iter()
        .filter_map(|item| resolve_path(item, field))
        .filter_map(|value| to_number(&value))
        .sum();

    QueryResult {
        count: data.len(),
        data: Some(json!(sum)),
        summary: Some(format!("Sum of {}: {:.2}", field, sum)),
        ..Default::default()
    }
}

fn avg_op(data: &[Value], field: &str) -> QueryResult {
    let mut sum = 0.0;
    let mut count = 0usize;

    for item in data {
        if let Some(num) = resolve_path(item, field).and_then(|v| to_number(&v)) {
            sum += num;
            count += 1;
        }
    }

    if count == 0 {
        return QueryResult {
            count: 0,
            data: Some(json!(0)),
            summary: Some("No numeric values found".to_string()),
            ..Default::default()
        };
    }

    let avg = sum / count as f64;
    QueryResult {
        count,
        data: Some(json!(avg)),
        summary: Some(format!("Average of {}: {:.2}", field, avg)),
        ..Default::default()
    }
}

fn min_op(data: &[Value], field: &str) -> QueryResult {
    let mut min_val: Option<Value> = None;
    for item in data {
        let Some(val) = resolve_path(item, field) else {
            continue;
        };
        if min_val
            .as_ref()
            .map_or(true, |current| compare_values(&val, current) == Ordering::Less)
        {
            min_val = Some(val);
        }
    }

    let rendered = render_resolved(&min_val);
    QueryResult {
        count: data.len(),
        data: min_val,
        summary: Some(format!("Min {}: {}", field, rendered)),
        ..Default::default()
    }
}

fn max_op(data: &[Value], field: &str) -> QueryResult {
    let mut max_val: Option<Value> = None;
    for item in data {
        let Some(val) = resolve_path(item, field) else {
            continue;
        };
        if max_val
            .as_ref()
            .map_or(true, |current| compare_values(&val, current) == Ordering::Greater)
        {
            max_val = Some(val);
        }
    }

    let rendered = render_resolved(&max_val);
    QueryResult {
        count: data.len(),
        data: max_val,
        summary: Some(format!("Max {}: {}", field, rendered)),
        ..Default::default()
    }
}

fn group_op(data: &[Value], query: &Query) -> QueryResult {
    let group_by = non_empty(&query.group_by).unwrap_or("");

    let mut groups: HashMap<String, u64> = HashMap::new();
    for item in data {
        let key = render_resolved(&resolve_path(item, group_by));
        *groups.entry(key).or_insert(0) += 1;
    }

    let unique = groups.len();

    let mut items: Vec<(String, u64)> = groups.into_iter().collect();
    // Count descending, key ascending on ties for stable output
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    if query.limit > 0 && (query.limit as usize) < items.len() {
        items.truncate(query.limit as usize);
    }

    let data: Vec<Value> = items
        .into_iter()
        .map(|(key, count)| json!({"key": key, "count": count}))
        .collect();

    QueryResult {
        count: unique,
        data: Some(Value::Array(data)),
        summary: Some(format!("Found {} unique groups", unique)),
        ..Default::default()
    }
}

fn search_op(data: Vec<Value>, query: &Query) -> QueryResult {
    let Some(term) = non_empty(&query.search_term) else {
        return QueryResult::error("search_term is required for search operation");
    };

    let lowered = term.to_lowercase();
    let field = non_empty(&query.field).unwrap_or("");

    let mut results: Vec<Value> = data
        .into_iter()
        .filter(|item| record_contains(item, &lowered, field))
        .collect();

    if query.limit > 0 && (query.limit as usize) < results.len() {
        results.truncate(query.limit as usize);
    }

    QueryResult {
        count: results.len(),
        summary: Some(format!("Found {} items matching '{}'", results.len(), term)),
        data: Some(Value::Array(results)),
        ..Default::default()
    }
}

/// Case-insensitive text match against a specific field's rendering, or
/// against the whole record serialized to JSON when no field is given.
fn record_contains(item: &Value, term: &str, field: &str) -> bool {
    if !field.is_empty() {
        return render_resolved(&resolve_path(item, field))
            .to_lowercase()
            .contains(term);
    }

    match serde_json::to_string(item) {
        Ok(serialized) => serialized.to_lowercase().contains(term),
        Err(_) => render_value(item).to_lowercase().contains(term),
    }
}

fn sort_op(mut data: Vec<Value>, query: &Query) -> QueryResult {
    let Some(sort_by) = non_empty(&query.sort_by) else {
        return QueryResult::error("sort_by is required for sort operation");
    };

    sort_records(&mut data, sort_by, query.sort_order.as_deref());

    if query.limit > 0 && (query.limit as usize) < data.len() {
        data.truncate(query.limit as usize);
    }

    QueryResult {
        count: data.len(),
        data: Some(Value::Array(data)),
        ..Default::default()
    }
}

/// Comparator-based stable sort on a resolved field.
fn sort_records(data: &mut [Value], sort_by: &str, order: Option<&str>) {
    let descending = order == Some("desc");
    data.sort_by(|a, b| {
        let cmp = compare_values(
            &resolve_path(a, sort_by).unwrap_or(Value::Null),
            &resolve_path(b, sort_by).unwrap_or(Value::Null),
        );
        if descending {
            cmp.reverse()
        } else {
            cmp
        }
    });
}

fn distinct_op(data: &[Value], query: &Query) -> QueryResult {
    let Some(field) = non_empty(&query.field) else {
        return QueryResult::error("field is required for distinct operation");
    };

    let mut seen = HashSet::new();
    let mut distinct = Vec::new();

    for item in data {
        let val = resolve_path(item, field).unwrap_or(Value::Null);
        let key = render_value(&val);
        if seen.insert(key) {
            distinct.push(val);
        }
    }

    if query.limit > 0 && (query.limit as usize) < distinct.len() {
        distinct.truncate(query.limit as usize);
    }

    QueryResult {
        count: distinct.len(),
        summary: Some(format!(
            "Found {} distinct values for {}",
            distinct.len(),
            field
        )),
        data: Some(Value::Array(distinct)),
        ..Default::default()
    }
}

fn stats_op(data: &[Value], query: &Query) -> QueryResult {
    let mut stats = serde_json::Map::new();
    stats.insert("total_count".to_string(), json!(data.len()));

    if let Some(field) = non_empty(&query.field) {
        let mut numeric_count = 0u64;
        let mut sum = 0.0;
        let mut min_val: Option<f64> = None;
        let mut max_val: Option<f64> = None;
        let mut string_values: HashMap<String, u64> = HashMap::new();

        for item in data {
            let Some(val) = resolve_path(item, field) else {
                continue;
            };

            if let Some(num) = to_number(&val) {
                numeric_count += 1;
                sum += num;
                min_val = Some(min_val.map_or(num, |m| m.min(num)));
                max_val = Some(max_val.map_or(num, |m| m.max(num)));
            } else {
                *string_values.entry(render_value(&val)).or_insert(0) += 1;
            }
        }

        if numeric_count > 0 {
            stats.insert("numeric_count".to_string(), json!(numeric_count));
            stats.insert("sum".to_string(), json!(sum));
            stats.insert("avg".to_string(), json!(sum / numeric_count as f64));
            stats.insert("min".to_string(), json!(min_val));
            stats.insert("max".to_string(), json!(max_val));
        }

        if !string_values.is_empty() {
            stats.insert("unique_values".to_string(), json!(string_values.len()));
            // Ties break toward the lexically smaller key for stable output
            if let Some((most_common, max_count)) = string_values
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            {
                stats.insert("most_common".to_string(), json!(most_common));
                stats.insert("most_common_count".to_string(), json!(max_count));
            }
        }
    }

    QueryResult {
        count: data.len(),
        summary: Some(format!("Statistics for {} items", data.len())),
        data: Some(Value::Object(stats)),
        ..Default::default()
    }
}

/// sample: deterministic stride sampling, not statistically random.
/// Downstream callers rely on the determinism.
fn sample_op(data: Vec<Value>, query: &Query) -> QueryResult {
    let limit = if query.limit <= 0 {
        5
    } else {
        query.limit as usize
    };

    let total = data.len();
    if limit >= total {
        return QueryResult {
            count: total,
            data: Some(Value::Array(data)),
            ..Default::default()
        };
    }

    let step = total / limit;
    let mut sample = Vec::with_capacity(limit);
    let mut i = 0;
    while i < total && sample.len() < limit {
        sample.push(data[i].clone());
        i += step;
    }

    QueryResult {
        count: sample.len(),
        summary: Some(format!("Sample of {} items from {} total", sample.len(), total)),
        data: Some(Value::Array(sample)),
        ..Default::default()
    }
}

fn non_empty(opt: &Option<String>) -> Option<&str> {
    opt.as_deref().filter(|s| !s.is_empty())
}
