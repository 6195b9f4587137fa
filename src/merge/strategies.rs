//! Endpoint merge strategies for the simple (non-search) routes.
//!
//! Every strategy receives the successful node payloads in node order; the slice is
//! never empty because dispatch fails the request when no node succeeds.

use serde_json::{Map, Number, Value, json};
use std::cmp::Ordering;
use std::collections::HashSet;

use super::sort::compare_sort_values;
use crate::dispatch::types::NodePayload;

/// Label written into `cluster_name` of a summed health report.
pub const COMBINED_CLUSTER_NAME: &str = "COMBINED";

/// Adds two JSON numbers, staying integral when both sides are.
pub fn add_numbers(a: &Value, b: &Value) -> Option<Value> {
    let (Value::Number(a), Value::Number(b)) = (a, b) else {
        return None;
    };

    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64())
        && let Some(sum) = a.checked_add(b)
    {
        return Some(Value::from(sum));
    }
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64())
        && let Some(sum) = a.checked_add(b)
    {
        return Some(Value::from(sum));
    }

    let sum = a.as_f64()? + b.as_f64()?;
    Number::from_f64(sum).map(Value::Number)
}

fn first_payload(payloads: &[NodePayload]) -> Value {
    payloads
        .first()
        .map(|p| p.payload.clone())
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Copies every key of `field` from later payloads into the first one; later nodes win.
pub fn shallow_merge(payloads: &[NodePayload], field: &str) -> Value {
    let mut merged = first_payload(payloads);
    copy_fields(&mut merged, payloads.get(1..).unwrap_or_default(), field);
    merged
}

fn copy_fields(merged: &mut Value, rest: &[NodePayload], field: &str) {
    let Some(root) = merged.as_object_mut() else {
        return;
    };
    let Value::Object(target) = root
        .entry(field)
        .or_insert_with(|| Value::Object(Map::new()))
    else {
        return;
    };

    for payload in rest {
        let Some(source) = payload.payload.get(field).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Sums every top-level numeric field into the first payload and relabels the cluster.
pub fn numeric_sum(payloads: &[NodePayload]) -> Value {
    let mut merged = first_payload(payloads);

    if let Some(target) = merged.as_object_mut() {
        for payload in payloads.iter().skip(1) {
            let Some(source) = payload.payload.as_object() else {
                continue;
            };
            for (key, value) in source {
                if !value.is_number() {
                    continue;
                }
                let sum = match target.get(key) {
                    Some(current) => add_numbers(current, value),
                    None => Some(value.clone()),
                };
                if let Some(sum) = sum {
                    target.insert(key.clone(), sum);
                }
            }
        }
        target.insert(
            "cluster_name".to_string(),
            Value::from(COMBINED_CLUSTER_NAME),
        );
    }

    merged
}

/// Unions `indices`; an index reported by several nodes gets its `docs.num_docs` summed.
pub fn sum_index_docs(payloads: &[NodePayload]) -> Value {
    let mut merged = first_payload(payloads);
    merge_indices(&mut merged, payloads.get(1..).unwrap_or_default());
    merged
}

fn merge_indices(merged: &mut Value, rest: &[NodePayload]) {
    let Some(root) = merged.as_object_mut() else {
        return;
    };
    let Value::Object(indices) = root
        .entry("indices")
        .or_insert_with(|| Value::Object(Map::new()))
    else {
        return;
    };

    for payload in rest {
        let Some(source) = payload.payload.get("indices").and_then(Value::as_object) else {
            continue;
        };
        for (name, index) in source {
            match indices.get_mut(name) {
                Some(existing) => {
                    let current = existing.pointer("/docs/num_docs");
                    let incoming = index.pointer("/docs/num_docs");
                    let sum = match (current, incoming) {
                        (Some(a), Some(b)) => add_numbers(a, b),
                        (None, Some(b)) => Some(b.clone()),
                        _ => None,
                    };
                    if let Some(sum) = sum {
                        set_num_docs(existing, sum);
                    }
                }
                None => {
                    indices.insert(name.clone(), index.clone());
                }
            }
        }
    }
}

fn set_num_docs(index: &mut Value, num_docs: Value) {
    let Some(index) = index.as_object_mut() else {
        return;
    };
    let docs = index
        .entry("docs")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(docs) = docs {
        docs.insert("num_docs".to_string(), num_docs);
    }
}

/// The payload whose `_source.version` is smallest; payloads without one are ignored.
pub fn min_by_version(payloads: &[NodePayload]) -> Value {
    payloads
        .iter()
        .filter(|p| p.payload.pointer("/_source/version").is_some())
        .min_by(|a, b| {
            match (
                a.payload.pointer("/_source/version"),
                b.payload.pointer("/_source/version"),
            ) {
                (Some(a), Some(b)) => compare_sort_values(a, b),
                _ => Ordering::Equal,
            }
        })
        .map(|p| p.payload.clone())
        .unwrap_or_else(|| first_payload(payloads))
}

/// The first payload that reports the document as present, else the first payload.
pub fn first_existing(payloads: &[NodePayload]) -> Value {
    payloads
        .iter()
        .find(|p| {
            p.payload
                .get("exists")
                .or_else(|| p.payload.get("found"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .map(|p| p.payload.clone())
        .unwrap_or_else(|| first_payload(payloads))
}

/// Unique hits by `_id` across nodes, first occurrence wins; `hits.total` is the unique count.
///
/// Node payloads carrying an error or no hits are skipped.
pub fn dedup_by_id(payloads: &[NodePayload]) -> Value {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut base: Option<Value> = None;

    for payload in payloads {
        if let Some(error) = payload.payload.get("error") {
            tracing::warn!("Issue with results from {}: {}", payload.node, error);
            continue;
        }
        let Some(hits) = payload.payload.pointer("/hits/hits").and_then(Value::as_array) else {
            tracing::warn!("No hits in results from {}", payload.node);
            continue;
        };

        if base.is_none() {
            base = Some(payload.payload.clone());
        }
        for hit in hits {
            let Some(id) = hit.get("_id").map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }) else {
                continue;
            };
            if seen.insert(id) {
                unique.push(hit.clone());
            }
        }
    }

    let mut merged = base.unwrap_or_else(|| json!({}));
    if let Some(root) = merged.as_object_mut() {
        root.remove("facets");
        root.insert(
            "hits".to_string(),
            json!({ "total": unique.len(), "hits": unique }),
        );
    }
    merged
}
