use serde_json::Value;
use std::cmp::Ordering;

use crate::query::types::{SearchSpec, SortDirection, SortKey};

/// Compares two hits by their backend-supplied `sort` tuples, position by position.
///
/// Positions that compare equal are skipped; the first differing position decides,
/// flipped for descending keys.
pub fn compare_hits(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    let empty = Vec::new();
    let a_values = a.get("sort").and_then(Value::as_array).unwrap_or(&empty);
    let b_values = b.get("sort").and_then(Value::as_array).unwrap_or(&empty);

    for (position, key) in keys.iter().enumerate() {
        let (Some(a_value), Some(b_value)) = (a_values.get(position), b_values.get(position))
        else {
            continue;
        };

        let ordering = compare_sort_values(a_value, b_value);
        if ordering == Ordering::Equal {
            continue;
        }
        return match key.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
    }

    Ordering::Equal
}

/// Text compares by [`collate`], numbers numerically; mixed types are equal.
pub fn compare_sort_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => collate(a, b),
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

/// Human-oriented text order: case-insensitive first, exact text as tie-breaker.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Stable sort, so hits that tie keep their node order.
pub fn sort_hits(hits: &mut [Value], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    hits.sort_by(|a, b| compare_hits(a, b, keys));
}

/// `hits[from .. from + size]`, clamped; no `size` means no upper bound.
pub fn paginate(hits: Vec<Value>, from: Option<usize>, size: Option<usize>) -> Vec<Value> {
    let from = from.unwrap_or(0);
    let window = hits.into_iter().skip(from);
    match size {
        Some(size) => window.take(size).collect(),
        None => window.collect(),
    }
}

pub fn sort_and_paginate(mut hits: Vec<Value>, spec: &SearchSpec) -> Vec<Value> {
    sort_hits(&mut hits, &spec.sort);
    paginate(hits, spec.from, spec.size)
}
