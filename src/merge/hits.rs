use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use super::facets::{FacetAccumulator, FacetKind};
use super::sort::sort_and_paginate;
use super::strategies::add_numbers;
use crate::cluster::types::NodeId;
use crate::query::types::SearchSpec;

const SHARD_COUNTERS: [&str; 3] = ["total", "successful", "failed"];

/// Running merge of several nodes' search results.
///
/// Hits are concatenated in node order and only sorted and windowed in [`finish`].
///
/// [`finish`]: MergedSearch::finish
#[derive(Debug, Clone)]
pub struct MergedSearch {
    total: u64,
    hits: Vec<Value>,
    facets: Option<BTreeMap<String, FacetAccumulator>>,
    took: u64,
    timed_out: bool,
    shards: Option<Map<String, Value>>,
}

impl MergedSearch {
    /// Empty result with one accumulator of the declared kind per facet in `spec`.
    pub fn seeded(spec: &SearchSpec) -> Self {
        let facets: Option<BTreeMap<_, _>> = spec.has_facets().then(|| {
            spec.facets
                .iter()
                .map(|(name, kind)| (name.clone(), FacetAccumulator::new(*kind)))
                .collect()
        });

        Self {
            total: 0,
            hits: Vec::new(),
            facets,
            took: 0,
            timed_out: false,
            shards: None,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    /// Folds one node result in. Returns `false` if the result had no `hits`.
    pub fn absorb(&mut self, node: &NodeId, result: &Value) -> bool {
        let Some(hits) = result.get("hits") else {
            tracing::warn!("No results from {}: {}", node, result);
            return false;
        };

        self.total += hits.get("total").map(hit_total).unwrap_or(0);
        if let Some(node_hits) = hits.get("hits").and_then(Value::as_array) {
            self.hits.extend(node_hits.iter().cloned());
        }

        if let Some(took) = result.get("took").and_then(Value::as_u64) {
            self.took = self.took.max(took);
        }
        if result.get("timed_out").and_then(Value::as_bool) == Some(true) {
            self.timed_out = true;
        }
        if let Some(shards) = result.get("_shards").and_then(Value::as_object) {
            self.absorb_shards(shards);
        }

        if let Some(facets) = self.facets.as_mut()
            && let Some(node_facets) = result.get("facets").and_then(Value::as_object)
        {
            for (name, facet) in node_facets {
                if !facets.contains_key(name) {
                    let Some(kind) = facet
                        .get("_type")
                        .and_then(Value::as_str)
                        .and_then(FacetKind::from_type_tag)
                    else {
                        tracing::warn!("Unknown facet type for '{}' from {}", name, node);
                        continue;
                    };
                    facets.insert(name.clone(), FacetAccumulator::new(kind));
                }
                if let Some(accumulator) = facets.get_mut(name) {
                    accumulator.absorb(facet);
                }
            }
        }

        true
    }

    fn absorb_shards(&mut self, shards: &Map<String, Value>) {
        let merged = self.shards.get_or_insert_with(Map::new);
        for counter in SHARD_COUNTERS {
            let Some(incoming) = shards.get(counter) else {
                continue;
            };
            let sum = match merged.get(counter) {
                Some(current) => add_numbers(current, incoming),
                None => Some(incoming.clone()),
            };
            if let Some(sum) = sum {
                merged.insert(counter.to_string(), sum);
            }
        }
    }

    /// Sorts and windows the hits per `spec` and renders the client response.
    pub fn finish(self, spec: &SearchSpec) -> Value {
        let hits = sort_and_paginate(self.hits, spec);

        let mut response = Map::new();
        response.insert("took".to_string(), json!(self.took));
        response.insert("timed_out".to_string(), json!(self.timed_out));
        if let Some(shards) = self.shards {
            response.insert("_shards".to_string(), Value::Object(shards));
        }
        response.insert(
            "hits".to_string(),
            json!({ "total": self.total, "hits": hits }),
        );
        if let Some(facets) = self.facets {
            let facets: Map<String, Value> = facets
                .into_iter()
                .map(|(name, accumulator)| (name, accumulator.into_value()))
                .collect();
            response.insert("facets".to_string(), Value::Object(facets));
        }

        Value::Object(response)
    }
}

/// `hits.total` is a plain count, or `{"value": n}` on newer backends.
fn hit_total(total: &Value) -> u64 {
    total
        .as_u64()
        .or_else(|| total.get("value").and_then(Value::as_u64))
        .unwrap_or(0)
}

/// Why a node's search result cannot take part in a merge, if it cannot.
pub fn search_result_problem(result: &Value) -> Option<String> {
    if let Some(error) = result.get("error") {
        return Some(format!("backend error: {}", error));
    }
    if result.get("hits").is_none() {
        return Some("search result has no hits".to_string());
    }
    None
}

/// Why a node's multi-search result cannot take part in a merge, if it cannot.
///
/// Individual sub-results may still carry errors; those are skipped position by position.
pub fn batch_result_problem(result: &Value) -> Option<String> {
    if let Some(error) = result.get("error") {
        return Some(format!("backend error: {}", error));
    }
    if !result.get("responses").is_some_and(Value::is_array) {
        return Some("multi-search result has no responses".to_string());
    }
    None
}

/// Full single-search merge: seed from `spec`, fold every node result, finish.
pub fn merge_search<'a>(
    spec: &SearchSpec,
    results: impl IntoIterator<Item = (&'a NodeId, &'a Value)>,
) -> Value {
    let mut merged = MergedSearch::seeded(spec);
    for (node, result) in results {
        merged.absorb(node, result);
    }
    merged.finish(spec)
}
