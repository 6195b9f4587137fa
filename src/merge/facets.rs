use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::strategies::add_numbers;

/// Facet-level counters of a terms facet that are summed across nodes.
const TERMS_COUNTERS: [&str; 3] = ["missing", "total", "other"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetKind {
    Terms,
    Histogram,
}

impl FacetKind {
    /// Kind declared by a facet definition in a client query.
    pub fn from_definition(definition: &Value) -> Self {
        if definition.get("histogram").is_some() {
            FacetKind::Histogram
        } else {
            FacetKind::Terms
        }
    }

    /// Kind reported by the `_type` tag of a facet in a node result.
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "terms" => Some(FacetKind::Terms),
            "histogram" => Some(FacetKind::Histogram),
            _ => None,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            FacetKind::Terms => "terms",
            FacetKind::Histogram => "histogram",
        }
    }

    /// Name of the array holding the facet's entries.
    pub fn entries_field(&self) -> &'static str {
        match self {
            FacetKind::Terms => "terms",
            FacetKind::Histogram => "entries",
        }
    }

    /// Name of the field that identifies an entry.
    pub fn key_field(&self) -> &'static str {
        match self {
            FacetKind::Terms => "term",
            FacetKind::Histogram => "key",
        }
    }
}

/// One facet being merged across nodes, keyed for constant-time entry lookup.
#[derive(Debug, Clone)]
pub struct FacetAccumulator {
    kind: FacetKind,
    entries: HashMap<String, Map<String, Value>>,
    counters: Map<String, Value>,
}

impl FacetAccumulator {
    pub fn new(kind: FacetKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
            counters: Map::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges one node's facet: counts of matching keys are summed (`total` too when both
    /// sides carry it), unseen keys are inserted.
    pub fn absorb(&mut self, facet: &Value) {
        let entries = facet
            .get(self.kind.entries_field())
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for entry in entries {
            let Some(entry) = entry.as_object() else {
                continue;
            };
            let Some(key) = entry.get(self.kind.key_field()).map(entry_key) else {
                continue;
            };

            match self.entries.get_mut(&key) {
                Some(existing) => merge_entry(existing, entry),
                None => {
                    self.entries.insert(key, entry.clone());
                }
            }
        }

        if self.kind == FacetKind::Terms {
            for counter in TERMS_COUNTERS {
                let Some(incoming) = facet.get(counter).filter(|v| v.is_number()) else {
                    continue;
                };
                let merged = match self.counters.get(counter) {
                    Some(current) => add_numbers(current, incoming),
                    None => Some(incoming.clone()),
                };
                if let Some(merged) = merged {
                    self.counters.insert(counter.to_string(), merged);
                }
            }
        }
    }

    /// Converts to the client-facing array form.
    ///
    /// Terms are ordered by descending count (ties by key); histogram buckets by key.
    pub fn into_value(self) -> Value {
        let mut entries: Vec<(String, Map<String, Value>)> = self.entries.into_iter().collect();

        match self.kind {
            FacetKind::Terms => entries.sort_by(|(key_a, a), (key_b, b)| {
                count_of(b)
                    .partial_cmp(&count_of(a))
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| key_a.cmp(key_b))
            }),
            FacetKind::Histogram => entries.sort_by(|(key_a, _), (key_b, _)| {
                match (key_a.parse::<f64>(), key_b.parse::<f64>()) {
                    (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                    _ => key_a.cmp(key_b),
                }
            }),
        }

        let mut facet = Map::new();
        facet.insert("_type".to_string(), Value::from(self.kind.type_tag()));
        facet.extend(self.counters);
        facet.insert(
            self.kind.entries_field().to_string(),
            Value::Array(entries.into_iter().map(|(_, e)| Value::Object(e)).collect()),
        );
        Value::Object(facet)
    }
}

fn merge_entry(existing: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    if let (Some(a), Some(b)) = (existing.get("count"), incoming.get("count"))
        && let Some(sum) = add_numbers(a, b)
    {
        existing.insert("count".to_string(), sum);
    }
    if let (Some(a), Some(b)) = (existing.get("total"), incoming.get("total"))
        && let Some(sum) = add_numbers(a, b)
    {
        existing.insert("total".to_string(), sum);
    }
}

fn entry_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn count_of(entry: &Map<String, Value>) -> f64 {
    entry.get("count").and_then(Value::as_f64).unwrap_or(0.0)
}
