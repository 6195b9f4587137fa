//! Backend Tag Collection Protocol
//!
//! Endpoints and response shapes used to look tags up on a backend node.
//!
//! Every backend keeps its tags in a `tags/tag` collection: the document `_id` is the
//! human-readable tag name and `_source.n` is the compact numeric id stored in the indexed
//! documents. HTTP header tags live in the same collection under a reserved name prefix.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// --- API Endpoints ---

/// Point lookup of a tag document by name (`/tags/tag/{name}`).
pub const ENDPOINT_TAG_DOCUMENT: &str = "/tags/tag";
/// Search over the tag collection (reverse lookups and wildcard expansion).
pub const ENDPOINT_TAG_SEARCH: &str = "/tags/tag/_search";

/// Name prefix of tags that record HTTP header names.
pub const HTTP_HEADER_TAG_PREFIX: &str = "http:header:";

/// Upper bound on tags returned by one wildcard expansion.
pub const WILDCARD_EXPANSION_LIMIT: usize = 500;

// --- Data Transfer Objects ---

/// Response of a point lookup by name.
///
/// Older backends report presence with `exists`, newer ones with `found`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TagDocument {
    #[serde(default)]
    pub exists: Option<bool>,
    #[serde(default)]
    pub found: Option<bool>,
    #[serde(default, rename = "_source")]
    pub source: Option<TagSource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagSource {
    pub n: i64,
}

impl TagDocument {
    /// The numeric id, if the backend reports the tag as present.
    pub fn id(&self) -> Option<i64> {
        let present = self.exists.or(self.found).unwrap_or(false);
        if !present {
            return None;
        }
        self.source.as_ref().map(|source| source.n)
    }
}

/// Body of the reverse lookup: which tag has numeric id `id`.
pub fn tag_by_id_query(id: i64) -> Value {
    json!({ "query": { "term": { "n": id } } })
}

/// Body of a wildcard expansion request wrapping `query`.
pub fn tag_expansion_request(query: Value) -> Value {
    json!({
        "size": WILDCARD_EXPANSION_LIMIT,
        "fields": ["id", "n"],
        "query": query,
    })
}

/// Extracts `hits.hits[*].fields.n` from a wildcard expansion response.
///
/// Depending on the backend version the field is either a scalar or a one-element array.
pub fn expansion_ids(response: &Value) -> Vec<i64> {
    response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| {
                    let n = hit.pointer("/fields/n")?;
                    match n {
                        Value::Array(values) => values.first().and_then(Value::as_i64),
                        other => other.as_i64(),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Name of the first hit of a reverse lookup response.
pub fn first_hit_id(response: &Value) -> Option<String> {
    response
        .pointer("/hits/hits/0/_id")
        .and_then(Value::as_str)
        .map(str::to_string)
}
