use futures::future::join_all;
use serde_json::Value;

use super::types::TagFieldSet;
use crate::cluster::node::Node;

/// Maps numeric tag ids in a node's facet output back to tag names.
///
/// Ids are local to each backend, so this must run on every node result before facets
/// from different nodes are merged by key.
pub struct TagResolver {
    fields: TagFieldSet,
}

impl TagResolver {
    pub fn new(fields: TagFieldSet) -> Self {
        Self { fields }
    }

    /// Rewrites `facets.<field>.terms[*].term` in place for every tag field.
    ///
    /// Entries whose id cannot be resolved keep their numeric term.
    pub async fn resolve(&self, node: &Node, result: &mut Value) {
        let Some(facets) = result.get("facets").and_then(Value::as_object) else {
            return;
        };

        let mut pending: Vec<(String, usize, i64)> = Vec::new();
        for field in self.fields.names() {
            let Some(terms) = facets
                .get(field)
                .and_then(|facet| facet.get("terms"))
                .and_then(Value::as_array)
            else {
                continue;
            };
            for (index, entry) in terms.iter().enumerate() {
                if let Some(id) = entry.get("term").and_then(Value::as_i64) {
                    pending.push((field.to_string(), index, id));
                }
            }
        }

        if pending.is_empty() {
            return;
        }

        let names = join_all(pending.iter().map(|(_, _, id)| node.tag_name(*id))).await;

        for ((field, index, id), name) in pending.into_iter().zip(names) {
            let name = match name {
                Ok(Some(name)) => name,
                Ok(None) => {
                    tracing::debug!("No tag with id {} on {}", id, node.id);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Tag id {} lookup failed on {}: {}", id, node.id, e);
                    continue;
                }
            };
            let pointer = format!("/facets/{}/terms/{}/term", field, index);
            if let Some(term) = result.pointer_mut(&pointer) {
                *term = Value::String(name);
            }
        }
    }
}
