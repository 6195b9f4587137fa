use futures::future::join_all;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use super::types::{TagFieldSet, TagNamespace, numeric_param};
use crate::cluster::node::Node;
use crate::cluster::types::NodeId;
use crate::error::{GatewayError, Result};

/// Id substituted for a name in a list that the node does not know. Backend ids are
/// non-negative, so the disjunct can never match.
pub const UNKNOWN_TAG_ID: i64 = -1;

/// Where a tag field sits in the query tree and what it asks for.
#[derive(Debug, Clone)]
struct RewriteSite {
    field: String,
    namespace: TagNamespace,
    /// JSON pointer of the field value itself.
    pointer: String,
    /// Container of the object holding the field, and the key of that object in it.
    /// `None` when the holding object is the root or an array element.
    clause: Option<(String, String)>,
    value: TagValue,
}

/// Clause keys that only carry the tag constraint and are swapped for `terms` on expansion.
const EXPANDABLE_CLAUSES: [&str; 2] = ["wildcard", "term"];

#[derive(Debug, Clone)]
enum TagValue {
    Pattern(String),
    Names(Vec<Value>),
    Name(String),
}

#[derive(Debug)]
enum Resolved {
    Expanded(Vec<i64>),
    List(Vec<Value>),
    Single(i64),
}

/// Translates tag names in a client query into one node's numeric tag ids.
pub struct QueryRewriter {
    fields: TagFieldSet,
}

impl QueryRewriter {
    pub fn new(fields: TagFieldSet) -> Self {
        Self { fields }
    }

    /// Rewrites `query` once per node, concurrently.
    ///
    /// Each entry is the serialized rewritten body, or the error that made that node's
    /// rewrite fail. A failure for one node never affects the others.
    pub async fn rewrite_all(
        &self,
        nodes: &[Arc<Node>],
        query: &Value,
    ) -> HashMap<NodeId, Result<String>> {
        let rewrites = nodes.iter().map(|node| async move {
            let body = self
                .rewrite_for_node(node, query)
                .await
                .map(|rewritten| rewritten.to_string());
            if let Err(e) = &body {
                tracing::warn!("Rewrite failed for node {}: {}", node.id, e);
            }
            (node.id.clone(), body)
        });

        join_all(rewrites).await.into_iter().collect()
    }

    /// Returns a copy of `query` with normalized pagination and node-local tag ids.
    pub async fn rewrite_for_node(&self, node: &Node, query: &Value) -> Result<Value> {
        let mut body = query.clone();
        normalize_pagination(&mut body);

        let mut sites = Vec::new();
        self.collect_sites(&body, String::new(), None, &mut sites);
        if sites.is_empty() {
            return Ok(body);
        }

        let resolutions = join_all(sites.iter().map(|site| resolve_site(node, site))).await;
        let mut resolved = Vec::with_capacity(sites.len());
        for (site, resolution) in sites.into_iter().zip(resolutions) {
            resolved.push((site, resolution?));
        }

        // Plain substitutions first: wildcard replacement may remove their enclosing clause.
        for (site, value) in &resolved {
            match value {
                Resolved::List(ids) => {
                    replace_at(&mut body, &site.pointer, Value::from(ids.clone()))
                }
                Resolved::Single(id) => replace_at(&mut body, &site.pointer, json!(id)),
                Resolved::Expanded(_) => {}
            }
        }
        for (site, value) in &resolved {
            if let Resolved::Expanded(ids) = value {
                apply_expansion(&mut body, site, ids);
            }
        }

        Ok(body)
    }

    fn collect_sites(
        &self,
        value: &Value,
        pointer: String,
        clause: Option<(String, String)>,
        sites: &mut Vec<RewriteSite>,
    ) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let child_pointer = format!("{}/{}", pointer, escape_pointer(key));
                    if let Some(namespace) = self.fields.namespace(key)
                        && let Some(requested) = tag_value(child)
                    {
                        sites.push(RewriteSite {
                            field: key.clone(),
                            namespace,
                            pointer: child_pointer,
                            clause: clause.clone(),
                            value: requested,
                        });
                    } else if child.is_object() || child.is_array() {
                        let slot = Some((pointer.clone(), key.clone()));
                        self.collect_sites(child, child_pointer, slot, sites);
                    }
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    if child.is_object() || child.is_array() {
                        let child_pointer = format!("{}/{}", pointer, index);
                        self.collect_sites(child, child_pointer, None, sites);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Each node must return enough of its own top hits for the merged window to be right,
/// so `size` becomes `size + from` and `from` becomes 0. Global paging happens after merge.
pub fn normalize_pagination(body: &mut Value) {
    let Some(map) = body.as_object_mut() else {
        return;
    };

    let from = map.get("from").and_then(numeric_param).unwrap_or(0);
    if let Some(size) = map.get("size").and_then(numeric_param) {
        map.insert("size".to_string(), json!(size.saturating_add(from)));
    }
    map.insert("from".to_string(), json!(0));
}

fn tag_value(value: &Value) -> Option<TagValue> {
    match value {
        Value::String(s) if s.contains('*') => Some(TagValue::Pattern(s.clone())),
        Value::String(s) => Some(TagValue::Name(s.clone())),
        Value::Array(items) => Some(TagValue::Names(items.clone())),
        _ => None,
    }
}

async fn resolve_site(node: &Node, site: &RewriteSite) -> Result<Resolved> {
    match &site.value {
        TagValue::Pattern(pattern) => {
            let ids = node
                .expand_tags(site.namespace.wildcard_query(pattern))
                .await?;
            tracing::debug!(
                "Expanded {}:{} to {} tags on {}",
                site.field,
                pattern,
                ids.len(),
                node.id
            );
            Ok(Resolved::Expanded(ids))
        }
        TagValue::Names(items) => {
            let lookups = items.iter().map(|item| resolve_list_item(node, site, item));
            let ids = join_all(lookups).await.into_iter().flatten().collect();
            Ok(Resolved::List(ids))
        }
        TagValue::Name(name) => {
            let tag = site.namespace.tag_name(name);
            match node.tag_id(&tag).await? {
                Some(id) => Ok(Resolved::Single(id)),
                None => Err(GatewayError::TagNotFound {
                    node: node.id.clone(),
                    tag,
                }),
            }
        }
    }
}

/// One element of a name list. Never fails: a name that cannot be resolved, for whatever
/// reason, becomes [`UNKNOWN_TAG_ID`]. A pattern element expands to all matching ids.
async fn resolve_list_item(node: &Node, site: &RewriteSite, item: &Value) -> Vec<Value> {
    let Value::String(name) = item else {
        return vec![item.clone()];
    };

    if name.contains('*') {
        return match node
            .expand_tags(site.namespace.wildcard_query(name))
            .await
        {
            Ok(ids) if !ids.is_empty() => ids.into_iter().map(Value::from).collect(),
            Ok(_) => vec![json!(UNKNOWN_TAG_ID)],
            Err(e) => {
                tracing::warn!("Expanding {}:{} failed on {}: {}", site.field, name, node.id, e);
                vec![json!(UNKNOWN_TAG_ID)]
            }
        };
    }

    match node.tag_id(&site.namespace.tag_name(name)).await {
        Ok(Some(id)) => vec![json!(id)],
        Ok(None) => vec![json!(UNKNOWN_TAG_ID)],
        Err(e) => {
            tracing::warn!("Tag '{}' lookup failed on {}: {}", name, node.id, e);
            vec![json!(UNKNOWN_TAG_ID)]
        }
    }
}

fn replace_at(body: &mut Value, pointer: &str, replacement: Value) {
    if let Some(slot) = body.pointer_mut(pointer) {
        *slot = replacement;
    }
}

/// Swaps the `wildcard`/`term` clause wrapping a pattern field for an explicit `terms`
/// constraint. Anywhere else the pattern value itself is replaced by the id list.
fn apply_expansion(body: &mut Value, site: &RewriteSite, ids: &[i64]) {
    let terms = Value::from(ids.to_vec());

    let Some((container_pointer, wrapper)) = &site.clause else {
        replace_at(body, &site.pointer, terms);
        return;
    };
    if !EXPANDABLE_CLAUSES.contains(&wrapper.as_str()) {
        replace_at(body, &site.pointer, terms);
        return;
    }
    let Some(Value::Object(clause)) = body.pointer_mut(container_pointer) else {
        return;
    };

    clause.remove(wrapper);
    let entry = clause
        .entry("terms")
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(fields) = entry {
        fields.insert(site.field.clone(), terms);
    }
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
