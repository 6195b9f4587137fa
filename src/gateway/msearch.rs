//! Multi-search batches: newline-framed `(header, query)` line pairs answered by one
//! `{"responses": [...]}` document with one sub-result per query.

use futures::future::join_all;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::cluster::node::Node;
use crate::cluster::types::NodeId;
use crate::dispatch::types::NodePayload;
use crate::error::{GatewayError, Result};
use crate::merge::hits::merge_search;
use crate::query::rewriter::QueryRewriter;
use crate::query::types::SearchSpec;

/// One query of a batch, with the header line that preceded it.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub header: String,
    pub query: Value,
    pub spec: SearchSpec,
}

#[derive(Debug, Clone)]
pub struct BatchRequest {
    entries: Vec<BatchEntry>,
}

impl BatchRequest {
    /// Splits on CR/LF, drops blank lines and pairs the rest as header then query.
    pub fn parse(body: &str) -> Result<Self> {
        let lines: Vec<&str> = body
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if lines.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "multi-search body is empty".to_string(),
            ));
        }
        if lines.len() % 2 != 0 {
            return Err(GatewayError::InvalidRequest(
                "multi-search body ends with a header that has no query".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(lines.len() / 2);
        for (position, pair) in lines.chunks_exact(2).enumerate() {
            let query: Value = serde_json::from_str(pair[1]).map_err(|e| {
                GatewayError::InvalidRequest(format!(
                    "multi-search query {} is not JSON: {}",
                    position, e
                ))
            })?;
            entries.push(BatchEntry {
                header: pair[0].to_string(),
                spec: SearchSpec::from_value(&query),
                query,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the batch for every node at once. A node for which any query fails to
    /// rewrite gets an error entry and is left out of the dispatch.
    pub async fn render_all(
        &self,
        rewriter: &QueryRewriter,
        nodes: &[Arc<Node>],
    ) -> HashMap<NodeId, Result<String>> {
        let renders = nodes.iter().map(|node| async move {
            let body = self.render_for_node(rewriter, node).await;
            if let Err(e) = &body {
                tracing::warn!("Excluding node {} from multi-search: {}", node.id, e);
            }
            (node.id.clone(), body)
        });

        join_all(renders).await.into_iter().collect()
    }

    /// The node-local batch: headers verbatim, queries rewritten, newline terminated.
    pub async fn render_for_node(&self, rewriter: &QueryRewriter, node: &Node) -> Result<String> {
        let rewrites = self
            .entries
            .iter()
            .map(|entry| rewriter.rewrite_for_node(node, &entry.query));
        let rewritten = join_all(rewrites).await;

        let mut body = String::new();
        for (entry, query) in self.entries.iter().zip(rewritten) {
            body.push_str(&entry.header);
            body.push('\n');
            body.push_str(&query?.to_string());
            body.push('\n');
        }
        Ok(body)
    }

    /// Merges the node batch responses position by position.
    ///
    /// Sub-result `k` is the search merge of every node's `responses[k]`, windowed and
    /// seeded from the client's own query `k`. Nodes lacking that position are skipped.
    pub fn merge(&self, payloads: &[NodePayload]) -> Value {
        let responses: Vec<Value> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                let results = payloads.iter().filter_map(|payload| {
                    let response = payload
                        .payload
                        .get("responses")
                        .and_then(Value::as_array)
                        .and_then(|responses| responses.get(position));
                    if response.is_none() {
                        tracing::warn!(
                            "No multi-search response {} from {}",
                            position,
                            payload.node
                        );
                    }
                    response.map(|response| (&payload.node, response))
                });
                merge_search(&entry.spec, results)
            })
            .collect();

        json!({ "responses": responses })
    }
}
