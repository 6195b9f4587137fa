use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;

use crate::cluster::types::NodeId;
use crate::error::{GatewayError, Result};

/// The outcome of one node's share of a dispatch, tagged with its origin.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub node: NodeId,
    pub outcome: Result<Value>,
}

impl DispatchResult {
    pub fn ok(node: NodeId, payload: Value) -> Self {
        Self {
            node,
            outcome: Ok(payload),
        }
    }

    pub fn failed(node: NodeId, error: GatewayError) -> Self {
        Self {
            node,
            outcome: Err(error),
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    /// Demotes a payload that `problem` objects to into a malformed-response failure, so
    /// backend error documents count as failed nodes instead of empty results.
    pub fn reject_if(self, problem: impl Fn(&Value) -> Option<String>) -> Self {
        let reason = match &self.outcome {
            Ok(payload) => problem(payload),
            Err(_) => None,
        };
        match reason {
            Some(reason) => Self {
                outcome: Err(GatewayError::MalformedUpstreamResponse {
                    node: self.node.clone(),
                    reason,
                }),
                node: self.node,
            },
            None => self,
        }
    }
}

/// A successful node payload together with the node that produced it.
#[derive(Debug, Clone)]
pub struct NodePayload {
    pub node: NodeId,
    pub payload: Value,
}

/// Keeps the successful payloads (in node order) and logs the failures.
///
/// Fails with [`GatewayError::AllNodesFailed`] only when no node succeeded.
pub fn successful_payloads(results: Vec<DispatchResult>) -> Result<Vec<NodePayload>> {
    let mut payloads = Vec::with_capacity(results.len());
    let mut failures = Vec::new();

    for result in results {
        match result.outcome {
            Ok(payload) => payloads.push(NodePayload {
                node: result.node,
                payload,
            }),
            Err(e) => {
                tracing::warn!("Excluding node {} from merge: {}", result.node, e);
                failures.push(e);
            }
        }
    }

    if payloads.is_empty() {
        return Err(GatewayError::AllNodesFailed(failures));
    }
    Ok(payloads)
}

/// One logical request to fan out.
///
/// `per_node` carries rewritten bodies; a node missing from the map gets the shared `body`.
/// A node whose entry is an error (for example a failed rewrite) is not contacted and
/// reports that error as its outcome.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
    pub per_node: Option<HashMap<NodeId, Result<String>>>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            per_node: None,
        }
    }

    pub fn with_per_node_bodies(mut self, bodies: HashMap<NodeId, Result<String>>) -> Self {
        self.per_node = Some(bodies);
        self
    }

    pub fn body_for(&self, node: &NodeId) -> Result<Option<String>> {
        match self.per_node.as_ref().and_then(|bodies| bodies.get(node)) {
            Some(Ok(body)) => Ok(Some(body.clone())),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(self.body.clone()),
        }
    }
}
