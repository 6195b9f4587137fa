use futures::future::join_all;
use std::sync::Arc;

use super::types::{DispatchResult, OutboundRequest};
use crate::cluster::Cluster;
use crate::cluster::node::Node;

pub struct Dispatcher {
    cluster: Arc<Cluster>,
}

impl Dispatcher {
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self { cluster }
    }

    /// Sends `request` to every node at once and waits for all of them.
    ///
    /// The returned vector has one entry per configured node, in node-list order.
    pub async fn fan_out(&self, request: &OutboundRequest) -> Vec<DispatchResult> {
        tracing::debug!(
            "Dispatching {} {} to {} nodes",
            request.method,
            request.path,
            self.cluster.len()
        );

        let sends = self
            .cluster
            .nodes()
            .iter()
            .map(|node| Self::send_to(node, request));

        join_all(sends).await
    }

    /// Sends `request` to a single node (no fan-out).
    pub async fn send_to(node: &Node, request: &OutboundRequest) -> DispatchResult {
        let body = match request.body_for(&node.id) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Not contacting node {}: {}", node.id, e);
                return DispatchResult::failed(node.id.clone(), e);
            }
        };

        match node
            .send(request.method.clone(), &request.path, body)
            .await
        {
            Ok(payload) => DispatchResult::ok(node.id.clone(), payload),
            Err(e) => {
                tracing::warn!("Request error with node {}: {}", node.id, e);
                DispatchResult::failed(node.id.clone(), e)
            }
        }
    }
}
