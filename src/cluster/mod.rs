//! Cluster Topology Module
//!
//! Describes the fixed set of backend search clusters the gateway federates.
//!
//! ## Core Concepts
//! - **Node**: One independent backend cluster, addressed by `host[:port]`. The node set is
//!   read once at startup and never changes.
//! - **Tag Directory**: Every node owns its own bidirectional `name <-> id` tag cache. Tag ids
//!   are local to a backend, so caches are never shared between nodes.
//! - **Backend Protocol**: The tag collection lookups (point get by name, term search by id,
//!   wildcard search) that populate a node's directory on cache miss.

pub mod node;
pub mod protocol;
pub mod tags;
pub mod types;


use std::sync::Arc;
use std::time::Duration;

use crate::error::{GatewayError, Result};
use node::Node;
use types::NodeId;

/// Outbound transport settings shared by every node client.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(600),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 100,
        }
    }
}

/// The ordered node list. Order is significant: dispatch results and merges follow it.
pub struct Cluster {
    nodes: Vec<Arc<Node>>,
}

impl Cluster {
    pub fn new(node_ids: &[String], transport: &TransportSettings) -> Result<Arc<Self>> {
        if node_ids.is_empty() {
            return Err(GatewayError::Configuration(
                "node list is empty".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(transport.request_timeout)
            .connect_timeout(transport.connect_timeout)
            .pool_max_idle_per_host(transport.pool_max_idle_per_host)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("http client: {}", e)))?;

        let nodes = node_ids
            .iter()
            .map(|id| Arc::new(Node::new(NodeId(id.clone()), http_client.clone())))
            .collect();

        Ok(Arc::new(Self { nodes }))
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    /// The node that answers single-node lookups (user records).
    pub fn designated(&self) -> &Arc<Node> {
        &self.nodes[0]
    }

    pub fn get(&self, id: &NodeId) -> Option<&Arc<Node>> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
