//! Error types shared by every stage of the federation pipeline.
//!
//! Per-node failures travel inside [`DispatchResult`](crate::dispatch::types::DispatchResult)
//! values and are recovered locally. Only request-level failures (every node failed,
//! an unknown route, an unreadable client body) are turned into HTTP error responses.

use axum::http::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;

use crate::cluster::types::NodeId;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Transport failure while contacting a node.
    #[error("node {node} unreachable: {reason}")]
    NodeUnreachable { node: NodeId, reason: String },

    /// The node did not answer within the configured request timeout.
    #[error("node {node} timed out")]
    NodeTimeout { node: NodeId },

    /// The node answered with something that is not the JSON we expect.
    #[error("malformed response from node {node}: {reason}")]
    MalformedUpstreamResponse { node: NodeId, reason: String },

    /// A tag name referenced by the query has no entry on this node.
    #[error("tag '{tag}' not found on node {node}")]
    TagNotFound { node: NodeId, tag: String },

    #[error("no handler for {method} {path}")]
    UnsupportedRoute { method: String, path: String },

    #[error("all {} nodes failed: {}", .0.len(), join_causes(.0))]
    AllNodesFailed(Vec<GatewayError>),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

fn join_causes(causes: &[GatewayError]) -> String {
    causes
        .iter()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl GatewayError {
    /// Classifies a reqwest failure for `node`.
    pub fn from_transport(node: &NodeId, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::NodeTimeout { node: node.clone() }
        } else if err.is_decode() {
            GatewayError::MalformedUpstreamResponse {
                node: node.clone(),
                reason: err.to_string(),
            }
        } else {
            GatewayError::NodeUnreachable {
                node: node.clone(),
                reason: err.to_string(),
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnsupportedRoute { .. } | GatewayError::TagNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::NodeTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::NodeUnreachable { .. }
            | GatewayError::MalformedUpstreamResponse { .. }
            | GatewayError::AllNodesFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// A request whose every node failed only because a tag is unknown is reported as
    /// that missing tag rather than as a gateway failure.
    pub fn narrowed(self) -> Self {
        match self {
            GatewayError::AllNodesFailed(causes)
                if !causes.is_empty()
                    && causes
                        .iter()
                        .all(|cause| matches!(cause, GatewayError::TagNotFound { .. })) =>
            {
                causes.into_iter().next().unwrap_or(GatewayError::AllNodesFailed(Vec::new()))
            }
            other => other,
        }
    }

    /// Error body in the shape search clients already understand.
    pub fn to_body(&self) -> Value {
        json!({
            "error": self.to_string(),
            "status": self.status_code().as_u16(),
        })
    }
}
