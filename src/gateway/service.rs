use axum::http::{Method, StatusCode};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;

use super::msearch::BatchRequest;
use super::routes::{Route, classify};
use crate::cluster::Cluster;
use crate::cluster::types::NodeId;
use crate::dispatch::dispatcher::Dispatcher;
use crate::dispatch::types::{NodePayload, OutboundRequest, successful_payloads};
use crate::error::{GatewayError, Result};
use crate::merge::hits::{batch_result_problem, merge_search, search_result_problem};
use crate::merge::strategies::{
    dedup_by_id, first_existing, min_by_version, numeric_sum, shallow_merge, sum_index_docs,
};
use crate::query::resolver::TagResolver;
use crate::query::rewriter::QueryRewriter;
use crate::query::types::{SearchSpec, TagFieldSet};

/// The merged answer to one client request. `body` is `None` for bodiless replies.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl GatewayResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            body: None,
        }
    }

    pub fn error(error: &GatewayError) -> Self {
        Self {
            status: error.status_code(),
            body: Some(error.to_body()),
        }
    }
}

/// Orchestrates one client request: classify, rewrite, dispatch, resolve, merge.
pub struct Gateway {
    cluster: Arc<Cluster>,
    dispatcher: Dispatcher,
    rewriter: QueryRewriter,
    resolver: TagResolver,
}

impl Gateway {
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self::with_tag_fields(cluster, TagFieldSet::default())
    }

    pub fn with_tag_fields(cluster: Arc<Cluster>, fields: TagFieldSet) -> Self {
        Self {
            dispatcher: Dispatcher::new(cluster.clone()),
            rewriter: QueryRewriter::new(fields.clone()),
            resolver: TagResolver::new(fields),
            cluster,
        }
    }

    /// Answers one client request. `target` is the path with its query string, which
    /// is forwarded to the nodes unchanged.
    pub async fn handle(&self, method: Method, target: &str, body: String) -> GatewayResponse {
        let path = target.split('?').next().unwrap_or_default();
        let Some(route) = classify(&method, path) else {
            let error = GatewayError::UnsupportedRoute {
                method: method.to_string(),
                path: path.to_string(),
            };
            tracing::warn!("{}", error);
            return GatewayResponse::error(&error);
        };

        if route == Route::Liveness {
            return GatewayResponse::empty();
        }

        let body = (!body.trim().is_empty()).then_some(body);
        match self.route(route, method, target, body).await {
            Ok(merged) => GatewayResponse::ok(merged),
            Err(e) => {
                tracing::error!("Request {:?} failed: {}", route, e);
                GatewayResponse::error(&e)
            }
        }
    }

    async fn route(
        &self,
        route: Route,
        method: Method,
        target: &str,
        body: Option<String>,
    ) -> Result<Value> {
        match route {
            Route::NodeStats => {
                let payloads = self.gather(method, target, body).await?;
                Ok(shallow_merge(&payloads, "nodes"))
            }
            Route::ClusterHealth => {
                let payloads = self.gather(method, target, body).await?;
                Ok(numeric_sum(&payloads))
            }
            Route::IndexStatus => {
                let payloads = self.gather(method, target, body).await?;
                Ok(sum_index_docs(&payloads))
            }
            Route::StatsVersion => {
                let payloads = self.gather(method, target, body).await?;
                Ok(min_by_version(&payloads))
            }
            Route::Document => {
                let payloads = self.gather(method, target, body).await?;
                Ok(first_existing(&payloads))
            }
            Route::UserLookup => self.user_lookup(method, target, body).await,
            Route::TagSearch => {
                let mut payloads = self.gather(method, target, body).await?;
                self.resolve_tags(&mut payloads).await;
                Ok(dedup_by_id(&payloads))
            }
            Route::FieldSearch => {
                let payloads = self.gather(method, target, body).await?;
                Ok(dedup_by_id(&payloads))
            }
            Route::Search => self.search(method, target, body).await,
            Route::MultiSearch => self.multi_search(method, target, body).await,
            // Answered without a body in `handle`.
            Route::Liveness => Ok(Value::Null),
        }
    }

    /// Plain fan-out of the unmodified request.
    async fn gather(
        &self,
        method: Method,
        target: &str,
        body: Option<String>,
    ) -> Result<Vec<NodePayload>> {
        let request = OutboundRequest::new(method, target, body);
        successful_payloads(self.dispatcher.fan_out(&request).await)
    }

    async fn user_lookup(&self, method: Method, target: &str, body: Option<String>) -> Result<Value> {
        let request = OutboundRequest::new(method, target, body);
        let node = self.cluster.designated();
        Dispatcher::send_to(node, &request)
            .await
            .outcome
            .map_err(|e| GatewayError::AllNodesFailed(vec![e]))
    }

    pub async fn search(&self, method: Method, target: &str, body: Option<String>) -> Result<Value> {
        let Some(body) = body else {
            let request = OutboundRequest::new(method, target, None);
            let mut payloads = self.gather_search(&request).await?;
            self.resolve_tags(&mut payloads).await;
            let spec = payloads.iter().fold(SearchSpec::default(), |spec, payload| {
                spec.with_reported_facets(&payload.payload)
            });
            return Ok(merge_search(&spec, node_results(&payloads)));
        };

        let query: Value = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidRequest(format!("search body is not JSON: {}", e)))?;
        let spec = SearchSpec::from_value(&query);

        let bodies = self.rewriter.rewrite_all(self.cluster.nodes(), &query).await;
        let request = OutboundRequest::new(method, target, Some(body)).with_per_node_bodies(bodies);
        let mut payloads = self.gather_search(&request).await?;

        self.resolve_tags(&mut payloads).await;
        Ok(merge_search(&spec, node_results(&payloads)))
    }

    /// Fan-out whose node results must be search results; error documents count as failures.
    async fn gather_search(&self, request: &OutboundRequest) -> Result<Vec<NodePayload>> {
        let results = self
            .dispatcher
            .fan_out(request)
            .await
            .into_iter()
            .map(|result| result.reject_if(search_result_problem))
            .collect();
        successful_payloads(results).map_err(GatewayError::narrowed)
    }

    pub async fn multi_search(
        &self,
        method: Method,
        target: &str,
        body: Option<String>,
    ) -> Result<Value> {
        let batch = BatchRequest::parse(body.as_deref().unwrap_or_default())?;
        tracing::debug!("Multi-search with {} queries", batch.len());

        let bodies = batch.render_all(&self.rewriter, self.cluster.nodes()).await;
        let request = OutboundRequest::new(method, target, None).with_per_node_bodies(bodies);
        let results = self
            .dispatcher
            .fan_out(&request)
            .await
            .into_iter()
            .map(|result| result.reject_if(batch_result_problem))
            .collect();
        let mut payloads = successful_payloads(results).map_err(GatewayError::narrowed)?;

        self.resolve_batch_tags(&mut payloads).await;
        Ok(batch.merge(&payloads))
    }

    /// Maps facet tag ids back to names on every node payload, all nodes concurrently.
    async fn resolve_tags(&self, payloads: &mut [NodePayload]) {
        let resolutions = payloads.iter_mut().filter_map(|payload| {
            let node = self.cluster.get(&payload.node)?.clone();
            Some(async move { self.resolver.resolve(&node, &mut payload.payload).await })
        });
        join_all(resolutions).await;
    }

    async fn resolve_batch_tags(&self, payloads: &mut [NodePayload]) {
        let resolutions = payloads.iter_mut().filter_map(|payload| {
            let node = self.cluster.get(&payload.node)?.clone();
            let responses = payload
                .payload
                .get_mut("responses")
                .and_then(Value::as_array_mut)?;
            Some(async move {
                join_all(
                    responses
                        .iter_mut()
                        .map(|response| self.resolver.resolve(&node, response)),
                )
                .await;
            })
        });
        join_all(resolutions).await;
    }
}

fn node_results(payloads: &[NodePayload]) -> impl Iterator<Item = (&NodeId, &Value)> {
    payloads.iter().map(|payload| (&payload.node, &payload.payload))
}
