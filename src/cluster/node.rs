use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use super::protocol::{
    ENDPOINT_TAG_DOCUMENT, ENDPOINT_TAG_SEARCH, TagDocument, expansion_ids, first_hit_id,
    tag_by_id_query, tag_expansion_request,
};
use super::tags::TagDirectory;
use super::types::NodeId;
use crate::error::{GatewayError, Result};

/// One backend cluster: its address, its outbound client and its own tag cache.
pub struct Node {
    pub id: NodeId,
    pub tags: TagDirectory,
    base_url: String,
    http_client: reqwest::Client,
}

impl Node {
    pub fn new(id: NodeId, http_client: reqwest::Client) -> Self {
        let base_url = id.base_url();
        Self {
            id,
            tags: TagDirectory::new(),
            base_url,
            http_client,
        }
    }

    /// Sends one request and parses the reply as JSON; an empty reply becomes `{}`.
    ///
    /// The HTTP status is not inspected: backend error documents are JSON too and are
    /// handled by the merge step like any other payload.
    pub async fn send(&self, method: Method, path: &str, body: Option<String>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http_client.request(method, url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(&self.id, e))?;
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::from_transport(&self.id, e))?;

        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::MalformedUpstreamResponse {
            node: self.id.clone(),
            reason: e.to_string(),
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(Method::POST, path, Some(body.to_string())).await
    }

    /// Resolves a tag name to this node's numeric id, consulting the cache first.
    ///
    /// `Ok(None)` means the node has no such tag.
    pub async fn tag_id(&self, name: &str) -> Result<Option<i64>> {
        if let Some(id) = self.tags.id_of(name) {
            return Ok(Some(id));
        }

        let path = format!("{}/{}", ENDPOINT_TAG_DOCUMENT, urlencoding::encode(name));
        let response = self.send(Method::GET, &path, None).await?;
        let document: TagDocument = serde_json::from_value(response).map_err(|e| {
            GatewayError::MalformedUpstreamResponse {
                node: self.id.clone(),
                reason: format!("tag document: {}", e),
            }
        })?;

        match document.id() {
            Some(id) => {
                self.tags.record(name, id);
                Ok(Some(id))
            }
            None => {
                tracing::debug!("Tag '{}' not present on {}", name, self.id);
                Ok(None)
            }
        }
    }

    /// Reverse lookup of a numeric tag id, consulting the cache first.
    pub async fn tag_name(&self, id: i64) -> Result<Option<String>> {
        if let Some(name) = self.tags.name_of(id) {
            return Ok(Some(name));
        }

        let response = self
            .post_json(ENDPOINT_TAG_SEARCH, &tag_by_id_query(id))
            .await?;

        match first_hit_id(&response) {
            Some(name) => {
                self.tags.record(&name, id);
                Ok(Some(name))
            }
            None => Ok(None),
        }
    }

    /// Runs a wildcard `query` against the tag collection and returns the matching ids.
    ///
    /// Expansion results bypass the directory: a pattern is re-evaluated on every request.
    pub async fn expand_tags(&self, query: Value) -> Result<Vec<i64>> {
        let response = self
            .post_json(ENDPOINT_TAG_SEARCH, &tag_expansion_request(query))
            .await?;
        Ok(expansion_ids(&response))
    }
}
