use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Extension},
    http::{Method, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use super::service::{Gateway, GatewayResponse};

/// Multi-search batches can be large; the axum default of 2 MiB is too tight.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Every request lands in one fallback handler; routing happens in [`Gateway::handle`].
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(Extension(gateway))
}

pub async fn handle_request(
    Extension(gateway): Extension<Arc<Gateway>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let request_id = Uuid::new_v4();
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let span = tracing::info_span!(
        "request",
        id = %request_id,
        method = %method,
        path = %uri.path()
    );

    async move {
        let started = Instant::now();
        let response = gateway.handle(method, &target, body).await;
        tracing::info!(
            "Completed with {} in {:?}",
            response.status,
            started.elapsed()
        );
        response.into_response()
    }
    .instrument(span)
    .await
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}
