use axum::http::Method;

/// Every client request the gateway knows how to federate, by merge strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `HEAD /`
    Liveness,
    /// `GET /_cluster/nodes/stats`, `GET /_nodes/stats`
    NodeStats,
    /// `GET /_cluster/health`
    ClusterHealth,
    /// `GET /{index}/_status`
    IndexStatus,
    /// `GET /dstats/version/version`
    StatsVersion,
    /// `GET /users/user/{id}`, answered by the designated node alone.
    UserLookup,
    /// `GET|POST /{index}/{type}/_search`
    Search,
    /// `POST /tags/tag/_search`
    TagSearch,
    /// `POST /fields/field/_search`
    FieldSearch,
    /// `GET|POST /_msearch`, `GET|POST /{index}/{type}/_msearch`
    MultiSearch,
    /// `GET /{index}/{type}/{id}`
    Document,
}

/// Maps a request onto its route. `path` must not carry the query string.
///
/// More specific paths win over the generic `/{index}/{type}/...` shapes, so
/// `POST /tags/tag/_search` is a tag search and not a general search.
pub fn classify(method: &Method, path: &str) -> Option<Route> {
    let trimmed = path.trim_start_matches('/');
    let segments: Vec<&str> = if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    };
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }

    let get = *method == Method::GET;
    let post = *method == Method::POST;

    let route = match segments.as_slice() {
        [] if *method == Method::HEAD => Route::Liveness,
        ["_cluster", "nodes", "stats"] | ["_nodes", "stats"] if get => Route::NodeStats,
        ["_cluster", "health"] if get => Route::ClusterHealth,
        ["_msearch"] | [_, _, "_msearch"] if get || post => Route::MultiSearch,
        ["dstats", "version", "version"] if get => Route::StatsVersion,
        ["users", "user", _] if get => Route::UserLookup,
        ["tags", "tag", "_search"] if post => Route::TagSearch,
        ["fields", "field", "_search"] if post => Route::FieldSearch,
        [_, _, "_search"] if get || post => Route::Search,
        [_, "_status"] if get => Route::IndexStatus,
        [_, _, _] if get => Route::Document,
        _ => return None,
    };

    Some(route)
}
