//! Query Module Tests
//!
//! ## Test Scopes
//! - **Search Spec**: Parsing of facets, sort forms and the pagination window.
//! - **Pagination**: `size`/`from` normalization sent to each node.
//! - **Rewriting**: Single names, name lists, wildcard expansion and per-node failures.
//! - **Resolution**: Facet ids mapped back to names.

#[cfg(test)]
mod tests {
    use crate::cluster::node::Node;
    use crate::cluster::types::NodeId;
    use crate::error::GatewayError;
    use crate::merge::facets::FacetKind;
    use crate::query::resolver::TagResolver;
    use crate::query::rewriter::{QueryRewriter, UNKNOWN_TAG_ID, normalize_pagination};
    use crate::query::types::{
        SearchSpec, SortDirection, SortKey, TagFieldSet, TagNamespace, numeric_param,
    };
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn node_for(server: &MockServer) -> Node {
        Node::new(NodeId(server.uri()), reqwest::Client::new())
    }

    async fn mount_tag(server: &MockServer, name: &str, id: i64) {
        Mock::given(method("GET"))
            .and(path(format!("/tags/tag/{}", name)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"exists": true, "_source": {"n": id}})),
            )
            .mount(server)
            .await;
    }

    async fn mount_missing_tags(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path_regex("^/tags/tag/[^_].*"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"exists": false})))
            .mount(server)
            .await;
    }

    fn rewriter() -> QueryRewriter {
        QueryRewriter::new(TagFieldSet::default())
    }

    // ============================================================
    // SEARCH SPEC TESTS
    // ============================================================

    #[test]
    fn test_search_spec_reads_facets_sort_and_window() {
        let spec = SearchSpec::from_value(&json!({
            "from": 5,
            "size": "5",
            "facets": {
                "ta": {"terms": {"field": "ta", "size": 10}},
                "lp": {"histogram": {"key_field": "lp", "interval": 60}}
            },
            "sort": [
                {"lp": {"order": "desc"}},
                {"a1": "asc"},
                "_score",
                "fp"
            ]
        }));

        assert_eq!(spec.from, Some(5));
        assert_eq!(spec.size, Some(5));
        assert!(spec.facets.contains(&("ta".to_string(), FacetKind::Terms)));
        assert!(spec.facets.contains(&("lp".to_string(), FacetKind::Histogram)));
        assert_eq!(
            spec.sort,
            vec![
                SortKey { field: "lp".into(), direction: SortDirection::Descending },
                SortKey { field: "a1".into(), direction: SortDirection::Ascending },
                SortKey { field: "_score".into(), direction: SortDirection::Descending },
                SortKey { field: "fp".into(), direction: SortDirection::Ascending },
            ]
        );
    }

    #[test]
    fn test_search_spec_accepts_single_sort_object() {
        let spec = SearchSpec::from_value(&json!({"sort": {"fp": {"order": "asc"}}}));

        assert_eq!(spec.sort.len(), 1);
        assert_eq!(spec.sort[0].direction, SortDirection::Ascending);
        assert!(!spec.has_facets());
    }

    #[test]
    fn test_search_spec_adopts_reported_facets() {
        let spec = SearchSpec::default()
            .with_reported_facets(&json!({"facets": {
                "tags": {"_type": "terms", "terms": []},
                "hours": {"_type": "histogram", "entries": []},
                "odd": {"_type": "statistical"}
            }}))
            .with_reported_facets(&json!({"facets": {"tags": {"_type": "histogram"}}}));

        assert_eq!(spec.facets.len(), 2);
        assert!(spec.facets.contains(&("tags".to_string(), FacetKind::Terms)));
        assert!(spec.facets.contains(&("hours".to_string(), FacetKind::Histogram)));
        assert!(!SearchSpec::default().with_reported_facets(&json!({"hits": {}})).has_facets());
    }

    #[test]
    fn test_search_spec_rejects_non_json() {
        assert!(matches!(
            SearchSpec::parse("{not json"),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_numeric_param_forms() {
        assert_eq!(numeric_param(&json!(7)), Some(7));
        assert_eq!(numeric_param(&json!("12")), Some(12));
        assert_eq!(numeric_param(&json!("abc")), None);
        assert_eq!(numeric_param(&json!(null)), None);
    }

    // ============================================================
    // PAGINATION TESTS
    // ============================================================

    #[test]
    fn test_normalize_pagination_widens_size() {
        let mut body = json!({"from": 5, "size": 5});
        normalize_pagination(&mut body);
        assert_eq!(body, json!({"from": 0, "size": 10}));
    }

    #[test]
    fn test_normalize_pagination_string_params() {
        let mut body = json!({"from": "20", "size": "10"});
        normalize_pagination(&mut body);
        assert_eq!(body["size"], 30);
        assert_eq!(body["from"], 0);
    }

    #[test]
    fn test_normalize_pagination_without_size_resets_from() {
        let mut body = json!({"from": 3});
        normalize_pagination(&mut body);
        assert_eq!(body, json!({"from": 0}));
    }

    #[test]
    fn test_normalize_pagination_huge_from_saturates() {
        let mut body = json!({"size": 10, "from": 1e300});
        normalize_pagination(&mut body);
        assert_eq!(body["size"], json!(u64::MAX));
        assert_eq!(body["from"], 0);
    }

    // ============================================================
    // NAMESPACE TESTS
    // ============================================================

    #[test]
    fn test_http_header_namespace_lowercases_and_prefixes() {
        assert_eq!(
            TagNamespace::HttpHeader.tag_name("User-Agent"),
            "http:header:user-agent"
        );
        assert_eq!(TagNamespace::Plain.tag_name("Malware"), "Malware");
    }

    #[test]
    fn test_plain_wildcard_excludes_header_namespace() {
        let query = TagNamespace::Plain.wildcard_query("abc*");
        assert_eq!(query["bool"]["must"]["wildcard"]["_id"], "abc*");
        assert_eq!(query["bool"]["must_not"]["wildcard"]["_id"], "http:header:*");
    }

    #[test]
    fn test_field_set_is_extensible() {
        let fields = TagFieldSet::default().with_field("tb", TagNamespace::Plain);
        assert_eq!(fields.namespace("tb"), Some(TagNamespace::Plain));
        assert_eq!(fields.namespace("hh1"), Some(TagNamespace::HttpHeader));
        assert_eq!(fields.namespace("xx"), None);
    }

    // ============================================================
    // REWRITER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_rewrite_single_name() {
        let server = MockServer::start().await;
        mount_tag(&server, "malware", 12).await;
        let node = node_for(&server);

        let rewritten = rewriter()
            .rewrite_for_node(&node, &json!({"query": {"term": {"ta": "malware"}}, "size": 10}))
            .await
            .unwrap();

        assert_eq!(rewritten["query"]["term"]["ta"], 12);
        assert_eq!(rewritten["from"], 0);
        assert_eq!(rewritten["size"], 10);
    }

    #[tokio::test]
    async fn test_rewrite_name_list_uses_unknown_sentinel() {
        let server = MockServer::start().await;
        mount_tag(&server, "malware", 12).await;
        mount_missing_tags(&server).await;
        let node = node_for(&server);

        let rewritten = rewriter()
            .rewrite_for_node(
                &node,
                &json!({"query": {"terms": {"ta": ["malware", "nonexistent"]}}}),
            )
            .await
            .unwrap();

        assert_eq!(
            rewritten["query"]["terms"]["ta"],
            json!([12, UNKNOWN_TAG_ID])
        );
    }

    #[tokio::test]
    async fn test_rewrite_name_list_tolerates_failed_lookup() {
        let server = MockServer::start().await;
        mount_tag(&server, "a", 7).await;
        Mock::given(method("GET"))
            .and(path("/tags/tag/b"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>busy</html>"))
            .mount(&server)
            .await;
        let node = node_for(&server);

        let rewritten = rewriter()
            .rewrite_for_node(&node, &json!({"query": {"terms": {"ta": ["a", "b"]}}}))
            .await
            .unwrap();

        assert_eq!(rewritten["query"]["terms"]["ta"], json!([7, UNKNOWN_TAG_ID]));
        assert_eq!(node.tags.id_of("b"), None);
    }

    #[tokio::test]
    async fn test_rewrite_name_list_expands_pattern_elements() {
        let server = MockServer::start().await;
        mount_tag(&server, "malware", 12).await;
        Mock::given(method("POST"))
            .and(path("/tags/tag/_search"))
            .and(body_partial_json(json!({
                "query": {"bool": {"must": {"wildcard": {"_id": "abc*"}}}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {"hits": [{"fields": {"n": 3}}, {"fields": {"n": 8}}]}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let node = node_for(&server);

        let rewritten = rewriter()
            .rewrite_for_node(
                &node,
                &json!({"query": {"terms": {"ta": ["abc*", "malware"]}}}),
            )
            .await
            .unwrap();

        assert_eq!(rewritten["query"]["terms"]["ta"], json!([3, 8, 12]));
    }

    #[tokio::test]
    async fn test_rewrite_unknown_single_name_fails_node() {
        let server = MockServer::start().await;
        mount_missing_tags(&server).await;
        let node = node_for(&server);

        let result = rewriter()
            .rewrite_for_node(&node, &json!({"query": {"term": {"ta": "ghost"}}}))
            .await;

        match result {
            Err(GatewayError::TagNotFound { tag, .. }) => assert_eq!(tag, "ghost"),
            other => panic!("expected TagNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rewrite_header_field_uses_header_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/tags/tag/http.*header.*host$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"exists": true, "_source": {"n": 40}})),
            )
            .mount(&server)
            .await;
        let node = node_for(&server);

        let rewritten = rewriter()
            .rewrite_for_node(&node, &json!({"query": {"term": {"hh1": "Host"}}}))
            .await
            .unwrap();

        assert_eq!(rewritten["query"]["term"]["hh1"], 40);
        assert_eq!(node.tags.id_of("http:header:host"), Some(40));
    }

    #[tokio::test]
    async fn test_rewrite_wildcard_expands_to_terms() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tags/tag/_search"))
            .and(body_partial_json(json!({
                "query": {"bool": {"must": {"wildcard": {"_id": "abc*"}}}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {"hits": [{"fields": {"n": 3}}, {"fields": {"n": 8}}]}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let node = node_for(&server);

        let rewritten = rewriter()
            .rewrite_for_node(
                &node,
                &json!({"query": {"bool": {"must": [
                    {"wildcard": {"ta": "abc*"}},
                    {"term": {"fp": 1}}
                ]}}}),
            )
            .await
            .unwrap();

        let first = &rewritten["query"]["bool"]["must"][0];
        assert_eq!(first, &json!({"terms": {"ta": [3, 8]}}));
        assert!(first.get("wildcard").is_none());
        assert_eq!(rewritten["query"]["bool"]["must"][1], json!({"term": {"fp": 1}}));
        // Expansions are not cached
        assert!(node.tags.is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_wildcard_outside_term_clause_keeps_structure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tags/tag/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {"hits": [{"fields": {"n": 4}}, {"fields": {"n": 9}}]}
            })))
            .mount(&server)
            .await;
        let node = node_for(&server);

        let rewritten = rewriter()
            .rewrite_for_node(&node, &json!({"size": 5, "query": {"ta": "ab*"}}))
            .await
            .unwrap();

        assert_eq!(rewritten["query"], json!({"ta": [4, 9]}));
        assert_eq!(rewritten["size"], 5);
        assert!(rewritten.get("terms").is_none());
    }

    #[tokio::test]
    async fn test_rewrite_header_wildcard_is_lowercased() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tags/tag/_search"))
            .and(body_partial_json(json!({
                "query": {"wildcard": {"_id": "http:header:x-forwarded*"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {"hits": [{"fields": {"n": [21]}}]}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let node = node_for(&server);

        let rewritten = rewriter()
            .rewrite_for_node(&node, &json!({"query": {"wildcard": {"hh": "X-Forwarded*"}}}))
            .await
            .unwrap();

        assert_eq!(rewritten["query"], json!({"terms": {"hh": [21]}}));
    }

    #[tokio::test]
    async fn test_rewrite_resolves_each_name_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tags/tag/malware"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"exists": true, "_source": {"n": 12}})),
            )
            .expect(1)
            .mount(&server)
            .await;
        let node = node_for(&server);
        let query = json!({"query": {"term": {"ta": "malware"}}});

        rewriter().rewrite_for_node(&node, &query).await.unwrap();
        let second = rewriter().rewrite_for_node(&node, &query).await.unwrap();

        assert_eq!(second["query"]["term"]["ta"], 12);
    }

    #[tokio::test]
    async fn test_rewrite_all_isolates_node_failures() {
        let knows = MockServer::start().await;
        mount_tag(&knows, "malware", 12).await;
        let lacks = MockServer::start().await;
        mount_missing_tags(&lacks).await;

        let nodes = vec![Arc::new(node_for(&knows)), Arc::new(node_for(&lacks))];
        let bodies = rewriter()
            .rewrite_all(&nodes, &json!({"query": {"term": {"ta": "malware"}}}))
            .await;

        let good: serde_json::Value =
            serde_json::from_str(bodies[&NodeId(knows.uri())].as_ref().unwrap()).unwrap();
        assert_eq!(good["query"]["term"]["ta"], 12);
        assert!(matches!(
            bodies[&NodeId(lacks.uri())],
            Err(GatewayError::TagNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_rewrite_without_tag_fields_makes_no_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let node = node_for(&server);

        let rewritten = rewriter()
            .rewrite_for_node(&node, &json!({"query": {"match_all": {}}}))
            .await
            .unwrap();

        assert_eq!(rewritten, json!({"query": {"match_all": {}}, "from": 0}));
    }

    // ============================================================
    // RESOLVER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_resolver_maps_facet_ids_to_names() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tags/tag/_search"))
            .and(body_partial_json(json!({"query": {"term": {"n": 5}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {"hits": [{"_id": "botnet"}]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tags/tag/_search"))
            .and(body_partial_json(json!({"query": {"term": {"n": 6}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {"hits": []}
            })))
            .mount(&server)
            .await;
        let node = node_for(&server);

        let mut result = json!({
            "hits": {"total": 0, "hits": []},
            "facets": {
                "ta": {"_type": "terms", "terms": [
                    {"term": 5, "count": 3},
                    {"term": 6, "count": 1}
                ]},
                "fp": {"_type": "terms", "terms": [{"term": 5, "count": 2}]}
            }
        });
        TagResolver::new(TagFieldSet::default())
            .resolve(&node, &mut result)
            .await;

        assert_eq!(result["facets"]["ta"]["terms"][0]["term"], "botnet");
        assert_eq!(result["facets"]["ta"]["terms"][1]["term"], 6);
        // Non-tag facets are untouched
        assert_eq!(result["facets"]["fp"]["terms"][0]["term"], 5);
    }

    #[tokio::test]
    async fn test_resolver_ignores_results_without_facets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let node = node_for(&server);

        let mut result = json!({"hits": {"total": 1, "hits": [{"_id": "a"}]}});
        let before = result.clone();
        TagResolver::new(TagFieldSet::default())
            .resolve(&node, &mut result)
            .await;

        assert_eq!(result, before);
    }
}
