//! End-to-end retrieval against mocked catalog pages.

use assert_json_diff::assert_json_include;
use partscout_runtime::acquisition::http_client::HttpClient;
use partscout_runtime::acquisition::static_fetch::StaticFetcher;
use partscout_runtime::acquisition::strategy::FetchStrategy;
use partscout_runtime::config::{HttpConfig, LlmConfig, SearchConfig};
use partscout_runtime::{
    CatalogSearch, QueryEnhancer, SearchError, SearchMethod, SearchOrchestrator, SourceCatalog,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZORO_PAGE: &str = r#"<html><body>
    <div class="product-tile">
        <h3 class="product-title">Deep Groove Ball Bearing</h3>
        <span class="mfr-number">6203-2RS</span>
        <span class="product-price">$4.10</span>
        <span class="availability">Ships today</span>
    </div>
    <div class="product-tile">
        <h3 class="product-title">Ball Bearing, Open</h3>
        <span class="mfr-number">6203</span>
        <span class="product-price">$2.75</span>
        <span class="availability">In stock</span>
    </div>
</body></html>"#;

const MOTION_PAGE: &str = r#"<html><body>
    <div class="product-result">
        <a class="product-result__title" href="/products/sku/123">deep groove
            ball bearing</a>
        <span class="mi-item-number">6203-2RS</span>
        <span class="product-result__price">$3.95</span>
        <span class="product-result__stock">Out of stock</span>
    </div>
    <div class="product-result">
        <a class="product-result__title" href="/products/sku/456">Sealed Ball Bearing</a>
        <span class="mi-item-number">6203-ZZ</span>
        <span class="product-result__price">Call for price</span>
        <span class="product-result__stock">Backordered</span>
    </div>
</body></html>"#;

const EMPTY_PAGE: &str = "<html><body><p>No results found</p></body></html>";

/// zoro and motion profiles, both pointed at the mock server.
fn catalog_at(base: &str) -> Arc<SourceCatalog> {
    let builtin = SourceCatalog::builtin().unwrap();
    let sources = ["zoro", "motion"]
        .iter()
        .map(|id| {
            let mut profile = builtin.get(id).unwrap().clone();
            profile.base_url = base.to_string();
            profile
        })
        .collect();
    Arc::new(SourceCatalog::new(sources).unwrap())
}

fn static_search(server: &MockServer) -> CatalogSearch {
    let http = HttpClient::new(&HttpConfig::default()).unwrap();
    CatalogSearch::new(
        catalog_at(&server.uri()),
        FetchStrategy::new(Arc::new(StaticFetcher::new(http)), None),
    )
}

fn rules_only() -> SearchOrchestrator {
    SearchOrchestrator::new(QueryEnhancer::rules_only(), SearchConfig::default())
}

async fn mount_page(server: &MockServer, route: &str, query: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("q", query))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_empty_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_part_number_search_merges_sources() {
    let server = MockServer::start().await;
    mount_page(&server, "/search", "6203 bearing", ZORO_PAGE).await;
    mount_page(&server, "/products/search", "6203 bearing", MOTION_PAGE).await;
    mount_empty_fallback(&server).await;

    let backend = static_search(&server);
    let outcome = rules_only()
        .smart_search("6203", 10, &backend)
        .await
        .unwrap();

    // motion's 6203-2RS duplicates zoro's and is dropped
    assert_eq!(outcome.results.len(), 3);

    let value = serde_json::to_value(&outcome).unwrap();
    assert_json_include!(
        actual: value,
        expected: json!({
            "query": "6203 bearing",
            "originalQuery": "6203",
            "method": "ruleBased",
            "results": [
                {
                    "partNumber": "6203-2RS",
                    "name": "Deep Groove Ball Bearing",
                    "numericPrice": 4.1,
                    "availability": "InStock",
                    "sourceId": "zoro",
                    "productUrl": ""
                },
                {
                    "partNumber": "6203",
                    "numericPrice": 2.75,
                    "sourceId": "zoro"
                },
                {
                    "partNumber": "6203-ZZ",
                    "numericPrice": null,
                    "priceText": "Call for price",
                    "availability": "OutOfStock",
                    "sourceId": "motion",
                    "productUrl": format!("{}/products/sku/456", server.uri())
                }
            ]
        })
    );
    assert!(outcome.results[0].confidence >= outcome.results[2].confidence);
}

#[tokio::test]
async fn test_cascade_moves_to_suggestion() {
    let server = MockServer::start().await;
    mount_page(&server, "/search", "6203 ball bearing", ZORO_PAGE).await;
    mount_empty_fallback(&server).await;

    let backend = static_search(&server);
    let outcome = rules_only()
        .smart_search("6203", 10, &backend)
        .await
        .unwrap();

    assert_eq!(outcome.method, SearchMethod::Suggestion);
    assert_eq!(outcome.query, "6203 ball bearing");
    assert_eq!(outcome.results.len(), 2);
}

#[tokio::test]
async fn test_failing_source_does_not_sink_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_page(&server, "/search", "6203 bearing", ZORO_PAGE).await;

    let backend = static_search(&server);
    let (listings, reports) = backend.search_with_report("6203 bearing", 10).await;

    assert_eq!(listings.len(), 2);
    assert!(listings.iter().all(|l| l.source_id == "zoro"));

    let reports = serde_json::to_value(&reports).unwrap();
    assert_json_include!(
        actual: reports,
        expected: json!([
            {"sourceId": "zoro", "strategy": "static", "records": 2, "error": null},
            {"sourceId": "motion", "strategy": "none", "records": 0}
        ])
    );
}

#[tokio::test]
async fn test_nothing_anywhere_is_empty_outcome() {
    let server = MockServer::start().await;
    mount_empty_fallback(&server).await;

    let backend = static_search(&server);
    let outcome = rules_only()
        .smart_search("6203", 5, &backend)
        .await
        .unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.method, SearchMethod::Original);
    assert_eq!(outcome.query, "6203");
}

#[tokio::test]
async fn test_short_query_touches_no_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ZORO_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let backend = static_search(&server);
    let err = rules_only().smart_search("6", 10, &backend).await.unwrap_err();
    assert_eq!(err, SearchError::QueryTooShort { min: 2 });
}

fn llm_config(server: &MockServer) -> LlmConfig {
    LlmConfig {
        api_key: Some("sk-test".into()),
        endpoint: format!("{}/v1/chat/completions", server.uri()),
        timeout_ms: 2_000,
        ..LlmConfig::default()
    }
}

#[tokio::test]
async fn test_llm_rewrite_feeds_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content":
                "{\"enhancedQuery\": \"6203 bearing\", \"alternatives\": [], \"confidence\": 0.75, \"reasoning\": \"\"}"
            }}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/search", "6203 bearing", ZORO_PAGE).await;
    mount_empty_fallback(&server).await;

    let orchestrator = SearchOrchestrator::new(
        QueryEnhancer::from_config(&llm_config(&server)),
        SearchConfig::default(),
    );
    let outcome = orchestrator
        .smart_search("spinny round thing for a motor shaft", 10, &static_search(&server))
        .await
        .unwrap();

    assert_eq!(outcome.method, SearchMethod::Llm);
    assert_eq!(outcome.query, "6203 bearing");
    assert!((outcome.confidence - 0.75).abs() < 1e-6);
}

#[tokio::test]
async fn test_rule_hit_never_calls_llm() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let enhancer = QueryEnhancer::from_config(&llm_config(&server));
    assert!(enhancer.has_llm());

    let e = enhancer.enhance("6203").await;
    assert!(e.enhanced_query.ends_with("bearing"));
    assert!(e.confidence >= 0.7);
}

#[tokio::test]
async fn test_llm_outage_degrades_to_original_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let e = QueryEnhancer::from_config(&llm_config(&server))
        .enhance("spinny round thing")
        .await;
    assert_json_include!(
        actual: serde_json::to_value(&e).unwrap(),
        expected: json!({
            "originalQuery": "spinny round thing",
            "enhancedQuery": "spinny round thing",
            "suggestions": [],
            "method": "errorFallback"
        })
    );
}
