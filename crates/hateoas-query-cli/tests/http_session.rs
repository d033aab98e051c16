//! HTTP transport and session tests against a mock hypermedia server.

use std::collections::BTreeMap;
use std::io::Write;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hateoas_query::{QueryError, QueryOptions, RequestDescriptor, TraversalConfig};
use hateoas_query_cli::config::CliConfig;
use hateoas_query_cli::session::QuerySession;
use hateoas_query_cli::transport::HttpRequester;
use hateoas_query_cli::types::CliError;

// ── helpers ──

async fn mount_json(server: &MockServer, verb: &str, route: &str, body: serde_json::Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> CliConfig {
    CliConfig {
        base_url: Some(format!("{}/", server.uri())),
        timeout_ms: Some(2_000),
        ..CliConfig::default()
    }
}

async fn shop(server: &MockServer) {
    mount_json(
        server,
        "GET",
        "/",
        json!({
            "name": "shop",
            "links": { "orders": { "href": "/orders" } }
        }),
    )
    .await;
    mount_json(
        server,
        "GET",
        "/orders",
        json!({ "items": [
            {
                "id": 1,
                "links": { "lines": "/orders/1/lines" },
                "actions": { "cancel": { "action": "cancel", "href": "/orders/1/cancel" } }
            },
            { "id": 2, "links": { "lines": "/orders/2/lines" } }
        ] }),
    )
    .await;
    mount_json(
        server,
        "GET",
        "/orders/1/lines",
        json!({ "items": [{ "sku": "a" }, { "sku": "b" }] }),
    )
    .await;
    mount_json(
        server,
        "GET",
        "/orders/2/lines",
        json!({ "items": [{ "sku": "c" }] }),
    )
    .await;
}

// ── transport ──

#[tokio::test]
async fn test_link_fetch_sends_accept_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9 })))
        .mount(&server)
        .await;

    let http = HttpRequester::new(Some(server.uri().as_str()), 2_000, &BTreeMap::new()).unwrap();
    let value = http.fetch(RequestDescriptor::link("/me")).await.unwrap();
    assert_eq!(value, json!({ "id": 9 }));
}

#[tokio::test]
async fn test_action_posts_params_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders/1/cancel"))
        .and(body_json(json!({ "reason": "dup" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "cancelled" })))
        .mount(&server)
        .await;

    let http = HttpRequester::new(Some(server.uri().as_str()), 2_000, &BTreeMap::new()).unwrap();
    let mut descriptor: RequestDescriptor =
        serde_json::from_value(json!({ "action": "cancel", "href": "/orders/1/cancel" })).unwrap();
    descriptor.params = Some(json!({ "reason": "dup" }));

    let value = http.fetch(descriptor).await.unwrap();
    assert_eq!(value, json!({ "status": "cancelled" }));
}

#[tokio::test]
async fn test_get_action_sends_params_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "lamp"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let http = HttpRequester::new(Some(server.uri().as_str()), 2_000, &BTreeMap::new()).unwrap();
    let mut descriptor: RequestDescriptor = serde_json::from_value(
        json!({ "action": "search", "path": "/search", "method": "get" }),
    )
    .unwrap();
    descriptor.params = Some(json!({ "q": "lamp", "page": 2 }));

    let value = http.fetch(descriptor).await.unwrap();
    assert_eq!(value, json!({ "items": [] }));
}

#[tokio::test]
async fn test_get_action_rejects_non_object_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let http = HttpRequester::new(Some(server.uri().as_str()), 2_000, &BTreeMap::new()).unwrap();
    for params in [json!(["a", "b"]), json!("lamp"), json!(3)] {
        let mut descriptor: RequestDescriptor = serde_json::from_value(
            json!({ "action": "search", "path": "/search", "method": "GET" }),
        )
        .unwrap();
        descriptor.params = Some(params);

        let err = http.fetch(descriptor).await.unwrap_err();
        assert!(matches!(err, CliError::InvalidParams(_)), "{err}");
    }
}

#[tokio::test]
async fn test_session_action_with_bad_params_exits_as_usage_error() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "GET",
        "/",
        json!({ "actions": { "search": { "action": "search", "path": "/search", "method": "GET" } } }),
    )
    .await;

    let session = QuerySession::open(&config_for(&server), Some(server.uri().as_str()), None)
        .await
        .unwrap();
    let options = QueryOptions::new().action_params(json!(["a", "b"]));
    let err = session.query("@search", &options).await.unwrap_err();
    assert_eq!(err.exit_code(), hateoas_query_cli::types::exit_codes::USAGE);
}

#[tokio::test]
async fn test_configured_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let mut headers = BTreeMap::new();
    headers.insert("Authorization".to_string(), "Bearer secret".to_string());
    let http = HttpRequester::new(Some(server.uri().as_str()), 2_000, &headers).unwrap();
    assert_eq!(http.get("/private").await.unwrap(), json!({ "ok": true }));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let http = HttpRequester::new(Some(server.uri().as_str()), 2_000, &BTreeMap::new()).unwrap();
    let err = http.get("/gone").await.unwrap_err();
    assert!(matches!(err, CliError::Status { status: 410, .. }), "{err}");
}

#[tokio::test]
async fn test_empty_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/orders/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let http = HttpRequester::new(Some(server.uri().as_str()), 2_000, &BTreeMap::new()).unwrap();
    let descriptor: RequestDescriptor =
        serde_json::from_value(json!({ "action": "delete", "path": "/orders/1", "method": "DELETE" }))
            .unwrap();
    assert_eq!(http.fetch(descriptor).await.unwrap(), serde_json::Value::Null);
}

// ── session ──

#[tokio::test]
async fn test_session_fans_out_over_links() {
    let server = MockServer::start().await;
    shop(&server).await;

    let session = QuerySession::open(&config_for(&server), Some(server.uri().as_str()), None)
        .await
        .unwrap();
    assert_eq!(session.root()["name"], json!("shop"));

    let (outcome, responses) = session
        .query("orders[].lines[].sku", &QueryOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome.to_json(false), json!(["a", "b", "c"]));
    // Fan-out over `lines[]` points each line at the order holding the link.
    assert_eq!(outcome.hits()[2].origin().unwrap()["id"], json!(2));
    // 3 responses from requests, 3 from the `sku` attribute descents.
    assert_eq!(responses.len(), 6);
}

#[tokio::test]
async fn test_session_isolated_keeps_nesting() {
    let server = MockServer::start().await;
    shop(&server).await;

    let session = QuerySession::open(&config_for(&server), Some(server.uri().as_str()), None)
        .await
        .unwrap();
    let (raw, _) = session
        .query_isolated("orders[].lines[].sku", &QueryOptions::new())
        .await
        .unwrap();
    assert_eq!(raw.to_json(false), json!([["a", "b"], ["c"]]));
}

#[tokio::test]
async fn test_session_runs_actions() {
    let server = MockServer::start().await;
    shop(&server).await;
    Mock::given(method("POST"))
        .and(path("/orders/1/cancel"))
        .and(body_json(json!({ "reason": "dup" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "cancelled" })))
        .mount(&server)
        .await;

    let session = QuerySession::open(&config_for(&server), Some(server.uri().as_str()), None)
        .await
        .unwrap();
    let options = QueryOptions::new().action_params(json!({ "reason": "dup" }));
    let (outcome, _) = session
        .query("orders[0].@cancel.status", &options)
        .await
        .unwrap();
    assert_eq!(outcome.to_json(false), json!(["cancelled"]));
}

#[tokio::test]
async fn test_session_strict_failure() {
    let server = MockServer::start().await;
    shop(&server).await;

    let mut config = config_for(&server);
    config.traversal = TraversalConfig::default().with_strict(true);
    let session = QuerySession::open(&config, Some(server.uri().as_str()), None)
        .await
        .unwrap();
    let err = session
        .query("invoices[]", &QueryOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Query(QueryError::Unresolved { .. })));
    assert!(err.to_string().contains("invoices[]"));
}

#[tokio::test]
async fn test_session_root_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "a": {{ "b": {{ "c": "value" }} }} }}"#).unwrap();

    let session = QuerySession::open(&CliConfig::default(), None, file.path().to_str())
        .await
        .unwrap();
    let (outcome, _) = session.query("a.b.c", &QueryOptions::new()).await.unwrap();
    assert_eq!(outcome.to_json(false), json!("value"));
}

#[tokio::test]
async fn test_session_without_root_or_base_fails() {
    let err = QuerySession::open(&CliConfig::default(), None, None)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, CliError::Config(_)));
}
