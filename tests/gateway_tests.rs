//! End-to-end tests for the gateway router.
//!
//! These tests use wiremock as the upstream and drive the router with
//! `tower::ServiceExt::oneshot`, so no listener is bound for the gateway itself.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use codex_gateway::{
    api::{router, upstream::build_http_client, AppState, ForwardEngine},
    core::{Credential, ModelMapper},
};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const TOKEN: &str = "sk-upstream-secret-token-0123456789";

fn engine_for(base: &str, timeout: Duration) -> ForwardEngine {
    let client = build_http_client(true).expect("Failed to build HTTP client");
    ForwardEngine::new(
        client,
        format!("{}/responses", base),
        Arc::new(Credential::new(TOKEN, "$.tokens.access_token")),
        timeout,
    )
}

/// Create a test app talking to the mock upstream
fn create_test_app(mock_server: &MockServer) -> Router {
    create_test_app_with_timeout(mock_server, Duration::from_secs(30))
}

fn create_test_app_with_timeout(mock_server: &MockServer, timeout: Duration) -> Router {
    let engine = engine_for(&mock_server.uri(), timeout);
    router(Arc::new(AppState::new(
        engine,
        ModelMapper::default(),
        CancellationToken::new(),
    )))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_body(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_chat_completions_rewritten_and_forwarded() {
    let mock_server = MockServer::start().await;
    let upstream_body = r#"{"id":"resp_1","output":[{"type":"message","content":"hi"}]}"#;

    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .and(header("accept", "application/json"))
        .and(body_json(json!({
            "model": "codex-gpt-4.1",
            "input": [{"role": "user", "content": "hello"}],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(upstream_body, "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({
                "model": "gpt-4.1",
                "messages": [{"role": "user", "content": "hello"}],
                "stream": false
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(read_body(response).await, upstream_body.as_bytes());
}

#[tokio::test]
async fn test_responses_route_passes_unknown_fields_through() {
    let mock_server = MockServer::start().await;
    let request = json!({
        "model": "my-private-model",
        "input": [{"role": "user", "content": [{"type": "input_text", "text": "hi"}]}],
        "reasoning": {"effort": "high"},
        "x-client-extension": [1, 2, 3]
    });

    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(body_json(request.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&mock_server)
        .await;

    for uri in ["/v1/responses", "/responses"] {
        let app = create_test_app(&mock_server);
        let response = app.oneshot(post_json(uri, request.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "route {}", uri);
    }
}

#[tokio::test]
async fn test_request_id_is_inherited_and_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(header("x-request-id", "caller-trace-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let mut request = post_json("/chat/completions", json!({"messages": []}));
    request
        .headers_mut()
        .insert("x-request-id", "caller-trace-7".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "caller-trace-7"
    );
}

#[tokio::test]
async fn test_invalid_json_is_rejected_before_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    for body in ["{not json", "[1, 2, 3]", "\"just a string\""] {
        let app = create_test_app(&mock_server);
        let request = Request::builder()
            .method("POST")
            .uri("/v1/chat/completions")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json: Value = serde_json::from_slice(&read_body(response).await).unwrap();
        assert_eq!(json["error"]["type"], "invalid_request_error");
    }
}

#[tokio::test]
async fn test_upstream_error_passthrough() {
    let mock_server = MockServer::start().await;
    let error_body = r#"{"error":{"message":"Rate limit reached","code":"rate_limited"}}"#;

    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(
            ResponseTemplate::new(429).set_body_raw(error_body, "application/json; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(post_json("/v1/responses", json!({"model": "o3", "input": "x"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json; charset=utf-8"
    );
    assert_eq!(read_body(response).await, error_body.as_bytes());
}

#[tokio::test]
async fn test_upstream_empty_error_is_synthesized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(post_json("/v1/responses", json!({"input": "x"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(json["error"]["type"], "upstream_error");
}

#[tokio::test]
async fn test_upstream_timeout_returns_504() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"late": true}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_timeout(&mock_server, Duration::from_millis(200));
    let started = std::time::Instant::now();
    let response = app
        .oneshot(post_json("/v1/responses", json!({"input": "x"})))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(json["error"]["type"], "upstream_connection_error");
}

#[tokio::test]
async fn test_unreachable_upstream_returns_502_without_token() {
    // Grab a free port and release it so nothing is listening there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let engine = engine_for(&format!("http://127.0.0.1:{}", port), Duration::from_secs(5));
    let app = router(Arc::new(AppState::new(
        engine,
        ModelMapper::default(),
        CancellationToken::new(),
    )));

    let response = app
        .oneshot(post_json("/v1/chat/completions", json!({"messages": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = read_body(response).await;
    let text = String::from_utf8_lossy(&body);
    assert!(!text.contains(TOKEN));

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["type"], "upstream_connection_error");
}

#[tokio::test]
async fn test_streaming_relays_bytes_verbatim() {
    let mock_server = MockServer::start().await;
    let sse = concat!(
        "event: response.created\n",
        "data: {\"type\":\"response.created\"}\n\n",
        "event: response.output_text.delta\n",
        "data: {\"delta\":\"Hel\"}\n\n",
        "event: response.output_text.delta\n",
        "data: {\"delta\":\"lo\"}\n\n",
        "data: [DONE]\n\n"
    );

    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(post_json(
            "/v1/responses",
            json!({"model": "gpt-5", "input": "hi", "stream": true}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(read_body(response).await, sse.as_bytes());
}

#[tokio::test]
async fn test_streaming_slow_consumer_receives_every_byte_in_order() {
    let mock_server = MockServer::start().await;
    let sse: String = (0..1500)
        .map(|i| format!("data: {{\"delta\":\"token-{:05}\"}}\n\n", i))
        .collect();
    assert!(sse.len() > 4 * codex_gateway::api::RELAY_CHUNK_SIZE);

    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse.clone(), "text/event-stream"))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(post_json("/v1/responses", json!({"stream": true})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    let mut received = Vec::new();
    while let Some(frame) = body.next().await {
        received.extend_from_slice(&frame.unwrap());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(received, sse.as_bytes());
}

#[tokio::test]
async fn test_streaming_forces_event_stream_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("data: x\n\n", "text/plain"))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(post_json("/v1/responses", json!({"stream": true})))
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(read_body(response).await, b"data: x\n\n");
}

#[tokio::test]
async fn test_streaming_error_status_is_buffered() {
    let mock_server = MockServer::start().await;
    let error_body = r#"{"error":{"message":"invalid token"}}"#;

    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(ResponseTemplate::new(401).set_body_raw(error_body, "application/json"))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(post_json("/v1/responses", json!({"stream": true})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(read_body(response).await, error_body.as_bytes());
}

#[tokio::test]
async fn test_streaming_is_not_bound_by_request_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/responses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: slow\n\n", "text/event-stream")
                .set_delay(Duration::from_millis(600)),
        )
        .mount(&mock_server)
        .await;

    let app = create_test_app_with_timeout(&mock_server, Duration::from_millis(100));
    let response = app
        .oneshot(post_json("/v1/responses", json!({"stream": true})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await, b"data: slow\n\n");
}

#[tokio::test]
async fn test_list_models_and_health() {
    let mock_server = MockServer::start().await;

    for uri in ["/v1/models", "/models"] {
        let app = create_test_app(&mock_server);
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: Value = serde_json::from_slice(&read_body(response).await).unwrap();
        assert_eq!(json["object"], "list");
        let ids: Vec<&str> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|m| m["id"].as_str())
            .collect();
        assert!(ids.contains(&"gpt-4.1"));
        assert!(ids.contains(&"o3"));
    }

    let app = create_test_app(&mock_server);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(json, json!({"status": "ok"}));
}
