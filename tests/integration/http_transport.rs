//! HTTP transport behaviour against a mock server

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use sumi_harvest::extract::FnExtractor;
use sumi_harvest::request::{ContentType, FetchRequest, Method, RequestBuilder};
use sumi_harvest::transport::{HttpTransport, Transport, TransportError};
use sumi_harvest::Extractor;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> Arc<HttpTransport> {
    Arc::new(HttpTransport::new().expect("Failed to build HTTP client"))
}

fn builder(url: String, transport: &Arc<HttpTransport>) -> RequestBuilder {
    let extractor: Arc<dyn Extractor> = Arc::new(FnExtractor::new("none", |_| Ok(vec![])));
    FetchRequest::builder(url, extractor, transport.clone())
}

#[tokio::test]
async fn test_get_sends_params_and_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(header("x-api-key", "secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>Results</title></head></html>")
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = transport();
    let request = builder(format!("{}/search", mock_server.uri()), &transport)
        .param("q", "rust")
        .header("X-Api-Key", "secret")
        .build()
        .unwrap();

    let response = transport.fetch(&request).await.unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.title().as_deref(), Some("Results"));
    assert_eq!(
        response.headers.get("content-type").map(String::as_str),
        Some("text/html")
    );
    assert!(!response.from_cache);
}

#[tokio::test]
async fn test_post_json_body_and_json_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/items"))
        .and(body_json(json!({ "page": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [1, 2, 3] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = transport();
    let request = builder(format!("{}/api/items", mock_server.uri()), &transport)
        .method(Method::Post)
        .content_type(ContentType::Json)
        .json_body(json!({ "page": 2 }))
        .build()
        .unwrap();

    let response = transport.fetch(&request).await.unwrap();
    assert_eq!(response.json(), Some(&json!({ "items": [1, 2, 3] })));
}

#[tokio::test]
async fn test_post_form_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("user=ada"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = transport();
    let request = builder(format!("{}/login", mock_server.uri()), &transport)
        .method(Method::Post)
        .form("user", "ada")
        .build()
        .unwrap();

    let response = transport.fetch(&request).await.unwrap();
    assert_eq!(response.text, "ok");
}

#[tokio::test]
async fn test_error_status_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let transport = transport();
    let request = builder(format!("{}/missing", mock_server.uri()), &transport)
        .build()
        .unwrap();

    let error = transport.fetch(&request).await.unwrap_err();
    assert_eq!(error.status(), Some(404));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let transport = transport();
    let request = builder(format!("{}/slow", mock_server.uri()), &transport)
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let error = transport.fetch(&request).await.unwrap_err();
    assert!(matches!(error, TransportError::Timeout { .. }), "{:?}", error);
}

#[tokio::test]
async fn test_redirect_is_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&mock_server)
        .await;

    let transport = transport();
    let request = builder(format!("{}/old", mock_server.uri()), &transport)
        .build()
        .unwrap();

    let response = transport.fetch(&request).await.unwrap();
    assert_eq!(response.url.path(), "/new");
    assert_eq!(response.text, "moved");
    assert_eq!(response.request.url().path(), "/old");
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let transport = transport();
    // nothing listens on port 9 of the loopback interface
    let request = builder("http://127.0.0.1:9/".to_string(), &transport)
        .build()
        .unwrap();

    let error = transport.fetch(&request).await.unwrap_err();
    assert!(error.is_network(), "{:?}", error);
}
