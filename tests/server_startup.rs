//! Server Startup Tests
//!
//! Tests for the demo server's HTTP routes: health check and the Plivo
//! answer URL.

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tower::util::ServiceExt;

use plivo_stream::{ServerConfig, routes, state::AppState};

/// Helper function to create a minimal test configuration
fn create_minimal_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        ..Default::default()
    }
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = routes::create_app(AppState::new(create_minimal_config()));

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn test_answer_uses_host_header() {
    let app = routes::create_app(AppState::new(create_minimal_config()));

    let request = Request::builder()
        .uri("/answer")
        .header(header::HOST, "abc.ngrok.io")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/xml"
    );
    let xml = body_string(response).await;
    assert!(xml.contains(
        r#"<Stream bidirectional="true" keepCallAlive="true" contentType="audio/x-mulaw;rate=8000">ws://abc.ngrok.io/stream</Stream>"#
    ));
}

#[tokio::test]
async fn test_answer_post_uses_public_url() {
    let config = ServerConfig {
        public_url: Some("wss://voice.example.com".to_string()),
        stream_path: "/plivo".to_string(),
        audio_content_type: "audio/x-l16".to_string(),
        audio_sample_rate: 16000,
        ..create_minimal_config()
    };
    let app = routes::create_app(AppState::new(config));

    let request = Request::builder()
        .method("POST")
        .uri("/answer")
        .header(header::HOST, "internal:8080")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_string(response).await;
    assert!(xml.contains(r#"contentType="audio/x-l16;rate=16000""#));
    assert!(xml.contains(">wss://voice.example.com/plivo</Stream>"));
}

#[tokio::test]
async fn test_stream_route_requires_websocket_upgrade() {
    let app = routes::create_app(AppState::new(create_minimal_config()));

    let request = Request::builder().uri("/stream").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = routes::create_app(AppState::new(create_minimal_config()));

    let request = Request::builder().uri("/realtime").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
