use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use mav_bridge::routes::create_router;
use mav_bridge::{AppState, SessionConfig};
use mavbridge_broadcast::SubscriberRegistry;
use mavbridge_ingest::IngestState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower::ServiceExt;

fn state(source: IngestState) -> AppState {
    let (_, source_state) = watch::channel(source);
    let (_, shutdown) = watch::channel(false);
    AppState {
        registry: Arc::new(SubscriberRegistry::new()),
        source_state,
        session: SessionConfig {
            queue_capacity: 8,
            ping_interval: Duration::from_secs(20),
            ping_timeout: Duration::from_secs(20),
        },
        shutdown,
    }
}

async fn get_json(uri: &str, source: IngestState) -> (StatusCode, serde_json::Value) {
    let response = create_router(state(source))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, serde_json::from_slice(&body).expect("json"))
}

#[tokio::test]
async fn health_reports_source_state() {
    let (status, body) = get_json("/health", IngestState::AwaitingHandshake).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["ok"], true);
    assert_eq!(body["data"]["source_state"], "awaiting_handshake");
    assert_eq!(body["data"]["subscribers"], 0);
}

#[tokio::test]
async fn metrics_expose_counters() {
    let (status, body) = get_json("/metrics", IngestState::Streaming).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["messages_received"].is_u64());
    assert!(body["data"]["decode_errors"].is_u64());
}

#[tokio::test]
async fn plain_http_on_other_paths_is_rejected() {
    let response = create_router(state(IngestState::Streaming))
        .oneshot(Request::builder().uri("/stream").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert!(response.status().is_client_error());
}
