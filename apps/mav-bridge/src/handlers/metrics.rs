//! 计数指标快照。
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mavbridge_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            messages_received: snapshot.messages_received,
            records_translated: snapshot.records_translated,
            payloads_encoded: snapshot.payloads_encoded,
            broadcasts_skipped: snapshot.broadcasts_skipped,
            deliveries: snapshot.deliveries,
            delivery_failures: snapshot.delivery_failures,
            subscribers_connected: snapshot.subscribers_connected,
            subscribers_disconnected: snapshot.subscribers_disconnected,
            subscribers_pruned: snapshot.subscribers_pruned,
            source_connects: snapshot.source_connects,
            source_disconnects: snapshot.source_disconnects,
            handshake_timeouts: snapshot.handshake_timeouts,
            decode_errors: snapshot.decode_errors,
        })),
    )
        .into_response()
}
