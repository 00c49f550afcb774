//! 路由定义
//!
//! - 健康检查：/health
//! - 计数指标：/metrics
//! - 其余任意路径：WebSocket 订阅

use crate::AppState;
use crate::handlers::{get_metrics, health, subscribe};
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .fallback(subscribe)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
