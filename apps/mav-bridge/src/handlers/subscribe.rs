use crate::AppState;
use crate::session::run_session;
use axum::{
    extract::{ConnectInfo, State, WebSocketUpgrade},
    response::Response,
};
use std::net::SocketAddr;

/// 任意路径的 WebSocket 升级；路径本身不参与路由。
pub async fn subscribe(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    ws: WebSocketUpgrade,
) -> Response {
    let peer = connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    ws.on_upgrade(move |socket| run_session(socket, state, peer))
}
