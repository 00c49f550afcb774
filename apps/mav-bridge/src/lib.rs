//! MAVLink → WebSocket 桥接服务的装配层。

pub mod cli;
pub mod handlers;
pub mod ingest;
pub mod routes;
pub mod session;
pub mod shutdown;

use mavbridge_broadcast::SubscriberRegistry;
use mavbridge_config::BridgeConfig;
use mavbridge_ingest::IngestState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// 订阅者会话参数。
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub queue_capacity: usize,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
}

impl From<&BridgeConfig> for SessionConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            queue_capacity: config.subscriber_queue,
            ping_interval: config.ping_interval(),
            ping_timeout: config.ping_timeout(),
        }
    }
}

/// 各 handler 共享的状态。
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SubscriberRegistry>,
    pub source_state: watch::Receiver<IngestState>,
    pub session: SessionConfig,
    pub shutdown: watch::Receiver<bool>,
}

/// 在已绑定的监听器上运行 HTTP/WebSocket 服务，直到收到关闭信号。
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let mut shutdown = state.shutdown.clone();
    let app = routes::create_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown::wait_for_shutdown(&mut shutdown).await })
    .await
}
