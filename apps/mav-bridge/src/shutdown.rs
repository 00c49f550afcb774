use tokio::sync::watch;
use tracing::{info, warn};

/// 等待 ctrl-c。
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl_c_handler_unavailable");
        std::future::pending::<()>().await;
    }
    info!("shutdown_requested");
}

/// 等待关闭信号变为 `true`；发送端被丢弃也视为关闭。
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
