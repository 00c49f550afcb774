//! MAVLink → WebSocket 桥接服务入口。

use clap::Parser;
use mav_bridge::cli::Cli;
use mav_bridge::ingest::spawn_ingest;
use mav_bridge::{AppState, SessionConfig, serve, shutdown};
use mavbridge_broadcast::{Broadcaster, SubscriberRegistry};
use mavbridge_config::BridgeConfig;
use mavbridge_ingest::{Dialect, MavlinkEndpoint};
use mavbridge_telemetry::init_tracing;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    // 环境变量 → 命令行覆盖 → 校验
    let mut config = BridgeConfig::from_env()?;
    cli.apply(&mut config);
    config.validate()?;
    let endpoint = MavlinkEndpoint::parse(&config.source_endpoint)?;
    let dialect: Dialect = config.dialect.parse()?;

    // 先绑定端口：端口被占用时直接以非零码退出
    let listener = tokio::net::TcpListener::bind(config.ws_addr()).await?;
    info!(
        addr = %config.ws_addr(),
        source = %endpoint,
        dialect = %dialect,
        "mav_bridge_listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let registry = Arc::new(SubscriberRegistry::new());
    let (ingest_task, source_state) = spawn_ingest(
        &config,
        endpoint,
        dialect,
        Broadcaster::new(Arc::clone(&registry)),
        shutdown_rx.clone(),
    );

    tokio::spawn(async move {
        shutdown::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    let state = AppState {
        registry,
        source_state,
        session: SessionConfig::from(&config),
        shutdown: shutdown_rx,
    };
    serve(listener, state).await?;
    ingest_task.await?;
    info!("mav_bridge_stopped");
    Ok(())
}
