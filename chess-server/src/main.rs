use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chess_server::{ChessServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("chess_server=debug".parse()?))
        .init();

    info!("国际象棋服务端启动中...");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref());

    let server = ChessServer::bind(config).await?;
    info!("监听地址: {}", server.local_addr().unwrap_or_default());

    tokio::select! {
        _ = server.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("收到退出信号，服务端关闭");
        }
    }

    Ok(())
}
