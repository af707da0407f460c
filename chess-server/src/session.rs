//! 连接会话与监听循环
//!
//! 每个连接一个读任务加一个写任务：读任务解析请求并交给 [`MessageHandler`]，
//! 写任务把发送队列中的消息逐帧写出。读循环结束（对端关闭、协议错误、
//! 读取超时或被对手断线牵连）后执行断线清理。

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

use protocol::{
    Connection, FrameReader, FrameWriter, Listener, ProtocolError, Request, Response, TcpListener,
    WRITE_DRAIN_TIMEOUT,
};

use crate::config::ServerConfig;
use crate::server::{MessageHandler, ServerState, SharedState};

/// 国际象棋对局服务器
pub struct ChessServer {
    listener: TcpListener,
    state: SharedState,
    config: ServerConfig,
}

impl ChessServer {
    /// 绑定监听地址
    pub async fn bind(config: ServerConfig) -> Result<Self, ProtocolError> {
        let listener = TcpListener::bind(&config.network.addr()).await?;
        Ok(Self {
            listener,
            state: ServerState::shared(),
            config,
        })
    }

    /// 实际监听的地址（端口为 0 时由系统分配）
    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    /// 共享状态
    pub fn state(&self) -> SharedState {
        SharedState::clone(&self.state)
    }

    /// 接受连接，每个连接独立一个任务，直到进程结束
    pub async fn run(mut self) {
        tracing::info!(addr = ?self.local_addr(), "服务器开始监听");

        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let peer = conn.peer_addr().unwrap_or_default();
                    let (reader, writer) = conn.split();
                    let state = SharedState::clone(&self.state);
                    let config = self.config.clone();
                    tokio::spawn(async move {
                        tracing::debug!(%peer, "接受新连接");
                        serve_connection(state, reader, writer, &config).await;
                        tracing::debug!(%peer, "连接结束");
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept 失败");
                }
            }
        }
    }
}

/// 读取一帧请求，带可选的超时
async fn read_request<R>(
    reader: &mut FrameReader<R>,
    read_timeout: Option<Duration>,
) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin + Send,
{
    match read_timeout {
        Some(limit) => tokio::time::timeout(limit, reader.read_frame())
            .await
            .map_err(|_| ProtocolError::ConnectionTimeout)?,
        None => reader.read_frame().await,
    }
}

/// 写循环：发送队列关闭后关闭写端
async fn write_loop<W>(mut writer: FrameWriter<W>, mut rx: mpsc::Receiver<Response>)
where
    W: AsyncWrite + Unpin + Send,
{
    while let Some(msg) = rx.recv().await {
        if let Err(e) = writer.write_frame(&msg).await {
            tracing::debug!(error = %e, "写入失败");
            break;
        }
    }
    let _ = writer.shutdown().await;
}

/// 处理单个连接，从登记到清理
pub async fn serve_connection<R, W>(
    state: SharedState,
    mut reader: FrameReader<R>,
    writer: FrameWriter<W>,
    config: &ServerConfig,
) where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.outbound_buffer.max(1));
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let player_id = state.lock().await.register_connection(tx, shutdown_tx);
    let mut writer_task = tokio::spawn(write_loop(writer, rx));
    tracing::debug!(player_id, "连接已登记");

    let read_timeout = config.read_timeout();
    loop {
        let result = tokio::select! {
            _ = &mut shutdown_rx => {
                tracing::debug!(player_id, "连接被要求关闭");
                break;
            }
            result = read_request(&mut reader, read_timeout) => result,
        };

        match result {
            Ok(request) => {
                let mut state = state.lock().await;
                MessageHandler::handle(&mut state, player_id, request).await;
            }
            Err(e) if e.is_disconnect() => {
                tracing::info!(player_id, reason = %e, "连接断开");
                break;
            }
            Err(e) => {
                tracing::warn!(player_id, error = %e, "协议错误，断开连接");
                break;
            }
        }
    }

    MessageHandler::handle_disconnect(&mut *state.lock().await, player_id).await;

    // 句柄已移除，写任务发完剩余消息后退出；对端不读时到期中止
    match tokio::time::timeout(WRITE_DRAIN_TIMEOUT, &mut writer_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(player_id, error = %e, "写任务异常退出"),
        Err(_) => {
            tracing::warn!(player_id, "写任务未能按时结束，强制中止");
            writer_task.abort();
        }
    }
}
