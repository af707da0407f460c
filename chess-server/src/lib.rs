//! 国际象棋对局服务端
//!
//! 包含:
//! - 配置加载
//! - 玩家管理与配对
//! - 房间系统
//! - 消息分发与断线清理
//! - TCP 监听与连接会话

pub mod config;
pub mod error;
pub mod player;
pub mod room;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use error::ServerError;
pub use player::{Player, PlayerManager, PlayerStatus};
pub use room::{Room, RoomManager, RoomState};
pub use server::{MessageHandler, ServerState, SharedState};
pub use session::{serve_connection, ChessServer};
