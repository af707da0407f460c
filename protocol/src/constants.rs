//! 协议常量定义

use std::time::Duration;

/// 棋盘边长（行数 = 列数）
pub const BOARD_SIZE: usize = 8;

/// 棋盘格子总数
pub const SQUARE_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// 昵称最大长度
pub const MAX_NICKNAME_LEN: usize = 20;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 帧头大小：4 字节长度（大端序）
pub const FRAME_HEADER_SIZE: usize = 4;

/// 默认服务端口
pub const DEFAULT_PORT: u16 = 12397;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 服务端读取超时（秒）- 超过此时间无消息则断开
pub const READ_TIMEOUT_SECS: u64 = 300;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 读取超时 Duration
pub const READ_TIMEOUT: Duration = Duration::from_secs(READ_TIMEOUT_SECS);

/// 断线清理后等待写任务发完剩余消息的时限
pub const WRITE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
