//! 错误类型定义

use thiserror::Error;

/// 象棋规则错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// 无效的格子
    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    /// 无效的走法
    #[error("Invalid move: from {from} to {to}")]
    IllegalMove { from: String, to: String },

    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 无效的 FEN 字符串
    #[error("Invalid FEN string: {reason}")]
    InvalidFen { reason: String },

    /// 游戏已结束
    #[error("Game is already over")]
    GameOver,
}

impl ChessError {
    pub(crate) fn invalid_fen(reason: impl Into<String>) -> Self {
        ChessError::InvalidFen {
            reason: reason.into(),
        }
    }
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭（包括读到一半对端关闭）
    #[error("Connection closed")]
    ConnectionClosed,

    /// 昵称为空
    #[error("Nickname is empty")]
    NicknameEmpty,

    /// 昵称过长
    #[error("Nickname too long: {len} chars (max: {max})")]
    NicknameTooLong { len: usize, max: usize },

    /// 象棋规则错误
    #[error("Chess error: {0}")]
    Chess(#[from] ChessError),
}

impl ProtocolError {
    /// 是否属于正常断开（对端关闭或短读）
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtocolError::ConnectionClosed | ProtocolError::ConnectionTimeout => true,
            ProtocolError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
