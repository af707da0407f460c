//! 消息类型定义
//!
//! 线上格式为 `{"kind": ..., "data": ...}`，`kind` 决定 `data` 的形状，
//! 在反序列化边界一次性校验（例如格子编号超出 0..64 会直接解码失败）。

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::moves::Move;
use crate::piece::{Color, Piece, PieceType, Square};

/// 玩家 ID（连接标识）
pub type PlayerId = u64;

/// 房间 ID
pub type RoomId = u64;

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// 设置昵称（每个连接只能设置一次）
    Nickname(String),
    /// 尝试走子
    TryMove {
        from: Square,
        to: Square,
        /// 升变棋子，缺省为后
        #[serde(default, skip_serializing_if = "Option::is_none")]
        promotion: Option<PieceType>,
    },
    /// 查询某格棋子的合法目标格
    GetLegalMoves(Square),
    /// 查询完整棋盘
    GetBoardState,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    /// 昵称已接受
    Nickname(String),
    /// 对手昵称
    Opponent(String),
    /// 对局开始
    Start,
    /// 自己的走子已执行
    DoneMove(Move),
    /// 对手走了一步
    OpponentMove(Move),
    /// 合法目标格
    LegalMoves(Vec<Square>),
    /// 完整棋盘
    BoardState(BoardSnapshot),
    /// 错误说明
    Error(String),
    /// 对局结束，`None` 表示逼和
    Winner(Option<Color>),
    /// 对手离开
    OpponentLeft,
    /// 分配的阵营
    Color(Color),
}

impl Response {
    /// 构造错误消息
    pub fn error(message: impl ToString) -> Self {
        Response::Error(message.to_string())
    }
}

/// 棋盘快照：64 个格子 + 当前局面 FEN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub pieces: Vec<Piece>,
    pub fen: String,
}

impl BoardSnapshot {
    pub fn from_engine(engine: &Engine) -> Self {
        Self {
            pieces: engine.squares().to_vec(),
            fen: engine.to_fen(),
        }
    }
}
