//! 会话错误

use protocol::{ChessError, ProtocolError};
use thiserror::Error;

/// 处理客户端请求时的错误，以 `ERROR` 消息回复给请求方
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Nickname already set")]
    NicknameAlreadySet,

    #[error("Nickname required")]
    NicknameRequired,

    #[error("Not in a game")]
    NotInGame,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Chess(#[from] ChessError),
}
