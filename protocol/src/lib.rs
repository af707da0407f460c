//! 国际象棋共享协议库
//!
//! 包含:
//! - 棋子、格子、棋盘等核心数据结构
//! - FEN 解析与生成
//! - 走法生成、规则验证与规则引擎
//! - 消息类型定义 (Request, Response)
//! - 传输层抽象 (Connector, Connection, Listener traits)
//! - 帧编解码

mod board;
mod constants;
mod engine;
mod error;
mod fen;
mod message;
mod moves;
mod piece;
mod transport;

pub use board::{Board, BoardState, CastlingRights};
pub use constants::*;
pub use engine::{Engine, GameStatus};
pub use error::{ChessError, ProtocolError, Result};
pub use fen::{Fen, INITIAL_FEN};
pub use message::{BoardSnapshot, PlayerId, Request, Response, RoomId};
pub use moves::{Move, MoveGenerator};
pub use piece::{Color, Piece, PieceType, Square};
pub use transport::{
    decode_frame, encode_frame, Connection, Connector, FrameReader, FrameWriter, Listener,
    NetworkConfig, TcpConnection, TcpConnector, TcpListener,
};
