//! FEN 格式解析和生成
//!
//! 国际象棋 FEN 格式（6 个字段，空白分隔）：
//! `<棋盘> <走子方> <易位权> <吃过路兵目标> <半回合计数> <回合数>`
//!
//! 示例：
//! `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1`

use crate::board::{Board, BoardState, CastlingRights};
use crate::constants::BOARD_SIZE;
use crate::error::ChessError;
use crate::piece::{Color, Piece, Square};

/// 初始局面 FEN
pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// FEN 格式处理
pub struct Fen;

impl Fen {
    /// 解析 FEN 字符串为棋盘状态
    pub fn parse(fen: &str) -> Result<BoardState, ChessError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        let [placement, active, castling, en_passant, half_move, full_move] = parts[..] else {
            return Err(ChessError::invalid_fen(format!(
                "Expected 6 fields, got {}",
                parts.len()
            )));
        };

        let board = Self::parse_board(placement)?;

        let mut chars = active.chars();
        let active_color = match (chars.next().and_then(Color::from_fen_char), chars.next()) {
            (Some(color), None) => color,
            _ => {
                return Err(ChessError::invalid_fen(format!(
                    "Invalid active color: {}",
                    active
                )))
            }
        };

        let castling = Self::parse_castling(castling)?;

        let en_passant_target = match en_passant {
            "-" => None,
            coord => Some(Square::from_algebraic(coord).map_err(|_| {
                ChessError::invalid_fen(format!("Invalid en passant target: {}", coord))
            })?),
        };

        let half_move_clock = half_move.parse().map_err(|_| {
            ChessError::invalid_fen(format!("Invalid halfmove clock: {}", half_move))
        })?;
        let full_move_number = full_move.parse().map_err(|_| {
            ChessError::invalid_fen(format!("Invalid fullmove number: {}", full_move))
        })?;

        Ok(BoardState {
            board,
            active_color,
            castling,
            en_passant_target,
            half_move_clock,
            full_move_number,
        })
    }

    /// 解析棋盘部分
    fn parse_board(board_str: &str) -> Result<Board, ChessError> {
        let mut board = Board::empty();
        let rows: Vec<&str> = board_str.split('/').collect();

        if rows.len() != BOARD_SIZE {
            return Err(ChessError::invalid_fen(format!(
                "Expected 8 ranks, got {}",
                rows.len()
            )));
        }

        // FEN 从第 8 横排写到第 1 横排，正好对应 row 0..8
        for (row_idx, row) in rows.iter().enumerate() {
            let mut col = 0u8;

            for c in row.chars() {
                if col as usize >= BOARD_SIZE {
                    return Err(ChessError::invalid_fen(format!(
                        "Rank {} has too many files",
                        BOARD_SIZE - row_idx
                    )));
                }

                if let Some(empty_count) = c.to_digit(10) {
                    if empty_count == 0 {
                        return Err(ChessError::invalid_fen("Zero empty-square count"));
                    }
                    col += empty_count as u8;
                } else {
                    let square = Square::from_row_col(row_idx as u8, col).ok_or_else(|| {
                        ChessError::invalid_fen(format!("Square out of range in rank {}", row))
                    })?;
                    let piece = Piece::from_fen_char(c, square).ok_or_else(|| {
                        ChessError::invalid_fen(format!("Invalid piece character: {}", c))
                    })?;
                    board.set(square, piece);
                    col += 1;
                }
            }

            if col as usize != BOARD_SIZE {
                return Err(ChessError::invalid_fen(format!(
                    "Rank {} has {} files, expected 8",
                    BOARD_SIZE - row_idx,
                    col
                )));
            }
        }

        Ok(board)
    }

    /// 解析易位权字段
    fn parse_castling(field: &str) -> Result<CastlingRights, ChessError> {
        let mut rights = CastlingRights::none();
        if field == "-" {
            return Ok(rights);
        }
        for c in field.chars() {
            match c {
                'K' => rights.white_king_side = true,
                'Q' => rights.white_queen_side = true,
                'k' => rights.black_king_side = true,
                'q' => rights.black_queen_side = true,
                other => {
                    return Err(ChessError::invalid_fen(format!(
                        "Invalid castling character: {}",
                        other
                    )))
                }
            }
        }
        Ok(rights)
    }

    /// 将棋盘状态转换为 FEN 字符串
    pub fn to_string(state: &BoardState) -> String {
        format!(
            "{} {} {} {} {} {}",
            Self::board_to_string(&state.board),
            state.active_color.to_fen_char(),
            Self::castling_to_string(&state.castling),
            state
                .en_passant_target
                .map(|s| s.to_algebraic())
                .unwrap_or_else(|| "-".to_string()),
            state.half_move_clock,
            state.full_move_number
        )
    }

    /// 将棋盘转换为 FEN 棋盘部分
    pub fn board_to_string(board: &Board) -> String {
        board
            .squares()
            .chunks(BOARD_SIZE)
            .map(|rank| {
                let mut row = String::new();
                let mut empty_count = 0;

                for piece in rank {
                    match piece.to_fen_char() {
                        Some(c) => {
                            if empty_count > 0 {
                                row.push_str(&empty_count.to_string());
                                empty_count = 0;
                            }
                            row.push(c);
                        }
                        None => empty_count += 1,
                    }
                }

                if empty_count > 0 {
                    row.push_str(&empty_count.to_string());
                }
                row
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    fn castling_to_string(rights: &CastlingRights) -> String {
        if rights.is_empty() {
            return "-".to_string();
        }
        let mut s = String::with_capacity(4);
        if rights.white_king_side {
            s.push('K');
        }
        if rights.white_queen_side {
            s.push('Q');
        }
        if rights.black_king_side {
            s.push('k');
        }
        if rights.black_queen_side {
            s.push('q');
        }
        s
    }
}
