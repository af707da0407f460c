//! 棋盘状态

use serde::{Deserialize, Serialize};

use crate::constants::SQUARE_COUNT;
use crate::piece::{Color, Piece, PieceType, Square};

/// 底线棋子排列（a 线到 h 线）
const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// 8x8 棋盘，索引为 row * 8 + col（row 0 为第 8 横排），使用 Vec 以支持 serde
    squares: Vec<Piece>,
}

impl Board {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            squares: Square::all().map(Piece::empty).collect(),
        }
    }

    /// 创建初始棋盘
    pub fn initial() -> Self {
        let mut board = Self::empty();

        for (col, piece_type) in BACK_RANK.iter().enumerate() {
            let col = col as u8;
            board.place(Square::new_unchecked(col), *piece_type, Color::Black);
            board.place(Square::new_unchecked(8 + col), PieceType::Pawn, Color::Black);
            board.place(Square::new_unchecked(48 + col), PieceType::Pawn, Color::White);
            board.place(Square::new_unchecked(56 + col), *piece_type, Color::White);
        }

        board
    }

    /// 从 64 个棋子列表创建，棋子的 `square` 字段以所在位置为准
    pub fn from_pieces(pieces: &[Piece]) -> Option<Self> {
        if pieces.len() != SQUARE_COUNT {
            return None;
        }
        let squares = pieces
            .iter()
            .zip(Square::all())
            .map(|(piece, square)| Piece { square, ..*piece })
            .collect();
        Some(Self { squares })
    }

    /// 获取指定格子的棋子
    pub fn get(&self, square: Square) -> Piece {
        self.squares[square.index()]
    }

    /// 设置指定格子的棋子
    pub fn set(&mut self, square: Square, piece: Piece) {
        self.squares[square.index()] = Piece { square, ..piece };
    }

    /// 放置棋子
    pub fn place(&mut self, square: Square, piece_type: PieceType, color: Color) {
        self.set(square, Piece::new(piece_type, color, square));
    }

    /// 清空格子
    pub fn clear(&mut self, square: Square) {
        self.squares[square.index()] = Piece::empty(square);
    }

    /// 检查格子是否为空
    pub fn is_empty(&self, square: Square) -> bool {
        self.get(square).is_empty()
    }

    /// 移动棋子（不检查规则），返回目标格原有的棋子
    pub fn move_piece(&mut self, from: Square, to: Square) -> Piece {
        let piece = self.get(from);
        let captured = self.get(to);
        self.clear(from);
        self.set(to, piece);
        captured
    }

    /// 查找指定阵营的王
    pub fn find_king(&self, color: Color) -> Option<Square> {
        self.squares
            .iter()
            .find(|p| p.piece_type == PieceType::King && p.color == color)
            .map(|p| p.square)
    }

    /// 获取指定阵营的所有棋子
    pub fn pieces(&self, color: Color) -> Vec<Piece> {
        self.squares
            .iter()
            .filter(|p| p.is_color(color))
            .copied()
            .collect()
    }

    /// 全部 64 个格子（用于渲染和快照）
    pub fn squares(&self) -> &[Piece] {
        &self.squares
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

/// 王车易位权利
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white_king_side: bool,
    pub white_queen_side: bool,
    pub black_king_side: bool,
    pub black_queen_side: bool,
}

impl CastlingRights {
    /// 四项权利全部保留
    pub fn all() -> Self {
        Self {
            white_king_side: true,
            white_queen_side: true,
            black_king_side: true,
            black_queen_side: true,
        }
    }

    /// 无任何权利
    pub fn none() -> Self {
        Self::default()
    }

    /// 查询指定阵营、指定方向的权利
    pub fn get(&self, color: Color, king_side: bool) -> bool {
        match (color, king_side) {
            (Color::White, true) => self.white_king_side,
            (Color::White, false) => self.white_queen_side,
            (Color::Black, true) => self.black_king_side,
            (Color::Black, false) => self.black_queen_side,
            (Color::Empty, _) => false,
        }
    }

    /// 清除指定阵营的全部权利
    pub fn clear_color(&mut self, color: Color) {
        match color {
            Color::White => {
                self.white_king_side = false;
                self.white_queen_side = false;
            }
            Color::Black => {
                self.black_king_side = false;
                self.black_queen_side = false;
            }
            Color::Empty => {}
        }
    }

    /// 车离开（或在）原始角格时清除对应权利
    pub fn clear_for_corner(&mut self, square: Square) {
        match square.index() {
            63 => self.white_king_side = false,
            56 => self.white_queen_side = false,
            7 => self.black_king_side = false,
            0 => self.black_queen_side = false,
            _ => {}
        }
    }

    /// 是否一项权利都没有
    pub fn is_empty(&self) -> bool {
        *self == Self::none()
    }
}

/// 完整的棋盘状态（包含走子方、易位权、吃过路兵目标与步数）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    /// 棋盘
    pub board: Board,
    /// 当前走子方
    pub active_color: Color,
    /// 王车易位权利
    pub castling: CastlingRights,
    /// 吃过路兵目标格（仅在双步兵之后的一步内有效）
    pub en_passant_target: Option<Square>,
    /// 半回合计数（自上次兵的移动或吃子以来的步数）
    pub half_move_clock: u32,
    /// 完整回合数（黑方走完后 +1）
    pub full_move_number: u32,
}

impl BoardState {
    /// 创建初始状态
    pub fn initial() -> Self {
        Self {
            board: Board::initial(),
            active_color: Color::White,
            castling: CastlingRights::all(),
            en_passant_target: None,
            half_move_clock: 0,
            full_move_number: 1,
        }
    }

    /// 切换走子方（黑方走完后回合数 +1）
    pub fn switch_turn(&mut self) {
        if self.active_color == Color::Black {
            self.full_move_number = self.full_move_number.saturating_add(1);
        }
        self.active_color = self.active_color.opponent();
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    #[test]
    fn test_initial_board() {
        let board = Board::initial();

        let king = board.get(sq("e1"));
        assert_eq!(king.piece_type, PieceType::King);
        assert_eq!(king.color, Color::White);

        let queen = board.get(sq("d8"));
        assert_eq!(queen.piece_type, PieceType::Queen);
        assert_eq!(queen.color, Color::Black);

        assert_eq!(board.get(sq("a2")).piece_type, PieceType::Pawn);
        assert!(board.is_empty(sq("e4")));
        assert_eq!(board.pieces(Color::White).len(), 16);
        assert_eq!(board.pieces(Color::Black).len(), 16);
    }

    #[test]
    fn test_every_square_holds_a_piece_value() {
        let board = Board::initial();
        assert_eq!(board.squares().len(), SQUARE_COUNT);
        for (i, piece) in board.squares().iter().enumerate() {
            assert_eq!(piece.square.index(), i);
        }
    }

    #[test]
    fn test_move_piece() {
        let mut board = Board::initial();

        let captured = board.move_piece(sq("g1"), sq("f3"));
        assert!(captured.is_empty());
        assert!(board.is_empty(sq("g1")));

        let knight = board.get(sq("f3"));
        assert_eq!(knight.piece_type, PieceType::Knight);
        assert_eq!(knight.square, sq("f3"));
    }

    #[test]
    fn test_find_king() {
        let board = Board::initial();
        assert_eq!(board.find_king(Color::White), Some(sq("e1")));
        assert_eq!(board.find_king(Color::Black), Some(sq("e8")));
        assert_eq!(Board::empty().find_king(Color::White), None);
    }

    #[test]
    fn test_castling_rights_corners() {
        let mut rights = CastlingRights::all();
        rights.clear_for_corner(sq("h1"));
        assert!(!rights.white_king_side);
        assert!(rights.white_queen_side);

        rights.clear_color(Color::Black);
        assert!(!rights.get(Color::Black, true));
        assert!(!rights.get(Color::Black, false));
        assert!(rights.get(Color::White, false));
    }

    #[test]
    fn test_switch_turn_counts_full_moves() {
        let mut state = BoardState::initial();
        state.switch_turn();
        assert_eq!(state.active_color, Color::Black);
        assert_eq!(state.full_move_number, 1);
        state.switch_turn();
        assert_eq!(state.active_color, Color::White);
        assert_eq!(state.full_move_number, 2);
    }
}
