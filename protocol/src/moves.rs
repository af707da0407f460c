//! 走法生成、攻击检测与走法执行
//!
//! 所有函数都是对棋盘状态的纯函数；模拟走法时在副本上进行，
//! 调用方观察不到任何中间状态。

use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardState};
use crate::piece::{Color, PieceType, Square};

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (2, -1),
    (2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

const ORTHOGONALS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// 已执行的走法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// 起始格
    pub from: Square,
    /// 目标格
    pub to: Square,
    /// 走动的棋子
    pub piece: PieceType,
    /// 走子方
    pub color: Color,
    /// 被吃的棋子（如果有，含吃过路兵）
    pub captured: Option<PieceType>,
    /// 升变后的棋子
    pub promotion: Option<PieceType>,
    /// 是否为王车易位
    pub castling: bool,
    /// 是否为吃过路兵
    pub en_passant: bool,
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion.and_then(|p| p.to_fen_char(Color::Black)) {
            write!(f, "{}", promotion)?;
        }
        Ok(())
    }
}

/// 走法生成器
pub struct MoveGenerator;

impl MoveGenerator {
    /// 生成指定格子上棋子的伪合法目标格（不考虑己方王是否被将军）
    pub fn pseudo_legal_targets(state: &BoardState, from: Square) -> Vec<Square> {
        let piece = state.board.get(from);
        let mut targets = Vec::with_capacity(28);

        match piece.piece_type {
            PieceType::Pawn => Self::generate_pawn_moves(state, from, piece.color, &mut targets),
            PieceType::Knight => {
                let offsets = &KNIGHT_OFFSETS;
                Self::generate_step_moves(&state.board, from, piece.color, offsets, &mut targets)
            }
            PieceType::Bishop => {
                let dirs = &DIAGONALS;
                Self::generate_slide_moves(&state.board, from, piece.color, dirs, &mut targets)
            }
            PieceType::Rook => {
                let dirs = &ORTHOGONALS;
                Self::generate_slide_moves(&state.board, from, piece.color, dirs, &mut targets)
            }
            PieceType::Queen => {
                for dirs in [&DIAGONALS, &ORTHOGONALS] {
                    Self::generate_slide_moves(&state.board, from, piece.color, dirs, &mut targets);
                }
            }
            PieceType::King => {
                let offsets = &KING_OFFSETS;
                Self::generate_step_moves(&state.board, from, piece.color, offsets, &mut targets);
                Self::generate_castling_moves(state, from, piece.color, &mut targets);
            }
            PieceType::Empty => {}
        }

        targets
    }

    /// 生成指定格子上棋子的合法目标格
    ///
    /// 格子为空或不属于当前走子方时返回空列表。
    pub fn legal_targets(state: &BoardState, from: Square) -> Vec<Square> {
        let piece = state.board.get(from);
        if piece.is_empty() || piece.color != state.active_color {
            return Vec::new();
        }

        Self::pseudo_legal_targets(state, from)
            .into_iter()
            .filter(|&to| !Self::leaves_king_in_check(state, from, to))
            .collect()
    }

    /// 生成当前走子方的全部合法走法
    pub fn generate_legal(state: &BoardState) -> Vec<(Square, Square)> {
        state
            .board
            .pieces(state.active_color)
            .into_iter()
            .flat_map(|piece| {
                Self::legal_targets(state, piece.square)
                    .into_iter()
                    .map(move |to| (piece.square, to))
            })
            .collect()
    }

    /// 在副本上执行走法，检查走子方的王是否仍被攻击
    fn leaves_king_in_check(state: &BoardState, from: Square, to: Square) -> bool {
        let color = state.board.get(from).color;
        let mut test_state = state.clone();
        Self::apply(&mut test_state, from, to, None);
        Self::is_in_check(&test_state.board, color)
    }

    /// 生成兵的走法
    fn generate_pawn_moves(
        state: &BoardState,
        from: Square,
        color: Color,
        targets: &mut Vec<Square>,
    ) {
        let board = &state.board;
        let dir = color.pawn_direction();

        // 前进一格
        if let Some(one) = from.offset(dir, 0) {
            if board.is_empty(one) {
                targets.push(one);

                // 起始行可前进两格
                if from.row() == color.pawn_start_row() {
                    if let Some(two) = one.offset(dir, 0) {
                        if board.is_empty(two) {
                            targets.push(two);
                        }
                    }
                }
            }
        }

        // 斜向吃子
        for d_col in [-1i8, 1] {
            let Some(to) = from.offset(dir, d_col) else {
                continue;
            };
            let en_passant = Self::en_passant_victim(state, to, color).is_some();
            if board.get(to).is_enemy_of(color) || en_passant {
                targets.push(to);
            }
        }
    }

    /// 吃过路兵时被吃掉的兵所在格
    ///
    /// 目标格必须是当前的过路兵目标、本身为空，且其后方确有对方的兵。
    fn en_passant_victim(state: &BoardState, to: Square, color: Color) -> Option<Square> {
        if state.en_passant_target != Some(to) || !state.board.is_empty(to) {
            return None;
        }
        let victim = to.offset(-color.pawn_direction(), 0)?;
        let piece = state.board.get(victim);
        (piece.piece_type == PieceType::Pawn && piece.is_enemy_of(color)).then_some(victim)
    }

    /// 生成马、王的单步走法
    fn generate_step_moves(
        board: &Board,
        from: Square,
        color: Color,
        offsets: &[(i8, i8)],
        targets: &mut Vec<Square>,
    ) {
        for &(d_row, d_col) in offsets {
            if let Some(to) = from.offset(d_row, d_col) {
                Self::try_add_move(board, to, color, targets);
            }
        }
    }

    /// 生成象、车、后的滑动走法
    fn generate_slide_moves(
        board: &Board,
        from: Square,
        color: Color,
        directions: &[(i8, i8)],
        targets: &mut Vec<Square>,
    ) {
        for &(d_row, d_col) in directions {
            let mut current = from;
            while let Some(to) = current.offset(d_row, d_col) {
                let target = board.get(to);
                if target.is_empty() {
                    targets.push(to);
                } else {
                    if target.is_enemy_of(color) {
                        targets.push(to);
                    }
                    break;
                }
                current = to;
            }
        }
    }

    /// 生成王车易位走法
    ///
    /// 目标格本身是否被攻击交给通用的将军过滤检查。
    fn generate_castling_moves(
        state: &BoardState,
        from: Square,
        color: Color,
        targets: &mut Vec<Square>,
    ) {
        let home = match color {
            Color::White => Square::new_unchecked(60),
            Color::Black => Square::new_unchecked(4),
            Color::Empty => return,
        };
        if from != home {
            return;
        }

        let board = &state.board;
        let opponent = color.opponent();
        if Self::is_square_attacked(board, from, opponent) {
            return;
        }

        for king_side in [true, false] {
            if !state.castling.get(color, king_side) {
                continue;
            }

            let (rook_col, between, transit): (u8, &[u8], &[u8]) = if king_side {
                (7, &[5, 6], &[5])
            } else {
                (0, &[1, 2, 3], &[3])
            };

            let row = from.row();
            let rook = board.get(Square::new_unchecked(row * 8 + rook_col));
            if rook.piece_type != PieceType::Rook || rook.color != color {
                continue;
            }

            let path_clear = between
                .iter()
                .all(|&col| board.is_empty(Square::new_unchecked(row * 8 + col)));
            if !path_clear {
                continue;
            }

            let path_safe = transit
                .iter()
                .map(|&col| Square::new_unchecked(row * 8 + col))
                .all(|square| !Self::is_square_attacked(board, square, opponent));
            if !path_safe {
                continue;
            }

            let d_col = if king_side { 2 } else { -2 };
            if let Some(to) = from.offset(0, d_col) {
                targets.push(to);
            }
        }
    }

    /// 尝试添加走法（目标为空格或对方棋子）
    fn try_add_move(board: &Board, to: Square, color: Color, targets: &mut Vec<Square>) {
        let target = board.get(to);
        if target.is_empty() || target.is_enemy_of(color) {
            targets.push(to);
        }
    }

    /// 检查格子是否被指定阵营攻击
    ///
    /// 只看几何可达性，与目标格上放的是什么棋子无关，因此可以用来探测空的易位途经格。
    pub fn is_square_attacked(board: &Board, square: Square, by: Color) -> bool {
        board
            .pieces(by)
            .iter()
            .any(|piece| Self::can_attack(board, piece.square, piece.piece_type, by, square))
    }

    /// 检查棋子是否能攻击到目标格
    fn can_attack(
        board: &Board,
        from: Square,
        piece_type: PieceType,
        color: Color,
        target: Square,
    ) -> bool {
        if from == target {
            return false;
        }

        let d_row = target.row() as i8 - from.row() as i8;
        let d_col = target.col() as i8 - from.col() as i8;

        match piece_type {
            // 兵按吃子几何攻击，不管目标格是否有子
            PieceType::Pawn => d_row == color.pawn_direction() && d_col.abs() == 1,
            PieceType::Knight => {
                (d_row.abs() == 2 && d_col.abs() == 1) || (d_row.abs() == 1 && d_col.abs() == 2)
            }
            PieceType::Bishop => d_row.abs() == d_col.abs() && Self::ray_clear(board, from, target),
            PieceType::Rook => (d_row == 0 || d_col == 0) && Self::ray_clear(board, from, target),
            PieceType::Queen => {
                (d_row == 0 || d_col == 0 || d_row.abs() == d_col.abs())
                    && Self::ray_clear(board, from, target)
            }
            // 王只看相邻格，不递归检查易位
            PieceType::King => d_row.abs() <= 1 && d_col.abs() <= 1,
            PieceType::Empty => false,
        }
    }

    /// 检查两格之间（不含两端）是否没有棋子，两格须在同一直线或斜线上
    fn ray_clear(board: &Board, from: Square, target: Square) -> bool {
        let step_row = (target.row() as i8 - from.row() as i8).signum();
        let step_col = (target.col() as i8 - from.col() as i8).signum();

        let mut current = from;
        while let Some(next) = current.offset(step_row, step_col) {
            if next == target {
                return true;
            }
            if !board.is_empty(next) {
                return false;
            }
            current = next;
        }
        false
    }

    /// 检查指定阵营是否被将军
    pub fn is_in_check(board: &Board, color: Color) -> bool {
        match board.find_king(color) {
            Some(king) => Self::is_square_attacked(board, king, color.opponent()),
            None => false, // 没有王，视为不被将军
        }
    }

    /// 执行走法（不检查合法性），按固定顺序更新全部状态
    ///
    /// `promotion` 为 `None` 时兵升变为后。
    pub fn apply(
        state: &mut BoardState,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> Move {
        let piece = state.board.get(from);
        let color = piece.color;
        let target = state.board.get(to);
        let mut record = Move {
            from,
            to,
            piece: piece.piece_type,
            color,
            captured: (!target.is_empty()).then_some(target.piece_type),
            promotion: None,
            castling: false,
            en_passant: false,
        };

        // 1. 王横移两格：同时移动对应的车
        if piece.piece_type == PieceType::King
            && from.row() == to.row()
            && (to.col() as i8 - from.col() as i8).abs() == 2
        {
            let row = from.row() * 8;
            let (rook_from, rook_to) = if to.col() > from.col() {
                (Square::new_unchecked(row + 7), Square::new_unchecked(row + 5))
            } else {
                (Square::new_unchecked(row), Square::new_unchecked(row + 3))
            };
            state.board.move_piece(rook_from, rook_to);
            record.castling = true;
        }

        // 2. 吃过路兵：移除目标格后方的兵
        if piece.piece_type == PieceType::Pawn && from.col() != to.col() {
            if let Some(victim) = Self::en_passant_victim(state, to, color) {
                state.board.clear(victim);
                record.captured = Some(PieceType::Pawn);
                record.en_passant = true;
            }
        }

        // 3. 移动棋子
        state.board.move_piece(from, to);

        // 4. 升变
        if piece.piece_type == PieceType::Pawn && to.row() == color.promotion_row() {
            let promoted = promotion
                .filter(|p| p.is_promotion_target())
                .unwrap_or(PieceType::Queen);
            state.board.place(to, promoted, color);
            record.promotion = Some(promoted);
        }

        // 5. 易位权：只会被清除，不会恢复
        if piece.piece_type == PieceType::King {
            state.castling.clear_color(color);
        }
        if piece.piece_type == PieceType::Rook {
            state.castling.clear_for_corner(from);
        }
        if record.captured.is_some() {
            state.castling.clear_for_corner(to);
        }

        // 6. 吃过路兵目标
        state.en_passant_target = if piece.piece_type == PieceType::Pawn
            && (to.row() as i8 - from.row() as i8).abs() == 2
        {
            Square::from_row_col((from.row() + to.row()) / 2, from.col())
        } else {
            None
        };

        // 7. 半回合计数
        if piece.piece_type == PieceType::Pawn || record.captured.is_some() {
            state.half_move_clock = 0;
        } else {
            state.half_move_clock = state.half_move_clock.saturating_add(1);
        }

        // 8 & 9. 回合数与走子方
        state.switch_turn();

        record
    }
}
