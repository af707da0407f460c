//! 规则引擎：持有一局棋的完整状态，对外提供查询与走子接口

use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardState};
use crate::error::ChessError;
use crate::fen::Fen;
use crate::moves::{Move, MoveGenerator};
use crate::piece::{Color, Piece, PieceType, Square};

/// 对局状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// 进行中
    Ongoing,
    /// 将杀
    Checkmate { winner: Color },
    /// 逼和
    Stalemate,
}

impl GameStatus {
    pub fn is_over(&self) -> bool {
        !matches!(self, GameStatus::Ongoing)
    }
}

/// 国际象棋规则引擎
#[derive(Debug, Clone, Default)]
pub struct Engine {
    state: BoardState,
}

impl Engine {
    /// 标准初始局面
    pub fn new() -> Self {
        Self {
            state: BoardState::initial(),
        }
    }

    /// 从 FEN 创建
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        Ok(Self {
            state: Fen::parse(fen)?,
        })
    }

    /// 载入 FEN，失败时保持原状态不变
    pub fn load(&mut self, fen: &str) -> Result<(), ChessError> {
        self.state = Fen::parse(fen)?;
        Ok(())
    }

    /// 导出当前局面的 FEN
    pub fn to_fen(&self) -> String {
        Fen::to_string(&self.state)
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn board(&self) -> &Board {
        &self.state.board
    }

    /// 全部 64 个格子
    pub fn squares(&self) -> &[Piece] {
        self.state.board.squares()
    }

    pub fn piece_at(&self, square: Square) -> Piece {
        self.state.board.get(square)
    }

    /// 当前走子方
    pub fn active_color(&self) -> Color {
        self.state.active_color
    }

    /// 指定格子上棋子的合法目标格
    ///
    /// 空格或非当前走子方的棋子返回空列表。
    pub fn get_legal_moves(&self, square: Square) -> Vec<Square> {
        MoveGenerator::legal_targets(&self.state, square)
    }

    /// 当前走子方的全部合法走法
    pub fn all_legal_moves(&self) -> Vec<(Square, Square)> {
        MoveGenerator::generate_legal(&self.state)
    }

    /// 走子（兵到底线时升变为后）
    pub fn make_move(&mut self, from: Square, to: Square) -> Result<Move, ChessError> {
        self.make_move_with_promotion(from, to, None)
    }

    /// 走子，可指定升变棋子（马、象、车、后）
    ///
    /// 非法走法返回 `IllegalMove`，状态不变。
    pub fn make_move_with_promotion(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> Result<Move, ChessError> {
        let illegal = || ChessError::IllegalMove {
            from: from.to_algebraic(),
            to: to.to_algebraic(),
        };

        if promotion.is_some_and(|p| !p.is_promotion_target()) {
            return Err(illegal());
        }
        if !self.get_legal_moves(from).contains(&to) {
            return Err(illegal());
        }

        Ok(MoveGenerator::apply(&mut self.state, from, to, promotion))
    }

    /// 格子是否被指定阵营攻击
    pub fn is_square_attacked(&self, square: Square, by: Color) -> bool {
        MoveGenerator::is_square_attacked(&self.state.board, square, by)
    }

    /// 指定阵营是否被将军
    pub fn is_in_check(&self, color: Color) -> bool {
        MoveGenerator::is_in_check(&self.state.board, color)
    }

    /// 指定阵营是否被将杀
    pub fn is_checkmate(&self, color: Color) -> bool {
        self.is_in_check(color) && !self.has_any_legal_move(color)
    }

    /// 指定阵营是否被逼和
    pub fn is_stalemate(&self, color: Color) -> bool {
        !self.is_in_check(color) && !self.has_any_legal_move(color)
    }

    /// 当前走子方视角的对局状态
    pub fn status(&self) -> GameStatus {
        let color = self.state.active_color;
        if self.has_any_legal_move(color) {
            GameStatus::Ongoing
        } else if self.is_in_check(color) {
            GameStatus::Checkmate {
                winner: color.opponent(),
            }
        } else {
            GameStatus::Stalemate
        }
    }

    /// 以指定阵营为走子方探测是否还有合法走法（在副本上进行）
    fn has_any_legal_move(&self, color: Color) -> bool {
        let scratch = if self.state.active_color == color {
            std::borrow::Cow::Borrowed(&self.state)
        } else {
            let mut state = self.state.clone();
            state.active_color = color;
            std::borrow::Cow::Owned(state)
        };

        scratch
            .board
            .pieces(color)
            .iter()
            .any(|piece| !MoveGenerator::legal_targets(&scratch, piece.square).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::INITIAL_FEN;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    fn play(engine: &mut Engine, moves: &[(&str, &str)]) {
        for (from, to) in moves {
            engine
                .make_move(sq(from), sq(to))
                .unwrap_or_else(|e| panic!("{}{} failed: {}", from, to, e));
        }
    }

    #[test]
    fn test_initial_position_has_20_moves() {
        let engine = Engine::new();
        assert_eq!(engine.all_legal_moves().len(), 20);
        assert_eq!(engine.to_fen(), INITIAL_FEN);
        assert_eq!(engine.status(), GameStatus::Ongoing);
    }

    #[test]
    fn test_legal_moves_of_empty_or_enemy_square() {
        let engine = Engine::new();
        assert!(engine.get_legal_moves(sq("e4")).is_empty());
        // 黑方棋子在白方回合没有合法走法
        assert!(engine.get_legal_moves(sq("e7")).is_empty());
        assert_eq!(engine.get_legal_moves(sq("g1")).len(), 2);
    }

    #[test]
    fn test_no_legal_move_leaves_king_in_check() {
        let fens = [
            INITIAL_FEN,
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 2 3",
            "4k3/8/8/8/8/8/4r3/3K4 w - - 0 1",
            "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1",
        ];

        for fen in fens {
            let engine = Engine::from_fen(fen).unwrap();
            let color = engine.active_color();
            for (from, to) in engine.all_legal_moves() {
                let mut scratch = engine.clone();
                scratch.make_move(from, to).unwrap();
                assert!(!scratch.is_in_check(color), "{} {}{}", fen, from, to);
            }
        }
    }

    #[test]
    fn test_illegal_move_leaves_state_unchanged() {
        let mut engine = Engine::new();
        let before = engine.state().clone();

        assert!(matches!(
            engine.make_move(sq("e2"), sq("e5")),
            Err(ChessError::IllegalMove { .. })
        ));
        // 不是白方的棋子
        assert!(engine.make_move(sq("e7"), sq("e5")).is_err());
        // 空格
        assert!(engine.make_move(sq("e4"), sq("e5")).is_err());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_make_move_updates_state() {
        let mut engine = Engine::new();
        let mv = engine.make_move(sq("e2"), sq("e4")).unwrap();

        assert_eq!(mv.piece, PieceType::Pawn);
        assert_eq!(mv.captured, None);
        assert_eq!(engine.active_color(), Color::Black);
        assert_eq!(engine.state().en_passant_target, Some(sq("e3")));
        assert_eq!(
            engine.to_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );

        play(&mut engine, &[("g8", "f6")]);
        assert_eq!(engine.state().en_passant_target, None);
        assert_eq!(engine.state().half_move_clock, 1);
        assert_eq!(engine.state().full_move_number, 2);
    }

    #[test]
    fn test_en_passant() {
        let mut engine = Engine::new();
        play(
            &mut engine,
            &[("e2", "e4"), ("a7", "a6"), ("e4", "e5"), ("d7", "d5")],
        );
        assert_eq!(engine.state().en_passant_target, Some(sq("d6")));
        assert!(engine.get_legal_moves(sq("e5")).contains(&sq("d6")));

        let mv = engine.make_move(sq("e5"), sq("d6")).unwrap();
        assert!(mv.en_passant);
        assert_eq!(mv.captured, Some(PieceType::Pawn));
        assert!(engine.board().is_empty(sq("d5")));
        assert_eq!(engine.piece_at(sq("d6")).piece_type, PieceType::Pawn);
        assert_eq!(engine.state().half_move_clock, 0);
    }

    #[test]
    fn test_en_passant_expires_after_one_ply() {
        let mut engine = Engine::new();
        play(
            &mut engine,
            &[
                ("e2", "e4"),
                ("a7", "a6"),
                ("e4", "e5"),
                ("d7", "d5"),
                ("g1", "f3"),
                ("a6", "a5"),
            ],
        );
        assert!(!engine.get_legal_moves(sq("e5")).contains(&sq("d6")));
    }

    #[test]
    fn test_castling_both_sides() {
        let mut engine = Engine::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let moves = engine.get_legal_moves(sq("e1"));
        assert!(moves.contains(&sq("g1")));
        assert!(moves.contains(&sq("c1")));

        let mv = engine.make_move(sq("e1"), sq("g1")).unwrap();
        assert!(mv.castling);
        assert_eq!(engine.piece_at(sq("f1")).piece_type, PieceType::Rook);
        assert!(engine.board().is_empty(sq("h1")));
        assert!(!engine.state().castling.white_king_side);
        assert!(!engine.state().castling.white_queen_side);

        engine.make_move(sq("e8"), sq("c8")).unwrap();
        assert_eq!(engine.piece_at(sq("d8")).piece_type, PieceType::Rook);
        assert_eq!(engine.piece_at(sq("c8")).piece_type, PieceType::King);
        assert!(engine.board().is_empty(sq("a8")));
        assert!(engine.state().castling.is_empty());
    }

    #[test]
    fn test_castling_through_attacked_square() {
        let engine = Engine::from_fen("5r1k/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        assert!(engine.is_square_attacked(sq("f1"), Color::Black));
        assert!(!engine.get_legal_moves(sq("e1")).contains(&sq("g1")));
    }

    #[test]
    fn test_rook_move_clears_one_right() {
        let mut engine = Engine::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        play(
            &mut engine,
            &[("h1", "h2"), ("a8", "a7"), ("h2", "h1"), ("a7", "a8")],
        );

        let castling = engine.state().castling;
        assert!(!castling.white_king_side);
        assert!(castling.white_queen_side);
        assert!(!castling.black_queen_side);
        assert!(castling.black_king_side);
        // 车回到原位也不恢复易位权
        let moves = engine.get_legal_moves(sq("e1"));
        assert!(!moves.contains(&sq("g1")));
        assert!(moves.contains(&sq("c1")));
    }

    #[test]
    fn test_king_move_clears_rights() {
        let mut engine = Engine::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        play(
            &mut engine,
            &[("e1", "e2"), ("e8", "e7"), ("e2", "e1"), ("e7", "e8")],
        );
        assert!(!engine.state().castling.white_king_side);
        assert!(!engine.state().castling.white_queen_side);
        assert!(engine.get_legal_moves(sq("e1")).iter().all(|s| s.col() != 2 && s.col() != 6));
    }

    #[test]
    fn test_back_rank_mate() {
        let mut engine = Engine::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        engine.make_move(sq("a1"), sq("a8")).unwrap();

        assert!(engine.is_in_check(Color::Black));
        assert!(engine.is_checkmate(Color::Black));
        assert!(!engine.is_stalemate(Color::Black));
        for piece in engine.board().pieces(Color::Black) {
            assert!(engine.get_legal_moves(piece.square).is_empty());
        }
        assert_eq!(
            engine.status(),
            GameStatus::Checkmate {
                winner: Color::White
            }
        );
    }

    #[test]
    fn test_fools_mate() {
        let mut engine = Engine::new();
        play(
            &mut engine,
            &[("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")],
        );
        assert!(engine.is_checkmate(Color::White));
        assert!(engine.status().is_over());
    }

    #[test]
    fn test_stalemate() {
        let engine = Engine::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(!engine.is_in_check(Color::Black));
        assert!(engine.is_stalemate(Color::Black));
        assert!(!engine.is_checkmate(Color::Black));
        assert_eq!(engine.status(), GameStatus::Stalemate);
    }

    #[test]
    fn test_checkmate_query_for_side_not_to_move() {
        // 轮到白方走，但黑方处于被将杀的局面
        let engine = Engine::from_fen("R5k1/5ppp/8/8/8/8/8/6K1 w - - 1 1").unwrap();
        assert!(engine.is_checkmate(Color::Black));
        assert!(!engine.is_checkmate(Color::White));
    }

    #[test]
    fn test_promotion_defaults_to_queen() {
        let mut engine = Engine::from_fen("7k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let mv = engine.make_move(sq("a7"), sq("a8")).unwrap();
        assert_eq!(mv.promotion, Some(PieceType::Queen));
        assert_eq!(engine.piece_at(sq("a8")).piece_type, PieceType::Queen);
        assert_eq!(engine.piece_at(sq("a8")).color, Color::White);
    }

    #[test]
    fn test_under_promotion() {
        let mut engine = Engine::from_fen("7k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();
        assert!(engine
            .make_move_with_promotion(sq("a7"), sq("a8"), Some(PieceType::King))
            .is_err());

        let mv = engine
            .make_move_with_promotion(sq("a7"), sq("a8"), Some(PieceType::Rook))
            .unwrap();
        assert_eq!(mv.promotion, Some(PieceType::Rook));
        assert_eq!(engine.piece_at(sq("a8")).piece_type, PieceType::Rook);
    }

    #[test]
    fn test_black_promotion() {
        let mut engine = Engine::from_fen("k7/8/8/8/8/8/7p/K7 b - - 0 1").unwrap();
        engine.make_move(sq("h2"), sq("h1")).unwrap();
        assert_eq!(engine.piece_at(sq("h1")).piece_type, PieceType::Queen);
        assert_eq!(engine.piece_at(sq("h1")).color, Color::Black);
    }

    #[test]
    fn test_counters_saturate_at_max() {
        let mut engine = Engine::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 4294967295 1").unwrap();
        assert_eq!(engine.get_legal_moves(sq("e1")).len(), 5);
        engine.make_move(sq("e1"), sq("e2")).unwrap();
        assert_eq!(engine.state().half_move_clock, u32::MAX);

        let mut engine = Engine::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 4294967295").unwrap();
        assert_eq!(engine.get_legal_moves(sq("e8")).len(), 5);
        engine.make_move(sq("e8"), sq("e7")).unwrap();
        assert_eq!(engine.state().full_move_number, u32::MAX);
        assert_eq!(engine.active_color(), Color::White);
    }

    #[test]
    fn test_en_passant_target_without_victim() {
        // 目标格后方是空格：不能斜走
        let engine = Engine::from_fen("4k3/8/8/4P3/8/8/8/4K3 w - d6 0 1").unwrap();
        assert_eq!(engine.get_legal_moves(sq("e5")), vec![sq("e6")]);
        assert!(engine.clone().make_move(sq("e5"), sq("d6")).is_err());

        // 目标格后方是己方棋子：不能把它吃掉
        let mut engine = Engine::from_fen("4k3/8/8/3NP3/8/8/8/4K3 w - d6 0 1").unwrap();
        assert_eq!(engine.get_legal_moves(sq("e5")), vec![sq("e6")]);
        assert!(engine.make_move(sq("e5"), sq("d6")).is_err());
        assert_eq!(engine.piece_at(sq("d5")).piece_type, PieceType::Knight);
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let mut engine = Engine::new();
        play(&mut engine, &[("e2", "e4")]);
        let before = engine.to_fen();

        let bad = [
            "rnbqkbnr/pppppppp/8/8 w KQkq - 0 1",
            "not a fen",
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KX - 0 1",
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq z9 0 1",
        ];
        for fen in bad {
            assert!(
                matches!(engine.load(fen), Err(ChessError::InvalidFen { .. })),
                "应拒绝: {}",
                fen
            );
            assert_eq!(engine.to_fen(), before);
        }

        engine.load(INITIAL_FEN).unwrap();
        assert_eq!(engine.to_fen(), INITIAL_FEN);
    }
}
