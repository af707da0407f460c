//! 棋子与格子定义

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_SIZE, SQUARE_COUNT};
use crate::error::ChessError;

/// 棋子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
    /// 空格
    Empty,
}

impl PieceType {
    /// 获取 FEN 字符（白方大写，黑方小写）
    pub fn to_fen_char(&self, color: Color) -> Option<char> {
        let c = match self {
            PieceType::Pawn => 'p',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Rook => 'r',
            PieceType::Queen => 'q',
            PieceType::King => 'k',
            PieceType::Empty => return None,
        };
        match color {
            Color::White => Some(c.to_ascii_uppercase()),
            Color::Black => Some(c),
            Color::Empty => None,
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<(PieceType, Color)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let piece_type = match c.to_ascii_lowercase() {
            'p' => PieceType::Pawn,
            'n' => PieceType::Knight,
            'b' => PieceType::Bishop,
            'r' => PieceType::Rook,
            'q' => PieceType::Queen,
            'k' => PieceType::King,
            _ => return None,
        };
        Some((piece_type, color))
    }

    /// 兵升变可选的目标棋子
    pub fn is_promotion_target(&self) -> bool {
        matches!(
            self,
            PieceType::Knight | PieceType::Bishop | PieceType::Rook | PieceType::Queen
        )
    }
}

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    /// 白方（先手）
    White,
    /// 黑方（后手）
    Black,
    /// 空格的颜色
    Empty,
}

impl Color {
    /// 获取对方阵营
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
            Color::Empty => Color::Empty,
        }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        match self {
            Color::Black => 'b',
            _ => 'w',
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Color> {
        match c {
            'w' | 'W' => Some(Color::White),
            'b' | 'B' => Some(Color::Black),
            _ => None,
        }
    }

    /// 兵的前进方向（按行号，第 0 行是第 8 横排）
    pub fn pawn_direction(&self) -> i8 {
        match self {
            Color::White => -1,
            _ => 1,
        }
    }

    /// 兵的起始行
    pub fn pawn_start_row(&self) -> u8 {
        match self {
            Color::White => 6,
            _ => 1,
        }
    }

    /// 兵的升变行
    pub fn promotion_row(&self) -> u8 {
        match self {
            Color::White => 0,
            _ => 7,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
            Color::Empty => write!(f, "empty"),
        }
    }
}

/// 棋盘格子
///
/// 索引与坐标的换算：`index = (8 - rank) * 8 + file`，`file` 从 0 开始（a = 0），
/// `rank` 为 1-8。因此索引 0 是 a8，索引 63 是 h1。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Square(u8);

impl Square {
    /// 创建新格子
    pub fn new(index: u8) -> Option<Self> {
        if (index as usize) < SQUARE_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// 创建新格子（不检查边界，内部使用）
    pub const fn new_unchecked(index: u8) -> Self {
        Self(index)
    }

    /// 从行列创建（行 0 为第 8 横排）
    pub fn from_row_col(row: u8, col: u8) -> Option<Self> {
        if (row as usize) < BOARD_SIZE && (col as usize) < BOARD_SIZE {
            Some(Self(row * BOARD_SIZE as u8 + col))
        } else {
            None
        }
    }

    /// 从纵线（0-7）和横排（1-8）创建
    pub fn from_file_rank(file: u8, rank: u8) -> Option<Self> {
        if !(1..=BOARD_SIZE as u8).contains(&rank) {
            return None;
        }
        Self::from_row_col(BOARD_SIZE as u8 - rank, file)
    }

    /// 从代数坐标解析，例如 `e4`
    pub fn from_algebraic(s: &str) -> Result<Self, ChessError> {
        let mut chars = s.chars();
        let (Some(f), Some(r), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(ChessError::InvalidSquare(s.to_string()));
        };
        if !('a'..='h').contains(&f) || !('1'..='8').contains(&r) {
            return Err(ChessError::InvalidSquare(s.to_string()));
        }
        let file = f as u8 - b'a';
        let rank = r as u8 - b'0';
        Self::from_file_rank(file, rank).ok_or_else(|| ChessError::InvalidSquare(s.to_string()))
    }

    /// 转换为代数坐标
    pub fn to_algebraic(&self) -> String {
        let file = (b'a' + self.file()) as char;
        let rank = (b'0' + self.rank()) as char;
        format!("{}{}", file, rank)
    }

    /// 数组索引
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// 行（0 为第 8 横排）
    pub fn row(&self) -> u8 {
        self.0 / BOARD_SIZE as u8
    }

    /// 列，同纵线（0 为 a 线）
    pub fn col(&self) -> u8 {
        self.0 % BOARD_SIZE as u8
    }

    /// 纵线（0-7）
    pub fn file(&self) -> u8 {
        self.col()
    }

    /// 横排（1-8）
    pub fn rank(&self) -> u8 {
        BOARD_SIZE as u8 - self.row()
    }

    /// 获取偏移后的格子
    pub fn offset(&self, d_row: i8, d_col: i8) -> Option<Square> {
        let row = self.row() as i8 + d_row;
        let col = self.col() as i8 + d_col;
        if row < 0 || col < 0 {
            return None;
        }
        Self::from_row_col(row as u8, col as u8)
    }

    /// 所有格子，按索引顺序
    pub fn all() -> impl Iterator<Item = Square> {
        (0..SQUARE_COUNT as u8).map(Square)
    }
}

impl TryFrom<u8> for Square {
    type Error = ChessError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Square::new(index).ok_or_else(|| ChessError::InvalidSquare(index.to_string()))
    }
}

impl From<Square> for u8 {
    fn from(square: Square) -> u8 {
        square.0
    }
}

impl FromStr for Square {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Square::from_algebraic(s)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_algebraic())
    }
}

/// 棋子
///
/// 每个格子都恰好持有一个 `Piece`，空格用 `PieceType::Empty` / `Color::Empty` 表示。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub piece_type: PieceType,
    pub color: Color,
    pub square: Square,
}

impl Piece {
    /// 创建新棋子
    pub fn new(piece_type: PieceType, color: Color, square: Square) -> Self {
        Self {
            piece_type,
            color,
            square,
        }
    }

    /// 创建空格
    pub fn empty(square: Square) -> Self {
        Self {
            piece_type: PieceType::Empty,
            color: Color::Empty,
            square,
        }
    }

    /// 是否为空格
    pub fn is_empty(&self) -> bool {
        self.piece_type == PieceType::Empty
    }

    /// 是否为指定阵营的棋子
    pub fn is_color(&self, color: Color) -> bool {
        !self.is_empty() && self.color == color
    }

    /// 是否为对方棋子
    pub fn is_enemy_of(&self, color: Color) -> bool {
        !self.is_empty() && color != Color::Empty && self.color == color.opponent()
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> Option<char> {
        self.piece_type.to_fen_char(self.color)
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char, square: Square) -> Option<Piece> {
        PieceType::from_fen_char(c).map(|(piece_type, color)| Piece::new(piece_type, color, square))
    }
}
