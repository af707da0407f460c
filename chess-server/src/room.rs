//! 房间系统
//!
//! 一个房间就是一局已配对的对局，持有唯一的规则引擎实例。
//! 每个房间由独立的互斥锁保护，轮次检查与走子在同一把锁内完成。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use protocol::{
    BoardSnapshot, ChessError, Color, Engine, GameStatus, Move, PieceType, PlayerId, RoomId,
    Square,
};

/// 房间状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// 对局进行中
    Playing,
    /// 对局结束（将杀或逼和）
    Finished,
}

/// 房间
pub struct Room {
    pub id: RoomId,
    pub state: RoomState,
    /// 白方玩家 ID
    pub white_player: PlayerId,
    /// 黑方玩家 ID
    pub black_player: PlayerId,
    /// 规则引擎
    engine: Engine,
    /// 走法历史
    pub move_history: Vec<Move>,
}

impl Room {
    /// 创建新房间，标准初始局面
    pub fn new(id: RoomId, white_player: PlayerId, black_player: PlayerId) -> Self {
        Self {
            id,
            state: RoomState::Playing,
            white_player,
            black_player,
            engine: Engine::new(),
            move_history: Vec::new(),
        }
    }

    /// 检查玩家是否在房间中
    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.white_player == player_id || self.black_player == player_id
    }

    /// 获取玩家的颜色
    pub fn get_player_color(&self, player_id: PlayerId) -> Option<Color> {
        if self.white_player == player_id {
            Some(Color::White)
        } else if self.black_player == player_id {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// 获取对手 ID
    pub fn get_opponent_id(&self, player_id: PlayerId) -> Option<PlayerId> {
        if self.white_player == player_id {
            Some(self.black_player)
        } else if self.black_player == player_id {
            Some(self.white_player)
        } else {
            None
        }
    }

    /// 执行走棋
    ///
    /// 先检查是否轮到请求方，再交给引擎验证；任何失败都不改变棋盘。
    pub fn make_move(
        &mut self,
        player_id: PlayerId,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> Result<Move, ChessError> {
        if self.state == RoomState::Finished {
            return Err(ChessError::GameOver);
        }
        if self.get_player_color(player_id) != Some(self.engine.active_color()) {
            return Err(ChessError::NotYourTurn);
        }

        let mv = self.engine.make_move_with_promotion(from, to, promotion)?;
        self.move_history.push(mv);

        if self.engine.status().is_over() {
            self.state = RoomState::Finished;
        }

        Ok(mv)
    }

    /// 当前局面状态（以走子方视角）
    pub fn status(&self) -> GameStatus {
        self.engine.status()
    }

    /// 查询合法目标格（不改变状态）
    pub fn legal_moves(&self, square: Square) -> Vec<Square> {
        self.engine.get_legal_moves(square)
    }

    /// 完整棋盘快照
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::from_engine(&self.engine)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

/// 房间管理器
pub struct RoomManager {
    rooms: HashMap<RoomId, Arc<Mutex<Room>>>,
    /// 玩家 ID -> 所在房间
    player_rooms: HashMap<PlayerId, RoomId>,
    next_id: AtomicU64,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// 生成新的房间 ID
    fn generate_id(&self) -> RoomId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 创建房间
    pub fn create(&mut self, white_player: PlayerId, black_player: PlayerId) -> RoomId {
        let id = self.generate_id();
        let room = Room::new(id, white_player, black_player);
        self.rooms.insert(id, Arc::new(Mutex::new(room)));
        self.player_rooms.insert(white_player, id);
        self.player_rooms.insert(black_player, id);
        id
    }

    /// 获取房间
    pub fn get(&self, room_id: RoomId) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(&room_id).cloned()
    }

    /// 查找玩家所在的房间
    pub fn find_player_room(&self, player_id: PlayerId) -> Option<RoomId> {
        self.player_rooms.get(&player_id).copied()
    }

    /// 移除房间，同时移除两位玩家的索引
    pub fn remove(&mut self, room_id: RoomId) -> Option<Arc<Mutex<Room>>> {
        let room = self.rooms.remove(&room_id)?;
        self.player_rooms.retain(|_, id| *id != room_id);
        Some(room)
    }

    /// 获取房间数量
    pub fn count(&self) -> usize {
        self.rooms.len()
    }

    /// 是否没有任何房间或玩家索引
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty() && self.player_rooms.is_empty()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::INITIAL_FEN;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    #[test]
    fn test_create_room() {
        let mut manager = RoomManager::new();

        let id1 = manager.create(1, 2);
        let id2 = manager.create(3, 4);

        assert_ne!(id1, id2);
        assert_eq!(manager.count(), 2);
        assert_eq!(manager.find_player_room(2), Some(id1));
        assert_eq!(manager.find_player_room(3), Some(id2));
    }

    #[test]
    fn test_colors_and_opponent() {
        let room = Room::new(1, 100, 200);

        assert_eq!(room.get_player_color(100), Some(Color::White));
        assert_eq!(room.get_player_color(200), Some(Color::Black));
        assert_eq!(room.get_player_color(300), None);
        assert_eq!(room.get_opponent_id(100), Some(200));
        assert_eq!(room.get_opponent_id(200), Some(100));
        assert!(!room.has_player(300));
    }

    #[test]
    fn test_turn_violation_leaves_board() {
        let mut room = Room::new(1, 100, 200);

        let result = room.make_move(200, sq("e7"), sq("e5"), None);
        assert_eq!(result, Err(ChessError::NotYourTurn));
        assert_eq!(room.snapshot().fen, INITIAL_FEN);

        // 白方不能替黑方走子
        room.make_move(100, sq("e2"), sq("e4"), None).unwrap();
        let result = room.make_move(100, sq("e7"), sq("e5"), None);
        assert_eq!(result, Err(ChessError::NotYourTurn));
        assert!(room.engine().board().is_empty(sq("e5")));
    }

    #[test]
    fn test_illegal_move() {
        let mut room = Room::new(1, 100, 200);
        let result = room.make_move(100, sq("e2"), sq("e5"), None);
        assert!(matches!(result, Err(ChessError::IllegalMove { .. })));
        assert!(room.move_history.is_empty());
    }

    #[test]
    fn test_checkmate_finishes_room() {
        let mut room = Room::new(1, 100, 200);
        room.make_move(100, sq("f2"), sq("f3"), None).unwrap();
        room.make_move(200, sq("e7"), sq("e5"), None).unwrap();
        room.make_move(100, sq("g2"), sq("g4"), None).unwrap();
        room.make_move(200, sq("d8"), sq("h4"), None).unwrap();

        assert_eq!(room.state, RoomState::Finished);
        assert_eq!(
            room.status(),
            GameStatus::Checkmate {
                winner: Color::Black
            }
        );
        assert_eq!(
            room.make_move(100, sq("a2"), sq("a3"), None),
            Err(ChessError::GameOver)
        );
        assert_eq!(room.move_history.len(), 4);
    }

    #[test]
    fn test_legal_moves_query() {
        let room = Room::new(1, 100, 200);
        let mut moves = room.legal_moves(sq("b1"));
        moves.sort();
        assert_eq!(moves, vec![sq("a3"), sq("c3")]);
    }

    #[test]
    fn test_remove_room_clears_index() {
        let mut manager = RoomManager::new();
        let id = manager.create(1, 2);
        manager.create(3, 4);

        assert!(manager.remove(id).is_some());
        assert_eq!(manager.find_player_room(1), None);
        assert_eq!(manager.find_player_room(2), None);
        assert!(manager.find_player_room(3).is_some());
        assert!(manager.remove(id).is_none());
    }
}
