//! 玩家管理

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use protocol::{PlayerId, ProtocolError, RoomId, MAX_NICKNAME_LEN};

use crate::error::ServerError;

/// 玩家状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// 已连接，尚未设置昵称
    AwaitingNickname,
    /// 等待配对
    Waiting,
    /// 在房间中对局
    InRoom(RoomId),
}

/// 玩家信息
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: Option<String>,
    pub status: PlayerStatus,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            nickname: None,
            status: PlayerStatus::AwaitingNickname,
        }
    }
}

/// 玩家管理器
///
/// 同一时刻最多只有一个等待配对的玩家。
pub struct PlayerManager {
    /// 玩家 ID -> 玩家信息
    players: HashMap<PlayerId, Player>,
    /// 等待配对的玩家
    waiting: Option<PlayerId>,
    /// ID 生成器
    next_id: AtomicU64,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            waiting: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// 生成新的玩家 ID
    fn generate_id(&self) -> PlayerId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 验证昵称，返回去掉首尾空白后的昵称
    pub fn validate_nickname(nickname: &str) -> Result<String, ProtocolError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(ProtocolError::NicknameEmpty);
        }
        let len = nickname.chars().count();
        if len > MAX_NICKNAME_LEN {
            return Err(ProtocolError::NicknameTooLong {
                len,
                max: MAX_NICKNAME_LEN,
            });
        }
        Ok(nickname.to_string())
    }

    /// 登记新连接
    pub fn register(&mut self) -> PlayerId {
        let id = self.generate_id();
        self.players.insert(id, Player::new(id));
        id
    }

    /// 设置昵称（每个玩家只能设置一次）
    pub fn set_nickname(
        &mut self,
        player_id: PlayerId,
        nickname: &str,
    ) -> Result<String, ServerError> {
        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(ServerError::NicknameRequired)?;
        if player.nickname.is_some() {
            return Err(ServerError::NicknameAlreadySet);
        }

        let nickname = Self::validate_nickname(nickname)?;
        player.nickname = Some(nickname.clone());
        Ok(nickname)
    }

    /// 进入配对队列
    ///
    /// 已有等待者时取出并返回它（先到者），否则自己成为等待者并返回 `None`。
    pub fn enqueue(&mut self, player_id: PlayerId) -> Option<PlayerId> {
        match self.waiting.take() {
            Some(waiting) if waiting != player_id => Some(waiting),
            _ => {
                self.waiting = Some(player_id);
                self.set_status(player_id, PlayerStatus::Waiting);
                None
            }
        }
    }

    /// 当前等待配对的玩家
    pub fn waiting(&self) -> Option<PlayerId> {
        self.waiting
    }

    /// 移除玩家，同时清空等待位
    pub fn remove(&mut self, player_id: PlayerId) -> Option<Player> {
        if self.waiting == Some(player_id) {
            self.waiting = None;
        }
        self.players.remove(&player_id)
    }

    /// 获取玩家
    pub fn get(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.get(&player_id)
    }

    /// 设置玩家状态
    pub fn set_status(&mut self, player_id: PlayerId, status: PlayerStatus) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.status = status;
        }
    }

    /// 获取玩家昵称
    pub fn get_nickname(&self, player_id: PlayerId) -> Option<&str> {
        self.players
            .get(&player_id)
            .and_then(|p| p.nickname.as_deref())
    }

    /// 检查玩家是否存在
    pub fn exists(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    /// 获取在线玩家数量
    pub fn online_count(&self) -> usize {
        self.players.len()
    }
}

impl Default for PlayerManager {
    fn default() -> Self {
        Self::new()
    }
}
