//! 服务器主逻辑：全局注册表、配对与消息分发

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use protocol::{GameStatus, PieceType, PlayerId, Request, Response, RoomId, Square};

use crate::error::ServerError;
use crate::player::{PlayerManager, PlayerStatus};
use crate::room::RoomManager;

/// 共享的服务器状态，配对与拆除都在这把锁内串行完成
pub type SharedState = Arc<Mutex<ServerState>>;

/// 单个连接的句柄
pub struct ConnectionHandle {
    /// 发送队列
    tx: mpsc::Sender<Response>,
    /// 通知该连接的读循环退出
    shutdown: Option<oneshot::Sender<()>>,
}

/// 服务器状态
pub struct ServerState {
    pub players: PlayerManager,
    pub rooms: RoomManager,
    /// 玩家 ID -> 连接句柄
    connections: HashMap<PlayerId, ConnectionHandle>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            players: PlayerManager::new(),
            rooms: RoomManager::new(),
            connections: HashMap::new(),
        }
    }

    /// 包装成共享状态
    pub fn shared() -> SharedState {
        Arc::new(Mutex::new(Self::new()))
    }

    /// 登记新连接，返回分配的玩家 ID
    pub fn register_connection(
        &mut self,
        tx: mpsc::Sender<Response>,
        shutdown: oneshot::Sender<()>,
    ) -> PlayerId {
        let player_id = self.players.register();
        self.connections.insert(
            player_id,
            ConnectionHandle {
                tx,
                shutdown: Some(shutdown),
            },
        );
        player_id
    }

    /// 发送消息给玩家
    ///
    /// 不在锁内等待：发送队列已满的连接被视为失去响应并被要求关闭。
    pub fn send_to_player(&mut self, player_id: PlayerId, msg: Response) {
        let Some(handle) = self.connections.get_mut(&player_id) else {
            return;
        };
        match handle.tx.try_send(msg) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(player_id, "发送队列已满，断开连接");
                if let Some(shutdown) = handle.shutdown.take() {
                    let _ = shutdown.send(());
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(player_id, "连接已关闭，丢弃消息");
            }
        }
    }

    /// 广播消息给房间内所有玩家
    pub async fn broadcast_to_room(&mut self, room_id: RoomId, msg: Response) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let (white, black) = {
            let room = room.lock().await;
            (room.white_player, room.black_player)
        };
        self.send_to_player(white, msg.clone());
        self.send_to_player(black, msg);
    }

    /// 移除连接句柄并通知其读循环退出
    fn close_connection(&mut self, player_id: PlayerId) {
        if let Some(mut handle) = self.connections.remove(&player_id) {
            if let Some(shutdown) = handle.shutdown.take() {
                let _ = shutdown.send(());
            }
        }
    }

    /// 当前连接数
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// 是否不再引用任何玩家
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
            && self.players.online_count() == 0
            && self.players.waiting().is_none()
            && self.rooms.is_empty()
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// 待发送的消息
struct PendingMessages {
    messages: Vec<(PlayerId, Response)>,
    broadcasts: Vec<(RoomId, Response)>,
}

impl PendingMessages {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            broadcasts: Vec::new(),
        }
    }

    /// 直接回复请求方，排在其他通知之前
    fn reply(&mut self, player_id: PlayerId, msg: Response) {
        self.messages.insert(0, (player_id, msg));
    }

    fn send(&mut self, player_id: PlayerId, msg: Response) {
        self.messages.push((player_id, msg));
    }

    fn broadcast(&mut self, room_id: RoomId, msg: Response) {
        self.broadcasts.push((room_id, msg));
    }

    async fn flush(self, state: &mut ServerState) {
        for (player_id, msg) in self.messages {
            state.send_to_player(player_id, msg);
        }
        for (room_id, msg) in self.broadcasts {
            state.broadcast_to_room(room_id, msg).await;
        }
    }
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理客户端消息
    ///
    /// 处理失败时只给请求方回复 `ERROR`，连接保持打开。
    pub async fn handle(state: &mut ServerState, player_id: PlayerId, msg: Request) {
        let mut pending = PendingMessages::new();

        let result = match msg {
            Request::Nickname(nickname) => {
                Self::handle_nickname(state, &mut pending, player_id, &nickname).await
            }
            Request::TryMove {
                from,
                to,
                promotion,
            } => Self::handle_try_move(state, &mut pending, player_id, from, to, promotion).await,
            Request::GetLegalMoves(square) => {
                Self::handle_get_legal_moves(state, player_id, square).await
            }
            Request::GetBoardState => Self::handle_get_board_state(state, player_id).await,
        };

        match result {
            Ok(Some(reply)) => pending.reply(player_id, reply),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(player_id, error = %e, "请求被拒绝");
                pending.reply(player_id, Response::error(e));
            }
        }

        // 发送待发送的消息
        pending.flush(state).await;
    }

    /// 处理昵称，并尝试配对
    async fn handle_nickname(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        nickname: &str,
    ) -> Result<Option<Response>, ServerError> {
        let nickname = state.players.set_nickname(player_id, nickname)?;
        tracing::info!(player_id, %nickname, "玩家设置昵称");

        let Some(waiting_id) = state.players.enqueue(player_id) else {
            tracing::debug!(player_id, "等待配对");
            return Ok(Some(Response::Nickname(nickname)));
        };

        // 先到者执白
        let room_id = state.rooms.create(waiting_id, player_id);
        state.players.set_status(waiting_id, PlayerStatus::InRoom(room_id));
        state.players.set_status(player_id, PlayerStatus::InRoom(room_id));

        let room = state.rooms.get(room_id).ok_or(ServerError::NotInGame)?;
        let snapshot = room.lock().await.snapshot();
        let waiting_name = state
            .players
            .get_nickname(waiting_id)
            .unwrap_or_default()
            .to_string();

        for (id, color, opponent) in [
            (waiting_id, protocol::Color::White, nickname.clone()),
            (player_id, protocol::Color::Black, waiting_name.clone()),
        ] {
            pending.send(id, Response::Color(color));
            pending.send(id, Response::Opponent(opponent));
            pending.send(id, Response::BoardState(snapshot.clone()));
            pending.send(id, Response::Start);
        }

        tracing::info!(room_id, white = %waiting_name, black = %nickname, "配对成功");
        Ok(Some(Response::Nickname(nickname)))
    }

    /// 查找玩家所在房间，要求已设置昵称
    fn require_room(state: &ServerState, player_id: PlayerId) -> Result<RoomId, ServerError> {
        if state.players.get_nickname(player_id).is_none() {
            return Err(ServerError::NicknameRequired);
        }
        state
            .rooms
            .find_player_room(player_id)
            .ok_or(ServerError::NotInGame)
    }

    /// 处理走棋
    async fn handle_try_move(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> Result<Option<Response>, ServerError> {
        let room_id = Self::require_room(state, player_id)?;
        let room = state.rooms.get(room_id).ok_or(ServerError::NotInGame)?;
        let mut room = room.lock().await;

        let mv = room.make_move(player_id, from, to, promotion)?;
        tracing::debug!(room_id, player_id, %mv, "走子");

        if let Some(opponent_id) = room.get_opponent_id(player_id) {
            pending.send(opponent_id, Response::OpponentMove(mv));
        }

        match room.status() {
            GameStatus::Ongoing => {}
            GameStatus::Checkmate { winner } => {
                tracing::info!(room_id, %winner, "将杀，对局结束");
                pending.broadcast(room_id, Response::Winner(Some(winner)));
            }
            GameStatus::Stalemate => {
                tracing::info!(room_id, "逼和，对局结束");
                pending.broadcast(room_id, Response::Winner(None));
            }
        }

        Ok(Some(Response::DoneMove(mv)))
    }

    /// 处理合法走法查询
    async fn handle_get_legal_moves(
        state: &mut ServerState,
        player_id: PlayerId,
        square: Square,
    ) -> Result<Option<Response>, ServerError> {
        let room_id = Self::require_room(state, player_id)?;
        let room = state.rooms.get(room_id).ok_or(ServerError::NotInGame)?;
        let moves = room.lock().await.legal_moves(square);
        Ok(Some(Response::LegalMoves(moves)))
    }

    /// 处理棋盘查询
    async fn handle_get_board_state(
        state: &mut ServerState,
        player_id: PlayerId,
    ) -> Result<Option<Response>, ServerError> {
        let room_id = Self::require_room(state, player_id)?;
        let room = state.rooms.get(room_id).ok_or(ServerError::NotInGame)?;
        let snapshot = room.lock().await.snapshot();
        Ok(Some(Response::BoardState(snapshot)))
    }

    /// 处理玩家断线
    ///
    /// 通知对手并移除双方的全部注册信息，重复调用无副作用。
    pub async fn handle_disconnect(state: &mut ServerState, player_id: PlayerId) {
        let mut pending = PendingMessages::new();
        let mut opponent = None;

        if state.players.remove(player_id).is_some() {
            tracing::info!(player_id, "玩家断开连接");
        }

        if let Some(room_id) = state.rooms.find_player_room(player_id) {
            if let Some(room) = state.rooms.remove(room_id) {
                opponent = room.lock().await.get_opponent_id(player_id);
            }
            if let Some(opponent_id) = opponent {
                tracing::info!(room_id, opponent_id, "通知对手离开");
                pending.send(opponent_id, Response::OpponentLeft);
                state.players.remove(opponent_id);
            }
        }

        // 先把 OPPONENT_LEFT 放进对手的发送队列，再拆除连接
        pending.flush(state).await;

        state.close_connection(player_id);
        if let Some(opponent_id) = opponent {
            state.close_connection(opponent_id);
        }
    }
}
