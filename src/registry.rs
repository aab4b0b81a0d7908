//! 방 레지스트리 (방 목록, 참가자 명단, 방별 보드)

use crate::board::{BoardSize, BoardState};
use crate::error::{Error, Result};
use crate::protocol::ServerMessage;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// 방 정보
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: String,
    pub creator: String,
    participants: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(id: String, creator: String) -> Self {
        Self {
            id,
            participants: vec![creator.clone()],
            creator,
            created_at: Utc::now(),
        }
    }

    /// 입장 순서대로 정렬된 참가자 명단
    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn has_participant(&self, identity: &str) -> bool {
        self.participants.iter().any(|p| p == identity)
    }

    /// 이미 있으면 아무것도 하지 않음. 새로 추가되면 true
    pub fn add_participant(&mut self, identity: &str) -> bool {
        if self.has_participant(identity) {
            return false;
        }
        self.participants.push(identity.to_string());
        true
    }

    /// 없으면 아무것도 하지 않음. 제거되면 true
    pub fn remove_participant(&mut self, identity: &str) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p != identity);
        self.participants.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

/// 방에 연결된 소켓
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub identity: String,
    pub sender: UnboundedSender<ServerMessage>,
}

/// 방 하나의 공유 상태. 방 단위 뮤텍스 안에서만 접근한다.
#[derive(Debug)]
pub struct RoomSlot {
    pub room: Room,
    pub board: BoardState,
    /// 연결 ID -> 구독자
    subscribers: HashMap<String, Subscriber>,
    last_active: DateTime<Utc>,
    closed: bool,
}

impl RoomSlot {
    fn new(room: Room, board_size: BoardSize) -> Self {
        let board = BoardState::new(room.id.clone(), board_size);
        Self {
            last_active: room.created_at,
            room,
            board,
            subscribers: HashMap::new(),
            closed: false,
        }
    }

    pub fn subscribe(
        &mut self,
        connection_id: &str,
        identity: &str,
        sender: UnboundedSender<ServerMessage>,
    ) {
        self.subscribers.insert(
            connection_id.to_string(),
            Subscriber {
                identity: identity.to_string(),
                sender,
            },
        );
        self.touch();
    }

    pub fn unsubscribe(&mut self, connection_id: &str) -> Option<Subscriber> {
        let subscriber = self.subscribers.remove(connection_id);
        self.touch();
        subscriber
    }

    /// 해당 이름으로 연결된 소켓이 남아 있는지
    pub fn is_connected(&self, identity: &str) -> bool {
        self.subscribers.values().any(|s| s.identity == identity)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// 방의 모든 연결에 메시지 전송 (응답을 기다리지 않음)
    pub fn broadcast(&self, message: &ServerMessage) {
        for subscriber in self.subscribers.values() {
            let _ = subscriber.sender.send(message.clone());
        }
    }

    pub fn send_to(&self, connection_id: &str, message: ServerMessage) {
        if let Some(subscriber) = self.subscribers.get(connection_id) {
            let _ = subscriber.sender.send(message);
        }
    }

    fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

pub type SharedRoom = Arc<Mutex<RoomSlot>>;

/// 참가자 제거 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub removed: bool,
    /// 제거 후 명단이 비었는지 (삭제 여부는 호출자가 결정)
    pub now_empty: bool,
}

/// 활성 방 레지스트리
pub struct RoomRegistry {
    rooms: DashMap<String, SharedRoom>,
    board_size: BoardSize,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(BoardSize::default())
    }
}

impl RoomRegistry {
    pub fn new(board_size: BoardSize) -> Self {
        Self {
            rooms: DashMap::new(),
            board_size,
        }
    }

    pub fn create_room(&self, creator: &str) -> String {
        loop {
            let room_id = generate_room_id();
            match self.rooms.entry(room_id.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(entry) => {
                    let room = Room::new(room_id.clone(), creator.to_string());
                    entry.insert(Arc::new(Mutex::new(RoomSlot::new(room, self.board_size))));
                    tracing::info!(room_id = %room_id, creator = %creator, "Room created");
                    return room_id;
                }
            }
        }
    }

    pub fn room_exists(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn get_room(&self, room_id: &str) -> Result<Room> {
        self.with_room(room_id, |slot| Ok(slot.room.clone()))
    }

    pub fn get_board_state(&self, room_id: &str) -> Result<BoardState> {
        self.with_room(room_id, |slot| Ok(slot.board.clone()))
    }

    pub fn add_participant(&self, room_id: &str, identity: &str) -> Result<bool> {
        self.with_room(room_id, |slot| {
            let added = slot.room.add_participant(identity);
            slot.touch();
            Ok(added)
        })
    }

    pub fn remove_participant(&self, room_id: &str, identity: &str) -> Result<Departure> {
        self.with_room(room_id, |slot| {
            let removed = slot.room.remove_participant(identity);
            slot.touch();
            Ok(Departure {
                removed,
                now_empty: slot.room.is_empty(),
            })
        })
    }

    /// 방 뮤텍스를 잡은 채로 `f` 실행. 읽기-검증-쓰기를 원자적으로 처리할 때 사용
    pub fn with_room<R>(
        &self,
        room_id: &str,
        f: impl FnOnce(&mut RoomSlot) -> Result<R>,
    ) -> Result<R> {
        // DashMap 가드는 여기서 해제하고 방 뮤텍스만 잡는다
        let room = self
            .rooms
            .get(room_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotFound(room_id.to_string()))?;

        let mut slot = lock(&room);
        if slot.closed {
            return Err(Error::NotFound(room_id.to_string()));
        }
        f(&mut *slot)
    }

    /// 명단이 비어 있을 때만 삭제 (검사와 삭제가 원자적)
    pub fn delete_room_if_empty(&self, room_id: &str) -> bool {
        let deleted = self
            .rooms
            .remove_if(room_id, |_, room| {
                let mut slot = lock(room);
                if slot.room.is_empty() {
                    slot.closed = true;
                    true
                } else {
                    false
                }
            })
            .is_some();

        if deleted {
            tracing::info!(room_id = %room_id, "Room deleted");
        }
        deleted
    }

    /// 연결이 하나도 없고 `max_idle` 이상 활동이 없던 방 정리.
    /// 한 번도 접속하지 않은 생성자가 명단에 남아 있어도 정리 대상이다.
    pub fn cleanup_idle_rooms(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let mut deleted = 0;

        self.rooms.retain(|room_id, room| {
            let mut slot = lock(room);
            let idle = now - slot.last_active;
            if slot.subscriber_count() == 0 && idle > max_idle {
                slot.closed = true;
                tracing::info!(
                    room_id = %room_id,
                    idle_ms = idle.num_milliseconds(),
                    "Cleaned up idle room"
                );
                deleted += 1;
                false
            } else {
                true
            }
        });

        deleted
    }
}

fn generate_room_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

fn lock(room: &Mutex<RoomSlot>) -> MutexGuard<'_, RoomSlot> {
    room.lock().unwrap_or_else(PoisonError::into_inner)
}
