//! 애플리케이션 상태 관리

use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::RoomRegistry;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// 애플리케이션 상태 (라우터와 모든 핸들러에 주입됨)
pub struct AppState {
    /// 방 레지스트리 (room_id -> 방 + 보드)
    pub registry: RoomRegistry,
    /// 활성 연결 (connection_id -> Connection)
    pub connections: DashMap<String, Connection>,
    /// 설정
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            registry: RoomRegistry::new(config.board),
            connections: DashMap::new(),
            config: Arc::new(config),
        }
    }
}

/// 연결과 (참가자, 방) 의 묶음. 바인딩 시 한 번만 정해진다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBinding {
    pub identity: String,
    pub room_id: String,
}

/// 연결 상태: Unbound -> Bound -> Closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Unbound,
    Bound(SessionBinding),
    Closed,
}

impl Session {
    pub fn binding(&self) -> Result<&SessionBinding> {
        match self {
            Session::Bound(binding) => Ok(binding),
            Session::Unbound | Session::Closed => Err(Error::Unbound),
        }
    }
}

/// 연결마다 모든 이벤트 핸들러에 전달되는 컨텍스트
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub connection_id: String,
    pub session: Session,
}

/// 연결 정보
#[derive(Debug, Clone)]
pub struct Connection {
    pub binding: Option<SessionBinding>,
    pub connected_at: DateTime<Utc>,
}
