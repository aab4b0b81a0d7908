//! 방 관리 핸들러 (HTTP 핸드셰이크, 빈 방 정리)

use crate::error::{Error, Result};
use crate::protocol::is_reserved_username;
use crate::registry::Room;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UsernameRequest {
    #[serde(default)]
    pub username: String,
}

/// WebSocket 연결 시 `/ws?room_id=..&username=..` 로 넘기는 값
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomTicket {
    pub room_id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct RoomView {
    #[serde(flatten)]
    pub room: Room,
    pub connections: usize,
}

/// 방 생성
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UsernameRequest>,
) -> Result<(StatusCode, Json<RoomTicket>)> {
    let username = validate_username(&request.username)?;
    let room_id = state.registry.create_room(&username);

    Ok((StatusCode::CREATED, Json(RoomTicket { room_id, username })))
}

/// 기존 방 참여 확인 (명단 등록은 WebSocket 연결 시)
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(request): Json<UsernameRequest>,
) -> Result<Json<RoomTicket>> {
    let username = validate_username(&request.username)?;
    let room_id = room_id.trim().to_string();
    if !state.registry.room_exists(&room_id) {
        tracing::info!(room_id = %room_id, username = %username, "Join rejected, room not found");
        return Err(Error::NotFound(room_id));
    }

    tracing::info!(room_id = %room_id, username = %username, "Join accepted");
    Ok(Json(RoomTicket { room_id, username }))
}

/// 방 정보 조회
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomView>> {
    let view = state.registry.with_room(&room_id, |slot| {
        Ok(RoomView {
            room: slot.room.clone(),
            connections: slot.subscriber_count(),
        })
    })?;
    Ok(Json(view))
}

fn validate_username(raw: &str) -> Result<String> {
    let username = raw.trim();
    if username.is_empty() || is_reserved_username(username) {
        return Err(Error::InvalidUsername);
    }
    Ok(username.to_string())
}

/// 연결 없이 오래 방치된 방 정리
pub async fn cleanup_idle_rooms(state: Arc<AppState>) {
    let timeout_ms = state.config.room.timeout_ms;
    if timeout_ms == 0 {
        return;
    }

    let max_idle = chrono::Duration::milliseconds(i64::try_from(timeout_ms).unwrap_or(i64::MAX));
    let deleted = state.registry.cleanup_idle_rooms(max_idle);

    if deleted > 0 {
        tracing::info!(deleted_rooms = deleted, "Cleanup completed");
    }
}
