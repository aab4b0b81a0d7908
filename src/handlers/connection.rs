//! 연결 핸들러 (바인딩, 입장/퇴장)

use crate::config::EmptyRoomPolicy;
use crate::error::{Error, Result};
use crate::protocol::{is_reserved_username, ServerMessage};
use crate::state::{AppState, Connection, ConnectionContext, Session, SessionBinding};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// 핸드셰이크 결과로 전달되는 (방, 이름) 쌍
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinParams {
    pub room_id: Option<String>,
    pub username: Option<String>,
}

/// 새 연결 처리. 유효한 (방, 이름) 쌍이면 Bound, 아니면 Unbound 로 남는다.
pub fn handle_connection(
    state: &AppState,
    params: &JoinParams,
    sender: UnboundedSender<ServerMessage>,
) -> ConnectionContext {
    let connection_id = Uuid::new_v4().to_string();

    let session = match bind(state, &connection_id, params, sender) {
        Ok(binding) => {
            tracing::info!(
                connection_id = %connection_id,
                room_id = %binding.room_id,
                username = %binding.identity,
                "Connection bound to room"
            );
            Session::Bound(binding)
        }
        Err(err) => {
            tracing::info!(connection_id = %connection_id, reason = %err, "Connection left unbound");
            Session::Unbound
        }
    };

    state.connections.insert(
        connection_id.clone(),
        Connection {
            binding: session.binding().ok().cloned(),
            connected_at: Utc::now(),
        },
    );

    ConnectionContext {
        connection_id,
        session,
    }
}

fn bind(
    state: &AppState,
    connection_id: &str,
    params: &JoinParams,
    sender: UnboundedSender<ServerMessage>,
) -> Result<SessionBinding> {
    let identity = params
        .username
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty() && !is_reserved_username(name))
        .ok_or(Error::InvalidUsername)?;
    let room_id = params
        .room_id
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| Error::NotFound(String::new()))?;

    state.registry.with_room(room_id, |slot| {
        let first_connection = !slot.is_connected(identity);
        slot.subscribe(connection_id, identity, sender);
        slot.room.add_participant(identity);

        slot.broadcast(&ServerMessage::UpdateUsers(slot.room.participants().to_vec()));
        slot.send_to(
            connection_id,
            ServerMessage::GameStateUpdate(slot.board.get_state()),
        );
        if first_connection {
            slot.broadcast(&ServerMessage::system(format!(
                "{identity} has joined the room"
            )));
        }
        Ok(())
    })?;

    Ok(SessionBinding {
        identity: identity.to_string(),
        room_id: room_id.to_string(),
    })
}

/// 연결 해제 처리
pub fn handle_disconnect(state: &AppState, ctx: &mut ConnectionContext) {
    if let Some((_, connection)) = state.connections.remove(&ctx.connection_id) {
        let duration = Utc::now() - connection.connected_at;
        tracing::info!(
            connection_id = %ctx.connection_id,
            room_id = ?connection.binding.as_ref().map(|b| &b.room_id),
            duration_secs = duration.num_seconds(),
            "Connection closed"
        );
    }

    let session = std::mem::replace(&mut ctx.session, Session::Closed);
    let Session::Bound(binding) = session else {
        return;
    };

    let left = state.registry.with_room(&binding.room_id, |slot| {
        slot.unsubscribe(&ctx.connection_id);

        // 같은 이름의 다른 연결이 남아 있으면 명단은 그대로
        if slot.is_connected(&binding.identity) {
            return Ok(None);
        }
        if !slot.room.remove_participant(&binding.identity) {
            return Ok(None);
        }

        slot.broadcast(&ServerMessage::UpdateUsers(slot.room.participants().to_vec()));
        slot.broadcast(&ServerMessage::system(format!(
            "{} has left the room",
            binding.identity
        )));
        Ok(Some(slot.room.is_empty()))
    });

    match left {
        Ok(Some(now_empty)) => {
            tracing::info!(
                room_id = %binding.room_id,
                username = %binding.identity,
                now_empty = now_empty,
                "User left room"
            );
            if now_empty && state.config.room.on_empty == EmptyRoomPolicy::Delete {
                state.registry.delete_room_if_empty(&binding.room_id);
            }
        }
        Ok(None) => {}
        Err(err) => {
            tracing::debug!(room_id = %binding.room_id, reason = %err, "Disconnect from missing room");
        }
    }
}
