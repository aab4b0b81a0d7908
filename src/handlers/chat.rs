//! 채팅 핸들러

use crate::error::{Error, Result};
use crate::protocol::ServerMessage;
use crate::state::{AppState, ConnectionContext};

/// 채팅 메시지를 방 전체에 그대로 전달 (저장하지 않음)
pub fn handle_chat_message(state: &AppState, ctx: &ConnectionContext, message: &str) -> Result<()> {
    let binding = ctx.session.binding()?;
    if message.trim().is_empty() {
        return Err(Error::EmptyMessage);
    }

    state.registry.with_room(&binding.room_id, |slot| {
        slot.broadcast(&ServerMessage::chat(&binding.identity, message));
        Ok(())
    })?;

    tracing::debug!(
        room_id = %binding.room_id,
        username = %binding.identity,
        "Relayed chat message"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmptyRoomPolicy;
    use crate::state::test_utils::{test_state, TestClient};

    #[test]
    fn chat_is_broadcast_verbatim_to_the_room() {
        let state = test_state(EmptyRoomPolicy::Retain);
        let room_id = state.registry.create_room("alice");
        let other_room = state.registry.create_room("carol");
        let mut alice = TestClient::connect(&state, &room_id, "alice");
        let mut bob = TestClient::connect(&state, &room_id, "bob");
        let mut carol = TestClient::connect(&state, &other_room, "carol");
        alice.drain();
        bob.drain();
        carol.drain();

        handle_chat_message(&state, &bob.ctx, "  hello there ").unwrap();

        for client in [&mut alice, &mut bob] {
            match client.drain().as_slice() {
                [ServerMessage::ChatMessage {
                    username, message, ..
                }] => {
                    assert_eq!(username, "bob");
                    assert_eq!(message, "  hello there ");
                }
                other => panic!("unexpected messages: {other:?}"),
            }
        }
        assert!(carol.drain().is_empty());
    }

    #[test]
    fn blank_or_unbound_chat_is_rejected() {
        let state = test_state(EmptyRoomPolicy::Retain);
        let room_id = state.registry.create_room("alice");
        let mut alice = TestClient::connect(&state, &room_id, "alice");
        let ghost = TestClient::connect(&state, "missing", "ghost");
        alice.drain();

        assert_eq!(
            handle_chat_message(&state, &alice.ctx, "   "),
            Err(Error::EmptyMessage)
        );
        assert_eq!(
            handle_chat_message(&state, &ghost.ctx, "boo"),
            Err(Error::Unbound)
        );
        assert!(alice.drain().is_empty());
    }
}
