//! 토큰 조작 핸들러
//!
//! 검증 후 방 뮤텍스 안에서 보드를 변경하고 같은 잠금 안에서 브로드캐스트한다.
//! 밀려난 토큰이 있으면 `token_removed` 를 먼저 보낸다.

use crate::board::Placement;
use crate::error::Result;
use crate::protocol::{RawPosition, ServerMessage};
use crate::registry::RoomSlot;
use crate::state::{AppState, ConnectionContext};

/// 토큰 추가. 새 토큰 ID 반환
pub fn handle_add_token(
    state: &AppState,
    ctx: &ConnectionContext,
    token_type: &str,
    position: &RawPosition,
) -> Result<String> {
    let binding = ctx.session.binding()?;
    let position = position.to_position()?;

    let token_id = state.registry.with_room(&binding.room_id, |slot| {
        let (token_id, placement) = slot.board.add_token(token_type, position)?;
        announce_eviction(slot, &placement, &binding.identity);
        slot.broadcast(&ServerMessage::TokenAdded {
            token_id: token_id.clone(),
            token_type: token_type.to_string(),
            position,
            added_by: binding.identity.clone(),
        });
        Ok(token_id)
    })?;

    tracing::debug!(
        room_id = %binding.room_id,
        token_id = %token_id,
        position = %position,
        added_by = %binding.identity,
        "Token added"
    );
    Ok(token_id)
}

/// 토큰 이동
pub fn handle_move_token(
    state: &AppState,
    ctx: &ConnectionContext,
    token_id: &str,
    position: &RawPosition,
) -> Result<Placement> {
    let binding = ctx.session.binding()?;
    let position = position.to_position()?;

    let placement = state.registry.with_room(&binding.room_id, |slot| {
        let placement = slot.board.move_token(token_id, position)?;
        announce_eviction(slot, &placement, &binding.identity);
        slot.broadcast(&ServerMessage::TokenMoved {
            token_id: token_id.to_string(),
            position,
            moved_by: binding.identity.clone(),
        });
        Ok(placement)
    })?;

    tracing::debug!(
        room_id = %binding.room_id,
        token_id = %token_id,
        position = %position,
        moved_by = %binding.identity,
        "Token moved"
    );
    Ok(placement)
}

/// 토큰 제거
pub fn handle_remove_token(state: &AppState, ctx: &ConnectionContext, token_id: &str) -> Result<()> {
    let binding = ctx.session.binding()?;

    state.registry.with_room(&binding.room_id, |slot| {
        slot.board.remove_token(token_id)?;
        slot.broadcast(&ServerMessage::TokenRemoved {
            token_id: token_id.to_string(),
            removed_by: binding.identity.clone(),
        });
        Ok(())
    })?;

    tracing::debug!(
        room_id = %binding.room_id,
        token_id = %token_id,
        removed_by = %binding.identity,
        "Token removed"
    );
    Ok(())
}

fn announce_eviction(slot: &RoomSlot, placement: &Placement, identity: &str) {
    if let Some(evicted) = placement.evicted() {
        slot.broadcast(&ServerMessage::TokenRemoved {
            token_id: evicted.to_string(),
            removed_by: identity.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::config::EmptyRoomPolicy;
    use crate::error::Error;
    use crate::state::test_utils::{test_state, TestClient};
    use crate::state::AppState;
    use serde_json::json;
    use std::sync::Arc;

    fn at(col: i64, row: i64) -> RawPosition {
        Position::new(col, row).into()
    }

    /// alice, bob 이 들어와 있는 방
    fn two_player_room() -> (Arc<AppState>, String, TestClient, TestClient) {
        let state = test_state(EmptyRoomPolicy::Retain);
        let room_id = state.registry.create_room("alice");
        let mut alice = TestClient::connect(&state, &room_id, "alice");
        let mut bob = TestClient::connect(&state, &room_id, "bob");
        alice.drain();
        bob.drain();
        (state, room_id, alice, bob)
    }

    #[test]
    fn add_token_is_broadcast_to_every_member() {
        let (state, room_id, mut alice, mut bob) = two_player_room();

        let token_id = handle_add_token(&state, &alice.ctx, "red", &at(1, 1)).unwrap();

        let expected = ServerMessage::TokenAdded {
            token_id: token_id.clone(),
            token_type: "red".to_string(),
            position: Position::new(1, 1),
            added_by: "alice".to_string(),
        };
        assert_eq!(alice.drain(), vec![expected.clone()]);
        assert_eq!(bob.drain(), vec![expected]);
        let board = state.registry.get_board_state(&room_id).unwrap();
        assert_eq!(board.token(&token_id).unwrap().position, Position::new(1, 1));
    }

    #[test]
    fn out_of_bounds_move_is_dropped_without_broadcast() {
        let (state, room_id, mut alice, mut bob) = two_player_room();
        let token_id = handle_add_token(&state, &alice.ctx, "red", &at(1, 1)).unwrap();
        alice.drain();
        bob.drain();

        let result = handle_move_token(&state, &alice.ctx, &token_id, &at(15, 1));

        assert!(matches!(result, Err(Error::InvalidPosition(_))));
        assert!(alice.drain().is_empty());
        assert!(bob.drain().is_empty());
        let board = state.registry.get_board_state(&room_id).unwrap();
        assert_eq!(board.token(&token_id).unwrap().position, Position::new(1, 1));
    }

    #[test]
    fn non_integer_coordinates_are_rejected() {
        let (state, _room_id, alice, _bob) = two_player_room();
        let position = RawPosition {
            col: json!(1.5),
            row: json!(2),
        };

        let result = handle_add_token(&state, &alice.ctx, "red", &position);

        assert!(matches!(result, Err(Error::InvalidPosition(_))));
    }

    #[test]
    fn move_onto_occupied_cell_announces_eviction_first() {
        let (state, room_id, mut alice, mut bob) = two_player_room();
        let a = handle_add_token(&state, &alice.ctx, "red", &at(2, 3)).unwrap();
        let b = handle_add_token(&state, &bob.ctx, "blue", &at(5, 5)).unwrap();
        alice.drain();
        bob.drain();

        let placement = handle_move_token(&state, &bob.ctx, &b, &at(2, 3)).unwrap();

        assert_eq!(placement, Placement::PlacedAndEvicted(a.clone()));
        assert_eq!(
            alice.drain(),
            vec![
                ServerMessage::TokenRemoved {
                    token_id: a,
                    removed_by: "bob".to_string(),
                },
                ServerMessage::TokenMoved {
                    token_id: b.clone(),
                    position: Position::new(2, 3),
                    moved_by: "bob".to_string(),
                },
            ]
        );
        let board = state.registry.get_board_state(&room_id).unwrap();
        assert_eq!(board.token_at(Position::new(2, 3)), Some(b.as_str()));
        assert_eq!(board.token_count(), 1);
    }

    #[test]
    fn add_onto_occupied_cell_replaces_prior_token() {
        let (state, room_id, mut alice, _bob) = two_player_room();
        let a = handle_add_token(&state, &alice.ctx, "red", &at(2, 3)).unwrap();
        alice.drain();

        let b = handle_add_token(&state, &alice.ctx, "blue", &at(2, 3)).unwrap();

        let messages = alice.drain();
        assert_eq!(
            messages[0],
            ServerMessage::TokenRemoved {
                token_id: a,
                removed_by: "alice".to_string(),
            }
        );
        assert!(matches!(&messages[1], ServerMessage::TokenAdded { token_id, .. } if *token_id == b));
        let board = state.registry.get_board_state(&room_id).unwrap();
        assert_eq!(board.token_count(), 1);
    }

    #[test]
    fn removing_unknown_token_is_silent() {
        let (state, _room_id, mut alice, mut bob) = two_player_room();

        let result = handle_remove_token(&state, &alice.ctx, "nonexistent");

        assert_eq!(result, Err(Error::UnknownToken("nonexistent".to_string())));
        assert!(alice.drain().is_empty());
        assert!(bob.drain().is_empty());
    }

    #[test]
    fn add_move_remove_round_trip_empties_board() {
        let (state, room_id, mut alice, mut bob) = two_player_room();

        let token_id = handle_add_token(&state, &alice.ctx, "red", &at(0, 0)).unwrap();
        handle_move_token(&state, &bob.ctx, &token_id, &at(9, 9)).unwrap();
        handle_remove_token(&state, &bob.ctx, &token_id).unwrap();

        let board = state.registry.get_board_state(&room_id).unwrap();
        assert!(board.get_state().tokens.is_empty());
        assert_eq!(
            bob.drain().last(),
            Some(&ServerMessage::TokenRemoved {
                token_id,
                removed_by: "bob".to_string(),
            })
        );
        assert_eq!(alice.drain().len(), 3);
    }

    #[test]
    fn unbound_connections_cannot_touch_the_board() {
        let (state, room_id, mut alice, _bob) = two_player_room();
        let ghost = TestClient::connect(&state, "missing", "ghost");

        assert_eq!(
            handle_add_token(&state, &ghost.ctx, "red", &at(1, 1)),
            Err(Error::Unbound)
        );
        assert_eq!(handle_remove_token(&state, &ghost.ctx, "x"), Err(Error::Unbound));
        assert!(alice.drain().is_empty());
        assert_eq!(state.registry.get_board_state(&room_id).unwrap().token_count(), 0);
    }
}
