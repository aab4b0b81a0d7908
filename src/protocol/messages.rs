//! 클라이언트-서버 메시지 프로토콜 정의

use crate::board::{BoardSnapshot, Position};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 시스템 알림에 쓰는 발신자 이름
pub const SYSTEM_USERNAME: &str = "System";

/// 시스템 발신자와 혼동되는 이름인지 (대소문자 무시)
pub fn is_reserved_username(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(SYSTEM_USERNAME)
}

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    // Chat
    ChatMessage {
        message: String,
    },

    // Board
    MoveToken {
        token_id: String,
        position: RawPosition,
    },
    AddToken {
        #[serde(default = "default_token_type")]
        token_type: String,
        position: RawPosition,
    },
    RemoveToken {
        token_id: String,
    },
}

fn default_token_type() -> String {
    "default".to_string()
}

/// 클라이언트가 보낸 좌표 (정수로 변환 가능한 값이면 허용)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPosition {
    pub col: Value,
    pub row: Value,
}

impl RawPosition {
    pub fn to_position(&self) -> Result<Position> {
        match (coerce_int(&self.col), coerce_int(&self.row)) {
            (Some(col), Some(row)) => Ok(Position::new(col, row)),
            _ => Err(Error::InvalidPosition(format!(
                "non-integer coordinates ({}, {})",
                self.col, self.row
            ))),
        }
    }
}

impl From<Position> for RawPosition {
    fn from(position: Position) -> Self {
        Self {
            col: position.col.into(),
            row: position.row.into(),
        }
    }
}

/// 정수, 소수부가 없는 실수, 정수 문자열
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    // Room Events
    UpdateUsers(Vec<String>),
    GameStateUpdate(BoardSnapshot),

    // Chat
    ChatMessage {
        username: String,
        message: String,
        timestamp: String,
    },

    // Board Events
    TokenMoved {
        token_id: String,
        position: Position,
        moved_by: String,
    },
    TokenAdded {
        token_id: String,
        token_type: String,
        position: Position,
        added_by: String,
    },
    TokenRemoved {
        token_id: String,
        removed_by: String,
    },
}

impl ServerMessage {
    pub fn chat(username: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::ChatMessage {
            username: username.into(),
            message: message.into(),
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::chat(SYSTEM_USERNAME, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn parses_snake_case_client_events() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "remove_token",
            "payload": {"token_id": "abc"}
        }))
        .unwrap();
        assert!(matches!(msg, ClientMessage::RemoveToken { token_id } if token_id == "abc"));

        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "chat_message",
            "payload": {"message": "hi"}
        }))
        .unwrap();
        assert!(matches!(msg, ClientMessage::ChatMessage { message } if message == "hi"));
    }

    #[test]
    fn add_token_type_defaults() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "add_token",
            "payload": {"position": {"col": 1, "row": 2}}
        }))
        .unwrap();
        match msg {
            ClientMessage::AddToken { token_type, position } => {
                assert_eq!(token_type, "default");
                assert_eq!(position.to_position().unwrap(), Position::new(1, 2));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn missing_fields_fail_to_parse() {
        let result = serde_json::from_value::<ClientMessage>(json!({
            "type": "move_token",
            "payload": {"token_id": "abc"}
        }));
        assert!(result.is_err());

        let result = serde_json::from_value::<ClientMessage>(json!({
            "type": "teleport_token",
            "payload": {}
        }));
        assert!(result.is_err());
    }

    #[rstest]
    #[case(json!(3), json!(4), Some(Position::new(3, 4)))]
    #[case(json!(3.0), json!(-1), Some(Position::new(3, -1)))]
    #[case(json!("7"), json!(" 2 "), Some(Position::new(7, 2)))]
    #[case(json!(3.5), json!(4), None)]
    #[case(json!("x"), json!(4), None)]
    #[case(json!(null), json!(4), None)]
    #[case(json!([1]), json!(4), None)]
    fn coerces_coordinates(#[case] col: Value, #[case] row: Value, #[case] expected: Option<Position>) {
        let raw = RawPosition { col, row };
        assert_eq!(raw.to_position().ok(), expected);
    }

    #[test]
    fn server_events_use_wire_names() {
        let json = serde_json::to_value(ServerMessage::TokenAdded {
            token_id: "t1".to_string(),
            token_type: "red".to_string(),
            position: Position::new(1, 1),
            added_by: "alice".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            json!({
                "type": "token_added",
                "payload": {
                    "token_id": "t1",
                    "token_type": "red",
                    "position": {"col": 1, "row": 1},
                    "added_by": "alice"
                }
            })
        );

        let json = serde_json::to_value(ServerMessage::UpdateUsers(vec!["alice".to_string()])).unwrap();
        assert_eq!(json, json!({"type": "update_users", "payload": ["alice"]}));
    }

    #[test]
    fn system_messages_carry_timestamp() {
        match ServerMessage::system("bob has left the room") {
            ServerMessage::ChatMessage { username, message, timestamp } => {
                assert_eq!(username, SYSTEM_USERNAME);
                assert_eq!(message, "bob has left the room");
                assert_eq!(timestamp.len(), 8);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
