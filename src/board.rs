//! 방 하나의 보드 상태 (격자 위 토큰 배치)
//!
//! 한 칸에는 토큰 하나만 놓일 수 있고, 이미 점유된 칸에 놓거나 옮기면
//! 기존 토큰이 밀려난다 (`Placement::PlacedAndEvicted`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// 보드 크기 (열 × 행)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSize {
    pub cols: u32,
    pub rows: u32,
}

impl Default for BoardSize {
    fn default() -> Self {
        Self { cols: 10, rows: 10 }
    }
}

impl BoardSize {
    /// `0 <= col < cols`, `0 <= row < rows`
    pub fn contains(&self, position: Position) -> bool {
        (0..i64::from(self.cols)).contains(&position.col)
            && (0..i64::from(self.rows)).contains(&position.row)
    }
}

/// 격자 좌표
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub col: i64,
    pub row: i64,
}

impl Position {
    pub const fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// 보드 위 토큰
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub token_type: String,
    pub position: Position,
}

/// 배치 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Placed,
    /// 목표 칸에 있던 토큰을 밀어내고 배치함
    PlacedAndEvicted(String),
}

impl Placement {
    pub fn evicted(&self) -> Option<&str> {
        match self {
            Placement::Placed => None,
            Placement::PlacedAndEvicted(id) => Some(id),
        }
    }
}

/// `game_state_update` 로 내보내는 보드 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub tokens: HashMap<String, Token>,
    pub board_size: BoardSize,
}

/// 방 하나의 토큰 상태
#[derive(Debug, Clone)]
pub struct BoardState {
    room_id: String,
    board_size: BoardSize,
    tokens: HashMap<String, Token>,
    /// 좌표 -> 토큰 ID (tokens 와 항상 일치)
    occupancy: HashMap<Position, String>,
}

impl BoardState {
    pub fn new(room_id: impl Into<String>, board_size: BoardSize) -> Self {
        Self {
            room_id: room_id.into(),
            board_size,
            tokens: HashMap::new(),
            occupancy: HashMap::new(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn board_size(&self) -> BoardSize {
        self.board_size
    }

    pub fn token(&self, token_id: &str) -> Option<&Token> {
        self.tokens.get(token_id)
    }

    pub fn token_at(&self, position: Position) -> Option<&str> {
        self.occupancy.get(&position).map(String::as_str)
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// 토큰 추가. 점유된 칸이면 기존 토큰을 먼저 제거한다.
    pub fn add_token(
        &mut self,
        token_type: impl Into<String>,
        position: Position,
    ) -> Result<(String, Placement)> {
        self.check_bounds(position)?;

        let placement = match self.evict_at(position) {
            Some(evicted) => Placement::PlacedAndEvicted(evicted),
            None => Placement::Placed,
        };

        let token_id = Uuid::new_v4().to_string();
        self.tokens.insert(
            token_id.clone(),
            Token {
                token_type: token_type.into(),
                position,
            },
        );
        self.occupancy.insert(position, token_id.clone());

        Ok((token_id, placement))
    }

    /// 토큰 이동. 목표 칸의 다른 토큰은 밀려난다. 토큰 ID 는 유지된다.
    pub fn move_token(&mut self, token_id: &str, new_position: Position) -> Result<Placement> {
        let current = self
            .tokens
            .get(token_id)
            .map(|token| token.position)
            .ok_or_else(|| Error::UnknownToken(token_id.to_string()))?;
        self.check_bounds(new_position)?;

        if current == new_position {
            return Ok(Placement::Placed);
        }

        let placement = match self.evict_at(new_position) {
            Some(evicted) => Placement::PlacedAndEvicted(evicted),
            None => Placement::Placed,
        };

        self.occupancy.remove(&current);
        self.occupancy.insert(new_position, token_id.to_string());
        if let Some(token) = self.tokens.get_mut(token_id) {
            token.position = new_position;
        }

        Ok(placement)
    }

    pub fn remove_token(&mut self, token_id: &str) -> Result<Token> {
        let token = self
            .tokens
            .remove(token_id)
            .ok_or_else(|| Error::UnknownToken(token_id.to_string()))?;
        self.occupancy.remove(&token.position);
        Ok(token)
    }

    pub fn get_state(&self) -> BoardSnapshot {
        BoardSnapshot {
            tokens: self.tokens.clone(),
            board_size: self.board_size,
        }
    }

    fn check_bounds(&self, position: Position) -> Result<()> {
        if self.board_size.contains(position) {
            Ok(())
        } else {
            Err(Error::InvalidPosition(format!(
                "{} outside {}x{} board",
                position, self.board_size.cols, self.board_size.rows
            )))
        }
    }

    fn evict_at(&mut self, position: Position) -> Option<String> {
        let evicted = self.occupancy.remove(&position)?;
        self.tokens.remove(&evicted);
        tracing::debug!(
            room_id = %self.room_id,
            token_id = %evicted,
            position = %position,
            "Token evicted"
        );
        Some(evicted)
    }
}
