//! Hexboard 실시간 보드 세션 서버
//!
//! 방 단위로 참가자 명단, 채팅, 격자 보드 위 토큰을 공유한다.
//! 모든 상태는 메모리에만 있으며 방마다 하나의 뮤텍스로 직렬화된다.

pub mod board;
pub mod config;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod state;

pub use board::{BoardSize, BoardSnapshot, BoardState, Placement, Position, Token};
pub use config::{Config, EmptyRoomPolicy};
pub use error::Error;
pub use registry::{Departure, Room, RoomRegistry};
pub use state::AppState;
