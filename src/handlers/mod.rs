//! 핸들러 모듈

pub mod chat;
pub mod connection;
pub mod room;
pub mod token;

pub use chat::*;
pub use connection::*;
pub use room::*;
pub use token::*;
