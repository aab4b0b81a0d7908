//! 에러 정의

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("room not found: {0}")]
    NotFound(String),

    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("connection is not bound to a room")]
    Unbound,

    #[error("empty chat message")]
    EmptyMessage,

    #[error("invalid username")]
    InvalidUsername,
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
