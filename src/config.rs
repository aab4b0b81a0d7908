//! 환경 변수 기반 설정 관리

use crate::board::BoardSize;
use std::env;
use std::str::FromStr;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub room: RoomConfig,
    pub board: BoardSize,
    pub log_level: String,
}

/// 방 설정
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// 마지막 참가자가 나간 방의 처리 방식
    pub on_empty: EmptyRoomPolicy,
    /// 빈 방 보존 한도 (0이면 정리하지 않음)
    pub timeout_ms: u64,
    pub cleanup_interval_secs: u64,
}

/// 빈 방 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyRoomPolicy {
    /// 즉시 삭제 (보드 포함)
    Delete,
    /// 재접속을 위해 유지
    #[default]
    Retain,
}

impl FromStr for EmptyRoomPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "retain" => Ok(Self::Retain),
            other => Err(format!("unknown empty room policy: {other}")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["*".to_string()],
            room: RoomConfig {
                on_empty: EmptyRoomPolicy::default(),
                timeout_ms: 3_600_000,
                cleanup_interval_secs: 300,
            },
            board: BoardSize::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Self {
            port: parse_var("PORT", defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            room: RoomConfig {
                on_empty: parse_var("ON_EMPTY_ROOM", defaults.room.on_empty),
                timeout_ms: parse_var("ROOM_TIMEOUT", defaults.room.timeout_ms),
                cleanup_interval_secs: parse_var(
                    "CLEANUP_INTERVAL_SECS",
                    defaults.room.cleanup_interval_secs,
                ),
            },
            board: BoardSize {
                cols: parse_var("BOARD_COLS", defaults.board.cols),
                rows: parse_var("BOARD_ROWS", defaults.board.rows),
            },
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// CORS 허용 목록이 와일드카드인지
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = %key, value = %raw, "Invalid config value, using default");
            default
        }),
        Err(_) => default,
    }
}
