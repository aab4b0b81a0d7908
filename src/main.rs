//! Hexboard 실시간 보드 세션 서버

use anyhow::Context;
use hexboard_server::{handlers, server, AppState, Config};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = Arc::new(AppState::new(config.clone()));

    // 연결 없는 방 정리 스케줄러
    if config.room.timeout_ms > 0 {
        let cleanup_state = state.clone();
        let period = config.room.cleanup_interval_secs.max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(period));
            loop {
                interval.tick().await;
                handlers::cleanup_idle_rooms(cleanup_state.clone()).await;
            }
        });
    }

    let app = server::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Hexboard session server started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);
    tracing::info!(
        board_cols = config.board.cols,
        board_rows = config.board.rows,
        on_empty_room = ?config.room.on_empty,
        "Room settings"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
