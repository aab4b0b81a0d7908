//! HTTP 라우터와 WebSocket 연결 루프

use crate::config::Config;
use crate::handlers::{self, JoinParams};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, ConnectionContext};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderValue,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/rooms", post(handlers::create_room))
        .route("/rooms/:room_id", get(handlers::get_room))
        .route("/rooms/:room_id/join", post(handlers::join_room))
        .route("/ws", get(ws_handler))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = if config.allows_any_origin() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn index_handler() -> Html<&'static str> {
    Html("<h1>Hexboard Session Server</h1><p>WebSocket endpoint: /ws?room_id=..&amp;username=..</p>")
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": "hexboard-server",
        "rooms": state.registry.room_count(),
        "connections": state.connections.len(),
        "timestamp": chrono::Utc::now().timestamp()
    }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<JoinParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, params: JoinParams) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // 연결 처리 (방 바인딩)
    let mut ctx = handlers::handle_connection(&state, &params, tx);

    // 송신 태스크
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    // 수신 처리
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => handle_client_message(&state, &ctx, msg),
                Err(err) => {
                    tracing::debug!(
                        connection_id = %ctx.connection_id,
                        error = %err,
                        "Dropped malformed message"
                    );
                }
            },
            Ok(Message::Binary(_)) => {
                tracing::debug!(connection_id = %ctx.connection_id, "Dropped binary frame");
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    // 연결 해제
    handlers::handle_disconnect(&state, &mut ctx);
    send_task.abort();
}

/// 이벤트 처리. 실패한 요청은 기록만 하고 조용히 버린다.
pub fn handle_client_message(state: &AppState, ctx: &ConnectionContext, msg: ClientMessage) {
    let result = match msg {
        ClientMessage::ChatMessage { message } => {
            handlers::handle_chat_message(state, ctx, &message)
        }
        ClientMessage::MoveToken { token_id, position } => {
            handlers::handle_move_token(state, ctx, &token_id, &position).map(|_| ())
        }
        ClientMessage::AddToken {
            token_type,
            position,
        } => handlers::handle_add_token(state, ctx, &token_type, &position).map(|_| ()),
        ClientMessage::RemoveToken { token_id } => {
            handlers::handle_remove_token(state, ctx, &token_id)
        }
    };

    if let Err(err) = result {
        tracing::debug!(
            connection_id = %ctx.connection_id,
            reason = %err,
            "Dropped client event"
        );
    }
}
