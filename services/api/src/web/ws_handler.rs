//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and receive loop for a player WebSocket
//! connection. Each connection owns its `PlayerSession` exclusively and
//! commands are handled one at a time, in arrival order.

use crate::web::{
    player::PlayerSession,
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>, // from the auth middleware
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New player connection established for user: {}", user_id);

    let (mut sender, mut receiver) = socket.split();
    let mut player = PlayerSession::new(user_id);

    // --- 1. Initialization: push the user's track list ---
    match player.track_list(&app_state).await {
        Ok(list) => {
            if send_message(&mut sender, &list).await.is_err() {
                return;
            }
        }
        Err(e) => {
            warn!("Failed to load initial track list: {:?}", e);
            let msg = ServerMessage::Error {
                message: "Failed to load music".to_string(),
            };
            if send_message(&mut sender, &msg).await.is_err() {
                return;
            }
        }
    }

    // --- 2. Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => client_msg,
                    Err(e) => {
                        warn!("Failed to deserialize client message: {}", e);
                        continue;
                    }
                };

                for reply in player.handle(&app_state, client_msg).await {
                    if send_message(&mut sender, &reply).await.is_err() {
                        info!("Client went away mid-reply.");
                        return;
                    }
                }
            }
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // The session dies with its connection; nothing to persist.
    info!("Player connection closed for user: {}", user_id);
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).unwrap();
    sender.send(Message::Text(json.into())).await
}
