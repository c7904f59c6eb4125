use axum::{
    extract::{
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::web::AppState;

/// Upgrades to a websocket that relays every broadcaster event to the client.
pub async fn events_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_events_socket(socket, app_state))
}

async fn handle_events_socket(mut socket: WebSocket, app_state: Arc<AppState>) {
    let mut rx = app_state.events.subscribe();
    info!("New websocket client connected.");

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(msg) => {
                        if socket.send(Message::Text(Utf8Bytes::from(msg))).await.is_err() {
                            warn!("Client disconnected or error sending event.");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Websocket client lagging behind event stream.");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            incoming = socket.next() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        debug!("Received ping from client.");
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            warn!("Error sending pong to client.");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Websocket client disconnected.");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Clients have nothing to say to us; ignore.
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Websocket receive error.");
                        break;
                    }
                }
            }
        }
    }
}
