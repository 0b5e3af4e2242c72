//! WebSocket streams of live tournament events.
//!
//! Observers are read-only. Each connection holds one hub subscription and
//! receives every event for its topic as a JSON text frame, in publish order.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /api/v1/tournaments/{id}/live` or `GET /api/v1/live`
//! 2. Server subscribes to the event hub, then upgrades the connection
//! 3. Events are forwarded until the client leaves, the tournament is
//!    deleted, or the observer falls too far behind and is disconnected
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/api/v1/tournaments/4f9c0c1e-.../live');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === 'match_updated') {
//!     updateBracket(data.match_id, data.status, data.winner);
//!   }
//! };
//! ```

use axum::{
    extract::{
        Path, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use nexus_tournaments::{ObserverHandle, tournament::TournamentId};

use super::{AppState, error::ApiError};
use crate::metrics;

/// Stream one tournament's events.
///
/// # Response
///
/// Upgrades to WebSocket (101 Switching Protocols). Returns `404 Not Found`
/// without upgrading when the tournament doesn't exist.
pub async fn tournament_live(
    ws: WebSocketUpgrade,
    Path(tournament_id): Path<TournamentId>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    // Subscribing before the upgrade means no event published after the
    // handshake can be missed.
    let observer = state.service.subscribe(tournament_id).await?;
    Ok(ws.on_upgrade(move |socket| stream_events(socket, observer, "tournament")))
}

/// Stream tournament lifecycle events across all tournaments.
pub async fn lobby_live(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let observer = state.service.subscribe_lobby();
    ws.on_upgrade(move |socket| stream_events(socket, observer, "lobby"))
}

/// Forward events to the socket until either side goes away.
async fn stream_events(socket: WebSocket, mut observer: ObserverHandle, stream: &'static str) {
    let (mut sender, mut receiver) = socket.split();
    let observer_id = observer.id();

    info!(
        "WebSocket observer {} connected: {:?}",
        observer_id,
        observer.topic()
    );
    metrics::websocket_observer_connected(stream);

    loop {
        tokio::select! {
            event = observer.recv() => {
                let Some(event) = event else {
                    // Hub disconnected us: tournament deleted or buffer overrun
                    let frame = CloseFrame {
                        code: close_code::AWAY,
                        reason: "event stream closed".into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                };

                let json = match serde_json::to_string(event.as_ref()) {
                    Ok(j) => j,
                    Err(e) => {
                        error!("Failed to serialize {}: {}", event.event_type(), e);
                        continue;
                    }
                };

                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
                metrics::websocket_messages_sent();
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!("WebSocket observer {} read error: {}", observer_id, e);
                        break;
                    }
                    // Observers are read-only; anything else is ignored
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    observer.unsubscribe();
    metrics::websocket_observer_disconnected(stream);
    info!("WebSocket observer {} disconnected", observer_id);
}
