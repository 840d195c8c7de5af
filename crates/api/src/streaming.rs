//! WebSocket streaming API.
//!
//! Clients join named rooms and receive every poll event published to any
//! room they joined. The `polls` room carries all events; each poll also has
//! its own `poll<id>` room for watchers of a single session.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::middleware::AppState;

/// Room that receives every poll event.
pub const POLLS_ROOM: &str = "polls";

/// Room scoped to a single poll.
#[must_use]
pub fn poll_room(poll_id: &str) -> String {
    format!("poll{poll_id}")
}

/// Server-to-client poll event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum PollMessage {
    /// A poll was created.
    Created(serde_json::Value),
    /// A poll's ledger changed; carries the updated projection.
    Updated(serde_json::Value),
    /// A poll was deleted; carries the poll id.
    Deleted(String),
}

/// One published event and the rooms it targets.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    /// Rooms this event is delivered to.
    pub rooms: Vec<String>,
    /// The event payload.
    pub message: PollMessage,
}

/// Client-to-server message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientMessage {
    /// Join a room.
    Room { room: String },
    /// Leave a room.
    Leave { room: String },
}

/// Shared state for streaming.
#[derive(Clone)]
pub struct StreamingState {
    tx: Arc<broadcast::Sender<RoomEvent>>,
}

impl StreamingState {
    /// Create a new streaming state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self { tx: Arc::new(tx) }
    }

    /// Publish an event to the given rooms.
    ///
    /// Delivery is best-effort: with no connected subscribers the event is
    /// dropped.
    pub fn publish(&self, rooms: Vec<String>, message: PollMessage) {
        let _ = self.tx.send(RoomEvent { rooms, message });
    }

    /// Subscribe to all published events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.tx.subscribe()
    }
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade handler.
pub async fn streaming_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.streaming))
}

async fn handle_socket(socket: WebSocket, streaming: StreamingState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = streaming.subscribe();
    let mut joined: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if !event.rooms.iter().any(|room| joined.contains(room)) {
                        continue;
                    }
                    match serde_json::to_string(&event.message) {
                        Ok(text) => {
                            if sender.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to encode stream event"),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Streaming client lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Room { room }) => {
                            joined.insert(room);
                        }
                        Ok(ClientMessage::Leave { room }) => {
                            joined.remove(&room);
                        }
                        Err(e) => debug!(error = %e, "Ignoring malformed client message"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_room_name() {
        assert_eq!(poll_room("abc"), "pollabc");
    }

    #[test]
    fn test_message_wire_shape() {
        let message = PollMessage::Deleted("p1".to_string());
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "deleted", "data": "p1" }));
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let streaming = StreamingState::new();
        let mut rx = streaming.subscribe();

        streaming.publish(
            vec![POLLS_ROOM.to_string()],
            PollMessage::Deleted("p1".to_string()),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.rooms, vec!["polls"]);
    }
}
