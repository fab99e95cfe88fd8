use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::event::OrderEvent;
use crate::state::AppState;

/// Optional query filters: `?store_id=` for a store dashboard,
/// `?order_id=` for a customer tracking page. Both given means both must
/// match.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WsFilter {
    pub store_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
}

impl WsFilter {
    fn matches(&self, event: &OrderEvent) -> bool {
        if let Some(store_id) = self.store_id {
            if event.store_id != Some(store_id) {
                return false;
            }
        }

        if let Some(order_id) = self.order_id {
            if event.order_id != order_id {
                return false;
            }
        }

        true
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(filter): Query<WsFilter>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, filter))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, filter: WsFilter) {
    let (mut sender, mut receiver) = socket.split();
    let rx = state.order_events_tx.subscribe();

    info!("websocket client connected");

    let send_task = tokio::spawn(async move {
        let mut events = BroadcastStream::new(rx);

        while let Some(result) = events.next().await {
            let event = match result {
                Ok(event) => event,
                // Lagged behind the feed; skip the missed events and catch up.
                Err(_) => continue,
            };

            if !filter.matches(&event) {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize order event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}
