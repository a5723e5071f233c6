//! Handshake and socket loop for the live lead channel.
//!
//! The server pings every [`HEARTBEAT_INTERVAL_SECS`] seconds and drops the
//! subscription when the client closes or the bus shuts down.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use leadflow_core::types::DbId;
use leadflow_events::LeadSubscription;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Interval between keep-alive pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Browsers cannot set headers on a WebSocket handshake, so the bearer
/// token travels as a query parameter.
#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    pub token: String,
}

/// GET /api/v1/leads/{id}/live
///
/// Authenticates and checks the lead exists before upgrading, so failures
/// are reported as ordinary JSON errors.
pub async fn live_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(lead_id): Path<DbId>,
    Query(query): Query<LiveQuery>,
) -> AppResult<impl IntoResponse> {
    let user = AuthUser::from_token(&query.token, &state.config.jwt)?;
    state.leads.get(lead_id).await?;

    let subscription = state.event_bus.subscribe_lead(lead_id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, subscription, user.user_id)))
}

/// Forward events to the client until either side goes away.
///
/// A spawned sender task drains the subscription (plus periodic pings) into
/// the sink while the current task watches the inbound stream for close.
async fn handle_socket(socket: WebSocket, mut subscription: LeadSubscription, user_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let lead_id = subscription.lead_id();
    tracing::info!(conn_id = %conn_id, lead_id, user_id, "Live lead channel connected");

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        heartbeat.tick().await;
        loop {
            let msg = tokio::select! {
                event = subscription.recv() => {
                    let Some(event) = event else { break };
                    match serde_json::to_string(&event) {
                        Ok(text) => Message::Text(text.into()),
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize lead event");
                            continue;
                        }
                    }
                }
                _ = heartbeat.tick() => Message::Ping(Vec::new().into()),
            };
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            // The channel is one-way; client frames are ignored.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!(conn_id = %conn_id, lead_id, "Live lead channel disconnected");
}
