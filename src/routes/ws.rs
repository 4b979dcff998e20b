// WebSocket push of session events (stream ticks, reloads, analysis changes)

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::SessionEvent;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements the ws_stream connection count on drop (connect = +1, drop = -1).
struct WsStreamGuard(Arc<AtomicUsize>);

impl Drop for WsStreamGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub(super) async fn ws_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let rx = state.session.subscribe();
    let conn_count = state.ws_stream_connections.clone();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_events(socket, rx, conn_count).await {
            tracing::info!("Event stream error: {}", e);
        }
    })
}

async fn stream_events(
    mut socket: WebSocket,
    mut rx: broadcast::Receiver<SessionEvent>,
    conn_count: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    let clients = conn_count.fetch_add(1, Ordering::Relaxed) + 1;
    let _guard = WsStreamGuard(conn_count);
    tracing::info!(ws_stream_clients = clients, "Client connected to event stream");

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                let event = match result {
                    Ok(e) => e,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Event stream client lagging; events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let json = serde_json::to_string(&event)?;
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
        }
    }
    tracing::info!("Client disconnected from event stream");
    Ok(())
}
