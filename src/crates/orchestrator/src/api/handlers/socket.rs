//! WebSocket handler for live task progress
//!
//! Each socket becomes one observer of one task. A writer loop drains the
//! observer queue into the socket and sends a keep-alive ping on a timer; the
//! same loop watches the read half for the client leaving.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::routes::AppState;
use crate::realtime::{ChannelObserver, ObserverMessage, WsError, WsResult};

/// WebSocket upgrade handler
///
/// GET /ws/task/:id
pub async fn task_socket(
    ws: WebSocketUpgrade,
    Path(task_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_observer(socket, task_id, state))
}

async fn serve_observer(socket: WebSocket, task_id: String, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut sink, mut stream) = socket.split();
    let (observer, mut queue) = ChannelObserver::channel(connection_id.clone(), state.observer_buffer);

    let observer_id = match state.subscriptions.subscribe(&task_id, Arc::new(observer)).await {
        Ok(id) => id,
        Err(e) => {
            warn!(task_id = %task_id, connection = %connection_id, error = %e, "Could not subscribe socket");
            let _ = sink.close().await;
            return;
        }
    };
    info!(task_id = %task_id, connection = %connection_id, "Observer connected");

    let mut keepalive = interval_at(Instant::now() + state.keepalive, state.keepalive);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut queue_open = true;

    let reason = loop {
        tokio::select! {
            queued = queue.recv(), if queue_open => match queued {
                Some(message) => {
                    if let Err(e) = send(&mut sink, &message).await {
                        break e.to_string();
                    }
                }
                None => queue_open = false,
            },
            _ = keepalive.tick() => {
                if let Err(e) = send(&mut sink, &ObserverMessage::Ping).await {
                    break e.to_string();
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) if text.trim() == "close" => break "client asked to close".to_string(),
                Some(Ok(Message::Close(_))) | None => break "client closed".to_string(),
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("read failed: {}", e),
            },
        }
    };

    state.subscriptions.unsubscribe(&task_id, observer_id);
    let _ = sink.close().await;
    debug!(task_id = %task_id, connection = %connection_id, reason = %reason, "Observer disconnected");
}

async fn send(sink: &mut SplitSink<WebSocket, Message>, message: &ObserverMessage) -> WsResult<()> {
    let text = message
        .to_json()
        .map_err(|e| WsError::InvalidMessage(e.to_string()))?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| WsError::ConnectionError(e.to_string()))
}
