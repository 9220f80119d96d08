//! WebSocket upgrade handler: one socket is one follower connection

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::HostHandle;
use crate::util::rate_limit::IntentLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Host to follow; the primary host when absent
    pub host: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let host_id = query.host.unwrap_or_else(|| state.primary_host.clone());
    match state.hosts.get(&host_id) {
        Some(host) => {
            let per_second = state.config.input_rate_limit;
            ws.on_upgrade(move |socket| handle_socket(socket, host, per_second))
        }
        None => {
            warn!(host_id = %host_id, "WebSocket upgrade for unknown host");
            (StatusCode::NOT_FOUND, "Unknown host").into_response()
        }
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, host: HostHandle, per_second: u32) {
    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before connecting so the first sync after join is not missed
    let sync_rx = host.subscribe();
    let (connection_id, reply_rx) = match host.connect().await {
        Ok(pair) => pair,
        Err(e) => {
            error!(host_id = %host.id, error = %e, "Host refused connection");
            return;
        }
    };
    info!(host_id = %host.id, %connection_id, "Follower connected");

    let welcome = ServerMsg::Welcome {
        host_id: host.id.clone(),
        connection_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(%connection_id, error = %e, "Failed to send welcome");
        let _ = host.disconnect(connection_id).await;
        return;
    }

    run_session(
        connection_id,
        &host,
        ws_sink,
        ws_stream,
        sync_rx,
        reply_rx,
        IntentLimiter::new(per_second),
    )
    .await;

    if host.disconnect(connection_id).await.is_err() {
        debug!(%connection_id, "Host already stopped");
    }
    info!(host_id = %host.id, %connection_id, "Follower disconnected");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: Uuid,
    host: &HostHandle,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut sync_rx: broadcast::Receiver<ServerMsg>,
    mut reply_rx: mpsc::Receiver<ServerMsg>,
    mut limiter: IntentLimiter,
) {
    // Writer task: syncs and direct replies -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                sync = sync_rx.recv() => match sync {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(%connection_id, lagged_count = n, "Follower lagged, skipping {} syncs", n);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(%connection_id, "Sync channel closed");
                        break;
                    }
                },
                reply = reply_rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
            };
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(%connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> host
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !limiter.admit() {
                    warn!(%connection_id, dropped = limiter.dropped(), "Intent over budget, dropped");
                    continue;
                }

                match parse_client_msg(&text) {
                    Ok(msg) => {
                        if host.send_message(connection_id, msg).await.is_err() {
                            debug!(%connection_id, "Host channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(%connection_id, error = %e, "Dropping malformed message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(%connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(%connection_id, "Follower initiated close");
                break;
            }
            Err(e) => {
                error!(%connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

pub fn parse_client_msg(text: &str) -> Result<ClientMsg, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
