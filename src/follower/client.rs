//! WebSocket client for remote followers

use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::HostError;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// How long to wait for the host's welcome after the socket opens
pub const WELCOME_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Connection closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(Box::new(e))
    }
}

/// An open connection to a remote host
pub struct FollowerConnection {
    pub host_id: String,
    pub connection_id: Uuid,
    pub outbound: mpsc::Sender<ClientMsg>,
    pub inbound: mpsc::Receiver<ServerMsg>,
    reader: JoinHandle<()>,
}

impl FollowerConnection {
    pub fn into_parts(self) -> (mpsc::Sender<ClientMsg>, mpsc::Receiver<ServerMsg>, JoinHandle<()>) {
        (self.outbound, self.inbound, self.reader)
    }
}

async fn read_welcome<S>(stream: &mut S) -> Result<(String, Uuid), ClientError>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let Message::Text(text) = frame? else {
            continue;
        };
        return match serde_json::from_str::<ServerMsg>(&text) {
            Ok(ServerMsg::Welcome {
                host_id,
                connection_id,
                ..
            }) => Ok((host_id, connection_id)),
            Ok(other) => Err(ClientError::Handshake(format!(
                "expected welcome, got {other:?}"
            ))),
            Err(e) => Err(ClientError::Handshake(e.to_string())),
        };
    }
    Err(ClientError::Closed)
}

/// Connect to `url` (e.g. `ws://host:8080/ws?host=42_wave_morph`) and wait
/// for the welcome
pub async fn connect(url: &str) -> Result<FollowerConnection, ClientError> {
    let (socket, _) = connect_async(url).await?;
    let (mut sink, mut stream) = socket.split();

    let (host_id, connection_id) = tokio::time::timeout(WELCOME_TIMEOUT, read_welcome(&mut stream))
        .await
        .map_err(|_| ClientError::Handshake("timed out waiting for welcome".to_string()))??;
    info!(host_id = %host_id, %connection_id, "Connected to host");

    let (outbound, mut outbound_rx) = mpsc::channel::<ClientMsg>(64);
    let (inbound_tx, inbound) = mpsc::channel::<ServerMsg>(64);

    // Writer task: commands -> WebSocket, close when the sender side drops
    tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Failed to encode command");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(json)).await {
                debug!(error = %e, "WebSocket send failed");
                return;
            }
        }
        let _ = sink.close().await;
    });

    // Reader task: WebSocket -> inbound; malformed frames are dropped
    let reader = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMsg>(&text) {
                    Ok(msg) => {
                        if inbound_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Dropping malformed host message"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "WebSocket read failed");
                    break;
                }
            }
        }
    });

    Ok(FollowerConnection {
        host_id,
        connection_id,
        outbound,
        inbound,
        reader,
    })
}
