//! A player's seat at a host, local or remote

use std::sync::Arc;

use glam::Vec2;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::client::{self, ClientError};
use super::view::{CrateView, FollowerView};
use crate::game::wave::SurfaceSample;
use crate::game::HostHandle;
use crate::ws::protocol::{ClientMsg, Command, EntityView, ServerMsg};

/// Whether this participant runs the host or follows one
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Hosting { host_id: String },
    Connected { host_id: String, peer_id: Uuid },
    Disconnected,
}

/// Command entry point plus read-only accessors over the last sync
pub struct Participant {
    player_id: String,
    outbound: mpsc::Sender<ClientMsg>,
    view: Arc<RwLock<FollowerView>>,
    status: Arc<RwLock<ConnectionStatus>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Participant {
    /// Join a host running in this process
    pub async fn hosting(host: HostHandle, player_id: impl Into<String>) -> Result<Self, ClientError> {
        let player_id = player_id.into();
        let mut sync_rx = host.subscribe();
        let (connection_id, mut reply_rx) = host.connect().await?;
        let (outbound, mut outbound_rx) = mpsc::channel::<ClientMsg>(64);
        let (inbound_tx, inbound_rx) = mpsc::channel::<ServerMsg>(64);

        // Commands -> host; leaving once every sender is gone
        let forward_host = host.clone();
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if forward_host.send_message(connection_id, msg).await.is_err() {
                    return;
                }
            }
            let _ = forward_host.disconnect(connection_id).await;
        });

        // Syncs and direct replies -> one inbound stream
        let merge = tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    sync = sync_rx.recv() => match sync {
                        Ok(msg) => msg,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            debug!(lagged_count = n, "Local follower lagged");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    reply = reply_rx.recv() => match reply {
                        Some(msg) => msg,
                        None => break,
                    },
                };
                if inbound_tx.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let status = ConnectionStatus::Hosting {
            host_id: host.id.clone(),
        };
        info!(host_id = %host.id, player_id = %player_id, "Joined local host");
        let participant = Self::start(player_id, outbound, inbound_rx, status, vec![merge]);
        participant.send_command(Command::NewPlayer).await?;
        Ok(participant)
    }

    /// Join a remote host over WebSocket
    pub async fn connect(url: &str, player_id: impl Into<String>) -> Result<Self, ClientError> {
        let connection = client::connect(url).await?;
        let status = ConnectionStatus::Connected {
            host_id: connection.host_id.clone(),
            peer_id: connection.connection_id,
        };
        let (outbound, inbound_rx, reader) = connection.into_parts();
        let participant = Self::start(player_id.into(), outbound, inbound_rx, status, vec![reader]);
        participant.send_command(Command::NewPlayer).await?;
        Ok(participant)
    }

    fn start(
        player_id: String,
        outbound: mpsc::Sender<ClientMsg>,
        mut inbound_rx: mpsc::Receiver<ServerMsg>,
        status: ConnectionStatus,
        mut tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        let view = Arc::new(RwLock::new(FollowerView::new(player_id.clone())));
        let status = Arc::new(RwLock::new(status));

        let apply_view = view.clone();
        let apply_status = status.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(msg) = inbound_rx.recv().await {
                match msg {
                    ServerMsg::Sync(snapshot) => apply_view.write().apply(snapshot),
                    ServerMsg::Error { code, message } => {
                        warn!(code = %code, message = %message, "Host rejected command");
                    }
                    ServerMsg::Welcome { .. } | ServerMsg::Pong { .. } => {}
                }
            }
            *apply_status.write() = ConnectionStatus::Disconnected;
        }));

        Self {
            player_id,
            outbound,
            view,
            status,
            tasks,
        }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Submit an intent for this player
    pub async fn send_command(&self, command: Command) -> Result<(), ClientError> {
        self.outbound
            .send(ClientMsg::Command {
                player_id: self.player_id.clone(),
                command,
            })
            .await
            .map_err(|_| ClientError::Closed)
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.status.read().clone()
    }

    /// Shared view, for callers that want several reads under one lock
    pub fn view(&self) -> Arc<RwLock<FollowerView>> {
        self.view.clone()
    }

    pub fn boats(&self) -> Vec<EntityView> {
        self.view.read().boats().to_vec()
    }

    pub fn crates(&self) -> Vec<CrateView> {
        self.view.read().crates().to_vec()
    }

    pub fn cannonballs(&self) -> Vec<EntityView> {
        self.view.read().cannonballs().to_vec()
    }

    pub fn water_surface(&self) -> Vec<SurfaceSample> {
        self.view.read().water_surface()
    }

    pub fn focus_coords(&self) -> Vec2 {
        self.view.read().focus_coords()
    }

    pub fn my_boat(&self) -> Option<EntityView> {
        self.view.read().my_boat().cloned()
    }
}

impl Drop for Participant {
    fn drop(&mut self) {
        // The outbound sender drops with us, which ends the writer side
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{HostConfig, SimulationHost, WorldConfig};
    use std::time::Duration;

    async fn wait_for<F: Fn(&Participant) -> bool>(participant: &Participant, ready: F) {
        tokio::time::timeout(Duration::from_secs(3), async {
            while !ready(participant) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition in time");
    }

    #[tokio::test]
    async fn test_hosting_participant_sees_own_boat() {
        let host = SimulationHost::new(
            "1_local",
            HostConfig::default(),
            WorldConfig {
                ideal_boat_count: 2,
                seed: 11,
                ..WorldConfig::default()
            },
        );
        let handle = host.handle();
        let task = tokio::spawn(host.run());

        let me = Participant::hosting(handle.clone(), "captain").await.unwrap();
        assert_eq!(
            me.connection_status(),
            ConnectionStatus::Hosting {
                host_id: "1_local".to_string()
            }
        );
        wait_for(&me, |p| p.my_boat().is_some()).await;
        assert_eq!(me.boats().len(), 3);
        assert_eq!(me.water_surface().len(), 1000);

        me.send_command(Command::Move { direction: 1.0 }).await.unwrap();
        wait_for(&me, |p| p.my_boat().and_then(|b| b.throttle).unwrap_or(0.0) > 0.0).await;
        assert_eq!(handle.player_count(), 1);

        drop(me);
        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
