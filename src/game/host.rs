//! Simulation host: owns the world, applies follower intents and broadcasts syncs

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use glam::Vec2;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::delta_units;
use crate::ws::protocol::{ClientMsg, Command, ServerMsg, Snapshot};

use super::snapshot::{SnapshotBuilder, SnapshotStats};
use super::world::{World, WorldConfig};

pub const DEFAULT_HOST_ID_SUFFIX: &str = "_wave_morph";
const STATS_LOG_EVERY: u64 = 500;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Host id already registered: {0}")]
    IdTaken(String),

    #[error("Host registration failed: {0}")]
    Registration(String),

    #[error("Host is not running")]
    NotRunning,

    #[error("Host channel closed")]
    Closed,
}

/// Host phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    Stopped,
    Running,
}

/// Timing and projection settings
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub tick_interval: Duration,
    pub sync_interval: Duration,
    /// Include debug geometry in syncs
    pub wireframes: bool,
    /// Period of full ripple resyncs; `None` never sends ripple data
    pub ripple_resync: Option<Duration>,
    pub host_id_suffix: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(16),
            sync_interval: Duration::from_millis(10),
            wireframes: false,
            ripple_resync: None,
            host_id_suffix: DEFAULT_HOST_ID_SUFFIX.to_string(),
        }
    }
}

impl HostConfig {
    /// Ripple resync period expressed in syncs
    fn ripple_resync_every(&self) -> Option<u32> {
        let period = self.ripple_resync?;
        let sync_ms = self.sync_interval.as_millis().max(1);
        Some((period.as_millis() / sync_ms).clamp(1, u32::MAX as u128) as u32)
    }
}

/// `"{0..9999}{suffix}"`
pub fn generate_host_id<R: Rng + ?Sized>(rng: &mut R, suffix: &str) -> String {
    format!("{}{}", rng.gen_range(0..10_000), suffix)
}

/// Events delivered to the host task
#[derive(Debug)]
pub enum HostEvent {
    Connected {
        connection_id: Uuid,
        /// Direct replies (pong, errors) for this connection
        reply: mpsc::Sender<ServerMsg>,
    },
    Message {
        connection_id: Uuid,
        msg: ClientMsg,
    },
    Disconnected {
        connection_id: Uuid,
    },
    Shutdown,
}

/// A registered player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntry {
    /// Last known slot; re-resolved by player id when stale
    pub boat_index: usize,
    pub connection_id: Option<Uuid>,
    pub disconnected: bool,
}

/// Handle to a running host
#[derive(Clone, Debug)]
pub struct HostHandle {
    pub id: String,
    event_tx: mpsc::Sender<HostEvent>,
    sync_tx: broadcast::Sender<ServerMsg>,
    player_count: Arc<AtomicUsize>,
}

impl HostHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    /// Subscribe to world syncs
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.sync_tx.subscribe()
    }

    /// Open a connection; returns its id and the reply channel
    pub async fn connect(&self) -> Result<(Uuid, mpsc::Receiver<ServerMsg>), HostError> {
        let connection_id = Uuid::new_v4();
        let (reply, reply_rx) = mpsc::channel(32);
        self.send(HostEvent::Connected {
            connection_id,
            reply,
        })
        .await?;
        Ok((connection_id, reply_rx))
    }

    pub async fn send_message(&self, connection_id: Uuid, msg: ClientMsg) -> Result<(), HostError> {
        self.send(HostEvent::Message { connection_id, msg }).await
    }

    pub async fn disconnect(&self, connection_id: Uuid) -> Result<(), HostError> {
        self.send(HostEvent::Disconnected { connection_id }).await
    }

    pub async fn shutdown(&self) -> Result<(), HostError> {
        self.send(HostEvent::Shutdown).await
    }

    async fn send(&self, event: HostEvent) -> Result<(), HostError> {
        self.event_tx.send(event).await.map_err(|_| HostError::Closed)
    }
}

/// Registry of all hosts in this process
pub struct HostRegistry {
    hosts: DashMap<String, HostHandle>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self {
            hosts: DashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<HostHandle> {
        self.hosts.get(id).map(|h| h.value().clone())
    }

    /// Insert under a fresh id; an existing id is never replaced
    pub fn register(&self, handle: HostHandle) -> Result<(), HostError> {
        match self.hosts.entry(handle.id.clone()) {
            Entry::Occupied(_) => Err(HostError::IdTaken(handle.id)),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    /// Register `host`, regenerating its id once on a collision
    pub fn register_host(
        &self,
        host: &mut SimulationHost,
        mut next_id: impl FnMut() -> String,
    ) -> Result<HostHandle, HostError> {
        match self.register(host.handle()) {
            Ok(()) => return Ok(host.handle()),
            Err(HostError::IdTaken(id)) => {
                warn!(host_id = %id, "Host id taken, regenerating");
            }
            Err(e) => return Err(e),
        }
        host.set_id(next_id());
        match self.register(host.handle()) {
            Ok(()) => Ok(host.handle()),
            Err(e) => Err(HostError::Registration(e.to_string())),
        }
    }

    pub fn remove(&self, id: &str) -> Option<HostHandle> {
        self.hosts.remove(id).map(|(_, h)| h)
    }

    pub fn ids(&self) -> Vec<String> {
        self.hosts.iter().map(|h| h.key().clone()).collect()
    }

    pub fn active_hosts(&self) -> usize {
        self.hosts.len()
    }

    pub fn total_players(&self) -> usize {
        self.hosts.iter().map(|h| h.value().player_count()).sum()
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// What woke the run loop
enum Wake {
    Tick,
    Sync,
    Event(Option<HostEvent>),
}

/// The authoritative simulation host
pub struct SimulationHost {
    id: String,
    phase: HostPhase,
    config: HostConfig,
    world_config: WorldConfig,
    world: Option<World>,
    players: HashMap<String, PlayerEntry>,
    connections: HashMap<Uuid, mpsc::Sender<ServerMsg>>,
    snapshot_builder: SnapshotBuilder,
    stats: SnapshotStats,
    event_rx: mpsc::Receiver<HostEvent>,
    handle: HostHandle,
}

impl SimulationHost {
    /// Create a stopped host
    pub fn new(id: impl Into<String>, config: HostConfig, world_config: WorldConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1024);
        let (sync_tx, _) = broadcast::channel(64);
        let id = id.into();
        let handle = HostHandle {
            id: id.clone(),
            event_tx,
            sync_tx,
            player_count: Arc::new(AtomicUsize::new(0)),
        };
        let snapshot_builder = SnapshotBuilder::new(config.wireframes, config.ripple_resync_every());

        Self {
            id,
            phase: HostPhase::Stopped,
            config,
            world_config,
            world: None,
            players: HashMap::new(),
            connections: HashMap::new(),
            snapshot_builder,
            stats: SnapshotStats::default(),
            event_rx,
            handle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.handle.id = id.clone();
        self.id = id;
    }

    pub fn handle(&self) -> HostHandle {
        self.handle.clone()
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut World> {
        self.world.as_mut()
    }

    pub fn players(&self) -> &HashMap<String, PlayerEntry> {
        &self.players
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }

    /// Stopped -> Running: build and populate the world. No-op when running.
    pub fn start(&mut self) {
        if self.phase == HostPhase::Running {
            return;
        }
        let mut world = World::new(self.world_config.clone());
        world.setup();
        info!(
            host_id = %self.id,
            boats = world.boats.len(),
            "Host started"
        );
        self.world = Some(world);
        self.phase = HostPhase::Running;
    }

    /// Advance the world by `dt` frame units
    pub fn step(&mut self, dt: f32) -> Result<(), HostError> {
        let world = self.world.as_mut().ok_or(HostError::NotRunning)?;
        world.update(dt);
        Ok(())
    }

    /// Project the world for followers
    pub fn snapshot(&mut self) -> Result<Snapshot, HostError> {
        let world = self.world.as_ref().ok_or(HostError::NotRunning)?;
        Ok(self.snapshot_builder.build(world))
    }

    /// Run the tick, sync and event loop until shutdown
    pub async fn run(mut self) {
        self.start();

        let mut tick_interval = interval(self.config.tick_interval);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sync_interval = interval(self.config.sync_interval);
        sync_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        loop {
            let wake = tokio::select! {
                _ = tick_interval.tick() => Wake::Tick,
                _ = sync_interval.tick() => Wake::Sync,
                event = self.event_rx.recv() => Wake::Event(event),
            };

            match wake {
                Wake::Tick => {
                    let now = Instant::now();
                    let dt = delta_units(now - last_tick);
                    last_tick = now;
                    if let Err(e) = self.step(dt) {
                        warn!(host_id = %self.id, error = %e, "Tick skipped");
                    }
                }
                Wake::Sync => self.broadcast_sync(),
                // Intents apply as they arrive, between ticks
                Wake::Event(Some(HostEvent::Shutdown)) | Wake::Event(None) => break,
                Wake::Event(Some(event)) => self.handle_event(event),
            }
        }

        self.phase = HostPhase::Stopped;
        info!(host_id = %self.id, "Host stopped");
    }

    /// Build a sync and push it to every subscriber
    pub fn broadcast_sync(&mut self) {
        if self.handle.sync_tx.receiver_count() == 0 {
            return;
        }
        let snapshot = match self.snapshot() {
            Ok(snapshot) => snapshot,
            Err(_) => return,
        };
        let msg = ServerMsg::Sync(snapshot);

        let bytes = serde_json::to_vec(&msg).map(|b| b.len()).unwrap_or(0);
        self.stats.record(self.player_count(), bytes);
        if self.stats.total_snapshots % STATS_LOG_EVERY == 0 {
            debug!(
                host_id = %self.id,
                syncs = self.stats.total_snapshots,
                avg_bytes = self.stats.avg_bytes(),
                avg_players = self.stats.avg_players_per_snapshot,
                "Sync bandwidth"
            );
        }

        let _ = self.handle.sync_tx.send(msg);
    }

    /// Apply one inbound event
    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Connected {
                connection_id,
                reply,
            } => {
                debug!(host_id = %self.id, %connection_id, "Follower connected");
                self.connections.insert(connection_id, reply);
                self.snapshot_builder.force_resync();
            }
            HostEvent::Message { connection_id, msg } => match msg {
                ClientMsg::Command { player_id, command } => {
                    self.apply_command(Some(connection_id), &player_id, command);
                }
                ClientMsg::Ping { t } => self.reply(connection_id, ServerMsg::Pong { t }),
            },
            HostEvent::Disconnected { connection_id } => self.handle_disconnect(connection_id),
            HostEvent::Shutdown => {}
        }
    }

    fn reply(&self, connection_id: Uuid, msg: ServerMsg) {
        if let Some(reply) = self.connections.get(&connection_id) {
            if reply.try_send(msg).is_err() {
                debug!(%connection_id, "Reply dropped");
            }
        }
    }

    /// Apply an intent immediately. Unknown players and missing boats are
    /// skipped with a warning; returns whether the world changed.
    pub fn apply_command(&mut self, connection_id: Option<Uuid>, player_id: &str, command: Command) -> bool {
        if self.world.is_none() {
            warn!(host_id = %self.id, command = command.name(), "Command while stopped");
            return false;
        }
        if let Command::NewPlayer = command {
            return self.register_player(connection_id, player_id);
        }
        if !self.players.get(player_id).is_some_and(|p| !p.disconnected) {
            warn!(host_id = %self.id, player_id, command = command.name(), "Command from unknown player");
            if let Some(connection_id) = connection_id {
                self.reply(
                    connection_id,
                    ServerMsg::Error {
                        code: "unknown_player".to_string(),
                        message: format!("{player_id} has not joined"),
                    },
                );
            }
            return false;
        }
        let boat = self.resolve_boat(player_id);
        let Some(world) = self.world.as_mut() else {
            return false;
        };

        match command {
            Command::Move { direction } => boat.is_some_and(|i| world.move_boat(i, direction)),
            Command::Fire { aim } => {
                boat.and_then(|i| world.fire_from_boat(i, aim.map(Vec2::from))).is_some()
            }
            Command::MakeCrate { position } => {
                world.spawn_crate(position.into());
                true
            }
            Command::Repair => boat.is_some_and(|i| world.repair_boat(i)),
            Command::Respawn => {
                let alive = boat.is_some_and(|i| world.boats[i].core.is_alive());
                if alive {
                    return false;
                }
                let index = world.spawn_boat(player_id, boat);
                if let Some(entry) = self.players.get_mut(player_id) {
                    entry.boat_index = index;
                }
                info!(host_id = %self.id, player_id, boat_index = index, "Player respawned");
                true
            }
            Command::NewPlayer => false,
        }
    }

    fn register_player(&mut self, connection_id: Option<Uuid>, player_id: &str) -> bool {
        let Some(world) = self.world.as_mut() else {
            return false;
        };
        let (boat_index, spawned) = match world.find_player_boat(player_id) {
            Some(index) => (index, false),
            None => (world.spawn_boat(player_id, None), true),
        };
        self.players.insert(
            player_id.to_string(),
            PlayerEntry {
                boat_index,
                connection_id,
                disconnected: false,
            },
        );
        self.update_player_count();
        info!(
            host_id = %self.id,
            player_id,
            boat_index,
            spawned,
            player_count = self.player_count(),
            "Player joined"
        );
        spawned
    }

    /// Current slot of the player's boat, refreshing a stale index
    fn resolve_boat(&mut self, player_id: &str) -> Option<usize> {
        let world = self.world.as_ref()?;
        let entry = self.players.get_mut(player_id)?;
        let still_mine = world
            .boats
            .get(entry.boat_index)
            .is_some_and(|b| !b.deleted && b.player_id == player_id);
        if still_mine {
            return Some(entry.boat_index);
        }
        let index = world.find_player_boat(player_id)?;
        entry.boat_index = index;
        Some(index)
    }

    fn handle_disconnect(&mut self, connection_id: Uuid) {
        self.connections.remove(&connection_id);
        let Some(world) = self.world.as_mut() else {
            return;
        };
        for (player_id, entry) in self.players.iter_mut() {
            if entry.connection_id != Some(connection_id) || entry.disconnected {
                continue;
            }
            entry.disconnected = true;
            world.delete_boat(player_id);
            info!(host_id = %self.id, player_id = %player_id, "Player left");
        }
        self.update_player_count();
    }

    fn update_player_count(&self) {
        let count = self.players.values().filter(|p| !p.disconnected).count();
        self.handle.player_count.store(count, Ordering::Relaxed);
    }

    pub fn player_count(&self) -> usize {
        self.handle.player_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::Point;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn running_host() -> SimulationHost {
        let mut host = SimulationHost::new(
            "1_test",
            HostConfig::default(),
            WorldConfig {
                ideal_boat_count: 3,
                seed: 8,
                ..WorldConfig::default()
            },
        );
        host.start();
        host
    }

    #[test]
    fn test_stopped_host_rejects_work() {
        let mut host = SimulationHost::new("x", HostConfig::default(), WorldConfig::default());
        assert_eq!(host.phase(), HostPhase::Stopped);
        assert!(matches!(host.step(1.0), Err(HostError::NotRunning)));
        assert!(!host.apply_command(None, "p", Command::NewPlayer));
    }

    #[test]
    fn test_start_populates_world_once() {
        let mut host = running_host();
        assert_eq!(host.phase(), HostPhase::Running);
        assert_eq!(host.world().map(|w| w.boats.len()), Some(3));
        host.start();
        assert_eq!(host.world().map(|w| w.boats.len()), Some(3));
    }

    #[test]
    fn test_new_player_spawns_once() {
        let mut host = running_host();
        assert!(host.apply_command(None, "alice", Command::NewPlayer));
        assert!(!host.apply_command(None, "alice", Command::NewPlayer));
        assert_eq!(host.player_count(), 1);
        let world = host.world().unwrap();
        assert_eq!(world.boats.iter().filter(|b| b.player_id == "alice").count(), 1);
    }

    #[test]
    fn test_unknown_player_is_ignored() {
        let mut host = running_host();
        assert!(!host.apply_command(None, "ghost", Command::Move { direction: 1.0 }));
    }

    #[test]
    fn test_commands_reach_the_boat() {
        let mut host = running_host();
        host.apply_command(None, "alice", Command::NewPlayer);
        let index = host.players()["alice"].boat_index;

        assert!(host.apply_command(None, "alice", Command::Move { direction: -1.0 }));
        assert_eq!(host.world().unwrap().boats[index].direction, -1.0);

        host.world_mut().unwrap().boats[index].fire_cooldown = 0.0;
        let aim = Some(Point { x: 0.0, y: -500.0 });
        assert!(host.apply_command(None, "alice", Command::Fire { aim }));
        assert!(!host.apply_command(None, "alice", Command::Fire { aim }));

        let crates = host.world().unwrap().crates.len();
        assert!(host.apply_command(
            None,
            "alice",
            Command::MakeCrate {
                position: Point { x: 900.0, y: -40.0 }
            }
        ));
        assert_eq!(host.world().unwrap().crates.len(), crates + 1);
    }

    #[test]
    fn test_respawn_only_when_sunk() {
        let mut host = running_host();
        host.apply_command(None, "alice", Command::NewPlayer);
        let index = host.players()["alice"].boat_index;
        assert!(!host.apply_command(None, "alice", Command::Respawn));

        host.world_mut().unwrap().boats[index].core.is_dead = true;
        assert!(host.apply_command(None, "alice", Command::Respawn));
        let world = host.world().unwrap();
        assert_eq!(host.players()["alice"].boat_index, index);
        assert!(world.boats[index].core.is_alive());
        assert_eq!(world.boats[index].player_id, "alice");
    }

    #[test]
    fn test_disconnect_deletes_boat() {
        let mut host = running_host();
        let connection = Uuid::new_v4();
        let (reply, _reply_rx) = mpsc::channel(4);
        host.handle_event(HostEvent::Connected {
            connection_id: connection,
            reply,
        });
        host.handle_event(HostEvent::Message {
            connection_id: connection,
            msg: ClientMsg::Command {
                player_id: "bob".to_string(),
                command: Command::NewPlayer,
            },
        });
        let index = host.players()["bob"].boat_index;
        host.handle_event(HostEvent::Disconnected {
            connection_id: connection,
        });
        let boat = &host.world().unwrap().boats[index];
        assert!(boat.core.removed && boat.deleted);
        assert_eq!(host.player_count(), 0);
        assert!(!host.apply_command(None, "bob", Command::Repair));
    }

    #[test]
    fn test_ping_gets_direct_pong() {
        let mut host = running_host();
        let connection = Uuid::new_v4();
        let (reply, mut reply_rx) = mpsc::channel(4);
        host.handle_event(HostEvent::Connected {
            connection_id: connection,
            reply,
        });
        host.handle_event(HostEvent::Message {
            connection_id: connection,
            msg: ClientMsg::Ping { t: 77 },
        });
        assert_eq!(reply_rx.try_recv().ok(), Some(ServerMsg::Pong { t: 77 }));
    }

    #[test]
    fn test_registry_retries_once() {
        let registry = HostRegistry::new();
        let mut first = SimulationHost::new("7_wave_morph", HostConfig::default(), WorldConfig::default());
        registry.register_host(&mut first, || unreachable!()).unwrap();

        let mut second = SimulationHost::new("7_wave_morph", HostConfig::default(), WorldConfig::default());
        let handle = registry
            .register_host(&mut second, || "8_wave_morph".to_string())
            .unwrap();
        assert_eq!(handle.id, "8_wave_morph");
        assert_eq!(second.id(), "8_wave_morph");

        let mut third = SimulationHost::new("7_wave_morph", HostConfig::default(), WorldConfig::default());
        let err = registry
            .register_host(&mut third, || "8_wave_morph".to_string())
            .unwrap_err();
        assert!(matches!(err, HostError::Registration(_)));
        assert_eq!(registry.active_hosts(), 2);
    }

    #[test]
    fn test_host_id_format() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let id = generate_host_id(&mut rng, DEFAULT_HOST_ID_SUFFIX);
        let (number, suffix) = id.split_once('_').unwrap();
        assert!(number.parse::<u32>().unwrap() < 10_000);
        assert_eq!(suffix, "wave_morph");
    }

    #[test]
    fn test_ripple_resync_in_syncs() {
        let config = HostConfig {
            ripple_resync: Some(Duration::from_millis(1000)),
            ..HostConfig::default()
        };
        assert_eq!(config.ripple_resync_every(), Some(100));
        assert_eq!(HostConfig::default().ripple_resync_every(), None);
    }

    #[tokio::test]
    async fn test_run_loop_broadcasts_and_stops() {
        let host = SimulationHost::new(
            "loop",
            HostConfig::default(),
            WorldConfig {
                ideal_boat_count: 2,
                ..WorldConfig::default()
            },
        );
        let handle = host.handle();
        let mut syncs = handle.subscribe();
        let task = tokio::spawn(host.run());

        let msg = tokio::time::timeout(Duration::from_secs(2), syncs.recv())
            .await
            .expect("sync in time")
            .expect("channel open");
        match msg {
            ServerMsg::Sync(snapshot) => assert_eq!(snapshot.boats.len(), 2),
            other => panic!("unexpected {other:?}"),
        }

        handle.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("stops")
            .unwrap();
    }

    #[test]
    fn test_broadcast_records_stats() {
        let mut host = running_host();
        assert!(host.apply_command(None, "alice", Command::NewPlayer));
        let _syncs = host.handle().subscribe();
        host.broadcast_sync();
        host.broadcast_sync();
        assert_eq!(host.stats().total_snapshots, 2);
        assert!(host.stats().avg_bytes() > 0);
        assert!((host.stats().avg_players_per_snapshot - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_intents_apply_between_ticks() {
        let host = SimulationHost::new(
            "slow",
            HostConfig {
                tick_interval: Duration::from_secs(60),
                sync_interval: Duration::from_secs(60),
                ..HostConfig::default()
            },
            WorldConfig {
                ideal_boat_count: 1,
                ..WorldConfig::default()
            },
        );
        let handle = host.handle();
        let task = tokio::spawn(host.run());
        // Let both intervals spend their immediate first tick
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (connection_id, mut replies) = handle.connect().await.unwrap();
        handle
            .send_message(connection_id, ClientMsg::Ping { t: 5 })
            .await
            .unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(1), replies.recv())
            .await
            .expect("reply before the next tick");
        assert_eq!(reply, Some(ServerMsg::Pong { t: 5 }));

        handle.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("stops")
            .unwrap();
    }
}
