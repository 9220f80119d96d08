//! WebSocket protocol message definitions
//! These are the wire types for follower-host communication

use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::buffer::F32Buffer;
use crate::game::archetype::EntityKind;
use crate::game::cargo::CargoSlot;
use crate::game::entity::BuoyancyPoint;
use crate::game::water::VertCount;
use crate::game::wave::WaveParams;

/// Protocol-level failures. Never fatal to a connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed numeric buffer: {0}")]
    Buffer(String),
}

/// A world-space point as `{x, y}`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for Point {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Point> for Vec2 {
    fn from(p: Point) -> Self {
        Vec2::new(p.x, p.y)
    }
}

/// Follower intents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Set throttle and facing; direction is -1 or 1
    Move { direction: f32 },
    /// Fire toward `aim`, or straight ahead when absent
    Fire {
        #[serde(default)]
        aim: Option<Point>,
    },
    MakeCrate { position: Point },
    Respawn,
    Repair,
    /// Register the sender and spawn their boat if they have none
    NewPlayer,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Move { .. } => "MOVE",
            Command::Fire { .. } => "FIRE",
            Command::MakeCrate { .. } => "MAKE_CRATE",
            Command::Respawn => "RESPAWN",
            Command::Repair => "REPAIR",
            Command::NewPlayer => "NEW_PLAYER",
        }
    }
}

/// Messages sent from follower to host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// An intent on behalf of `player_id`
    Command { player_id: String, command: Command },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from host to follower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        host_id: String,
        connection_id: Uuid,
        server_time: u64,
    },

    /// World snapshot, broadcast on the sync interval
    Sync(Snapshot),

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Reduced projection of the world sent to followers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub total_time: f32,
    /// Flattened `(x, y, angle)` per live crate
    pub crates: F32Buffer,
    /// Every boat slot in index order, removed ones included
    pub boats: Vec<EntityView>,
    pub cannonballs: Vec<EntityView>,
    pub water: WaterView,
}

/// One boat or cannonball. Boat-only fields are absent for cannonballs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub kind: EntityKind,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub hp: f32,
    pub hit: f32,
    pub firing: f32,
    pub is_dead: bool,
    pub removed: bool,
    pub submerged_percent: f32,
    pub deep: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boat_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cargo: Option<Vec<Option<CargoSlot>>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    /// Debug geometry, only in wireframe mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wireframe: Option<Wireframe>,
}

impl EntityView {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wireframe {
    pub vertices: Vec<Point>,
    pub buoyancy_points: Vec<BuoyancyPoint>,
}

/// Water parameters followers rebuild the surface from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterView {
    pub origin_x: f32,
    pub size: Point,
    pub vert_count: VertCount,
    pub wave_params: WaveParams,
    /// Full ripple deltas, only on resync syncs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ripple_deltas: Option<F32Buffer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_names() {
        let msg = ClientMsg::Command {
            player_id: "p1".to_string(),
            command: Command::MakeCrate {
                position: Point { x: 1.0, y: 2.0 },
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "command");
        assert_eq!(json["command"]["name"], "MAKE_CRATE");
        assert_eq!(json["command"]["position"]["x"], 1.0);
    }

    #[test]
    fn test_fire_aim_is_optional() {
        let cmd: Command = serde_json::from_str(r#"{"name":"FIRE"}"#).unwrap();
        assert_eq!(cmd, Command::Fire { aim: None });
        let cmd: Command = serde_json::from_str(r#"{"name":"NEW_PLAYER"}"#).unwrap();
        assert_eq!(cmd.name(), "NEW_PLAYER");
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let parsed: Result<ClientMsg, _> =
            serde_json::from_str(r#"{"type":"command","player_id":"p","command":{"name":"DANCE"}}"#);
        assert!(parsed.is_err());
    }
}
