//! Boats, cannonballs and crates

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::archetype::EntityKind;
use super::cargo::CargoHold;
use super::npc::NpcBrain;
use super::physics::RigidBody;

/// Time units a dead entity lingers before removal
pub const DEFAULT_DECAY_BUDGET: f32 = 500.0;
/// Per-tick fade of the hit/firing flashes
const FLASH_DECAY: f32 = 0.1;

/// Where an entity is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Alive,
    /// HP hit zero; sinking and counting down the decay budget
    Dead,
    /// Detached from physics; the slot may be reused
    Removed,
    /// Removed because the owning player disconnected
    Deleted,
}

/// A buoyancy sample in world space, kept for debug views
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuoyancyPoint {
    pub x: f32,
    pub y: f32,
    pub submerged: bool,
}

/// State every simulated object carries
#[derive(Debug, Clone)]
pub struct EntityCore {
    pub kind: EntityKind,
    pub body: RigidBody,
    pub hp: f32,
    pub removed: bool,
    pub is_dead: bool,
    /// Remaining decay budget once dead
    pub decaying: Option<f32>,
    pub submerged: bool,
    /// Fraction of buoyancy points under water, 0..=1
    pub submerged_percent: f32,
    /// How far below the surface a fully submerged entity sits, 0..=1
    pub deep: f32,
    /// Flooding reduces buoyancy, 0..=1
    pub flooded: f32,
    /// Hit flash, 0..=1
    pub hit: f32,
    /// Muzzle flash, 0..=1
    pub firing: f32,
    /// Cached buoyant volume
    pub volume: f32,
    pub buoyancy_points: Vec<BuoyancyPoint>,
}

impl EntityCore {
    pub fn new(kind: EntityKind, body: RigidBody) -> Self {
        let archetype = kind.archetype();
        Self {
            kind,
            body,
            hp: archetype.max_hp,
            removed: false,
            is_dead: false,
            decaying: None,
            submerged: false,
            submerged_percent: 0.0,
            deep: 0.0,
            flooded: 0.0,
            hit: 0.0,
            firing: 0.0,
            volume: archetype.volume(),
            buoyancy_points: Vec::new(),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.removed {
            Lifecycle::Removed
        } else if self.is_dead {
            Lifecycle::Dead
        } else {
            Lifecycle::Alive
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.removed && !self.is_dead
    }

    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    /// HP is kept whole; fractional damage rounds the result down
    pub fn apply_damage(&mut self, amount: f32) {
        self.hp = (self.hp - amount).floor();
    }

    /// Enter the dead state. Returns true only on the first call.
    pub fn kill(&mut self) -> bool {
        if self.is_dead {
            return false;
        }
        self.is_dead = true;
        self.flooded = 1.0;
        if self.decaying.is_none() {
            self.decaying = Some(DEFAULT_DECAY_BUDGET);
        }
        true
    }

    /// Soft removal: flag plus physics detachment
    pub fn remove(&mut self) {
        self.removed = true;
        self.body.attached = false;
    }

    /// Fade the transient flash flags
    pub fn fade_flashes(&mut self) {
        if self.hit > 0.0 {
            self.hit = (self.hit - FLASH_DECAY).clamp(0.0, 1.0);
        }
        if self.firing > 0.0 {
            self.firing = (self.firing - FLASH_DECAY).clamp(0.0, 1.0);
        }
    }
}

/// Shared access to the core, plus per-kind death hooks
pub trait Entity {
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;

    /// Called once when the entity enters the dead state
    fn on_death(&mut self) {}

    /// Kill the entity, running `on_death` only on the first transition
    fn kill(&mut self) -> bool {
        let entered = self.core_mut().kill();
        if entered {
            self.on_death();
        }
        entered
    }
}

/// A player or NPC boat
#[derive(Debug, Clone)]
pub struct Boat {
    pub core: EntityCore,
    pub player_id: String,
    /// +1 faces right, -1 faces left
    pub direction: f32,
    /// -1..=1, decays toward zero while the engine runs
    pub throttle: f32,
    pub fire_cooldown: f32,
    pub repair_cooldown: f32,
    pub rate_of_fire: f32,
    pub score: u32,
    pub cargo: CargoHold,
    /// Collision group shared with this boat's cannonballs
    pub group: i32,
    pub deleted: bool,
    /// Present for NPC boats only
    pub npc: Option<NpcBrain>,
}

impl Boat {
    pub fn new(player_id: String, kind: EntityKind, body: RigidBody, group: i32) -> Self {
        let archetype = kind.archetype();
        Self {
            core: EntityCore::new(kind, body),
            player_id,
            direction: 1.0,
            throttle: 0.0,
            fire_cooldown: 0.0,
            repair_cooldown: 0.0,
            rate_of_fire: archetype.rate_of_fire,
            score: 0,
            cargo: CargoHold::new(archetype.cargo_slots, archetype.cargo_slot_size),
            group,
            deleted: false,
            npc: None,
        }
    }

    pub fn is_npc(&self) -> bool {
        self.npc.is_some()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.deleted {
            Lifecycle::Deleted
        } else {
            self.core.lifecycle()
        }
    }

    /// Slot may be handed to a new boat: gone and not awaiting its owner's respawn
    pub fn is_reusable_slot(&self) -> bool {
        self.core.removed && (self.is_npc() || self.deleted)
    }
}

impl Entity for Boat {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn on_death(&mut self) {
        self.score = 0;
        self.throttle = 0.0;
    }
}

/// Single-use projectile
#[derive(Debug, Clone)]
pub struct Cannonball {
    pub core: EntityCore,
    /// Boat that fired it (weak; re-check liveness before use)
    pub boat_index: usize,
    pub hit_damage: f32,
}

impl Cannonball {
    pub fn new(boat_index: usize, body: RigidBody) -> Self {
        let kind = EntityKind::IronCannonball;
        Self {
            core: EntityCore::new(kind, body),
            boat_index,
            hit_damage: kind.archetype().hit_damage,
        }
    }
}

impl Entity for Cannonball {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

/// Floating debris
#[derive(Debug, Clone)]
pub struct Crate {
    pub core: EntityCore,
}

impl Crate {
    pub fn new(body: RigidBody) -> Self {
        Self {
            core: EntityCore::new(EntityKind::WoodCrate, body),
        }
    }
}

impl Entity for Crate {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

/// Index into one of the world's entity arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Boat(usize),
    Cannonball(usize),
    Crate(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::BodyLabel;

    fn test_boat() -> Boat {
        let archetype = EntityKind::Tug.archetype();
        let body = RigidBody::new(1, BodyLabel::Boat, archetype.collider, Vec2::ZERO, archetype.density);
        Boat::new("p1".to_string(), EntityKind::Tug, body, -1)
    }

    #[test]
    fn test_new_boat_starts_full() {
        let boat = test_boat();
        assert_eq!(boat.core.hp, 100.0);
        assert_eq!(boat.cargo.slots().len(), 3);
        assert_eq!(boat.lifecycle(), Lifecycle::Alive);
        assert_eq!(boat.core.volume, 500.0);
    }

    #[test]
    fn test_damage_floors_hp() {
        let mut boat = test_boat();
        boat.core.apply_damage(0.2);
        assert_eq!(boat.core.hp, 99.0);
        boat.core.apply_damage(45.5);
        assert_eq!(boat.core.hp, 53.0);
    }

    #[test]
    fn test_death_entry_runs_once() {
        let mut boat = test_boat();
        boat.score = 7;
        assert!(boat.kill());
        assert_eq!(boat.score, 0);
        assert_eq!(boat.core.flooded, 1.0);
        assert_eq!(boat.core.decaying, Some(DEFAULT_DECAY_BUDGET));

        boat.score = 3;
        boat.core.decaying = Some(12.0);
        assert!(!boat.kill());
        assert_eq!(boat.score, 3);
        assert_eq!(boat.core.decaying, Some(12.0));
    }

    #[test]
    fn test_remove_detaches_body() {
        let mut boat = test_boat();
        boat.core.remove();
        assert!(!boat.core.body.attached);
        assert_eq!(boat.lifecycle(), Lifecycle::Removed);
        assert!(!boat.is_reusable_slot());
        boat.deleted = true;
        assert_eq!(boat.lifecycle(), Lifecycle::Deleted);
        assert!(boat.is_reusable_slot());
    }

    #[test]
    fn test_flashes_fade_linearly() {
        let mut boat = test_boat();
        boat.core.hit = 1.0;
        boat.core.firing = 0.05;
        boat.core.fade_flashes();
        assert!((boat.core.hit - 0.9).abs() < 1e-6);
        assert_eq!(boat.core.firing, 0.0);
    }
}
