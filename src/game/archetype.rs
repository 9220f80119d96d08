//! Static catalog of entity archetypes

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Width and height of each buoyancy voxel
pub const BUOYANCY_VOXEL_SIZE: f32 = 10.0;

/// Every kind of simulated object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Workhorse boat, used by players and NPCs
    Tug,
    /// Tug variant with short sight and aggro
    PirateTug,
    IronCannonball,
    WoodCrate,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Tug,
        EntityKind::PirateTug,
        EntityKind::IronCannonball,
        EntityKind::WoodCrate,
    ];

    pub fn is_boat(self) -> bool {
        matches!(self, EntityKind::Tug | EntityKind::PirateTug)
    }

    /// Static archetype for this kind
    pub fn archetype(self) -> &'static Archetype {
        Archetype::for_kind(self)
    }
}

/// Collision shape in body-local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
}

impl Collider {
    pub fn area(&self) -> f32 {
        match *self {
            Collider::Circle { radius } => std::f32::consts::PI * radius * radius,
            Collider::Rect { width, height } => width * height,
        }
    }
}

/// Physical, gameplay and buoyancy constants shared by every entity of a kind
#[derive(Debug, Clone)]
pub struct Archetype {
    pub kind: EntityKind,
    pub collider: Collider,
    /// Mass per unit area
    pub density: f32,
    pub max_hp: f32,
    /// Nominal damage this entity deals on a hard hit
    pub hit_damage: f32,
    /// Shots per second (boats only)
    pub rate_of_fire: f32,
    /// Takes damage every tick while submerged
    pub decays_under_water: bool,
    pub water_friction_scale: f32,
    pub buoyancy_multiplier: f32,
    pub buoyancy_voxel_size: f32,
    /// Sample points relative to the centre of mass
    pub buoyancy_voxel_points: Vec<Vec2>,
    pub cargo_slots: usize,
    pub cargo_slot_size: u32,
    /// Time units between repairs
    pub repair_cooldown: f32,
    /// Cannon muzzle relative to the hull centre (unrotated)
    pub cannon_offset: Vec2,
    /// NPC sight override
    pub sight_range: Option<f32>,
    /// NPC aggro override
    pub aggro_range: Option<f32>,
}

impl Archetype {
    pub fn for_kind(kind: EntityKind) -> &'static Archetype {
        static CATALOG: OnceLock<[Archetype; 4]> = OnceLock::new();
        let catalog = CATALOG.get_or_init(|| EntityKind::ALL.map(Archetype::build));
        match kind {
            EntityKind::Tug => &catalog[0],
            EntityKind::PirateTug => &catalog[1],
            EntityKind::IronCannonball => &catalog[2],
            EntityKind::WoodCrate => &catalog[3],
        }
    }

    fn base(kind: EntityKind, collider: Collider) -> Self {
        Self {
            kind,
            collider,
            density: 1.0,
            max_hp: 1.0,
            hit_damage: 0.0,
            rate_of_fire: 0.0,
            decays_under_water: false,
            water_friction_scale: 1.0,
            buoyancy_multiplier: 1.0,
            buoyancy_voxel_size: BUOYANCY_VOXEL_SIZE,
            buoyancy_voxel_points: vec![Vec2::ZERO],
            cargo_slots: 0,
            cargo_slot_size: 1,
            repair_cooldown: 0.0,
            cannon_offset: Vec2::ZERO,
            sight_range: None,
            aggro_range: None,
        }
    }

    fn tug(kind: EntityKind) -> Self {
        let (width, height) = (100.0, 50.0);
        Self {
            density: 3.0,
            max_hp: 100.0,
            hit_damage: 1.0,
            rate_of_fire: 1.0,
            water_friction_scale: 0.5,
            buoyancy_voxel_points: voxel_grid(width, height, BUOYANCY_VOXEL_SIZE),
            cargo_slots: 3,
            cargo_slot_size: 32,
            repair_cooldown: 500.0,
            cannon_offset: Vec2::new(0.0, -10.0),
            ..Self::base(kind, Collider::Rect { width, height })
        }
    }

    fn build(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Tug => Self::tug(kind),
            EntityKind::PirateTug => Self {
                sight_range: Some(100.0),
                aggro_range: Some(90.0),
                ..Self::tug(kind)
            },
            EntityKind::IronCannonball => Self {
                density: 5.0,
                max_hp: 10.0,
                hit_damage: 45.0,
                decays_under_water: true,
                ..Self::base(kind, Collider::Circle { radius: 8.0 })
            },
            EntityKind::WoodCrate => Self {
                max_hp: 10.0,
                decays_under_water: true,
                ..Self::base(
                    kind,
                    Collider::Rect {
                        width: 32.0,
                        height: 32.0,
                    },
                )
            },
        }
    }

    pub fn mass(&self) -> f32 {
        self.density * self.collider.area()
    }

    /// Buoyant volume: voxel count times voxel size, or the collider area
    /// for archetypes without voxels
    pub fn volume(&self) -> f32 {
        if self.buoyancy_voxel_points.is_empty() {
            self.collider.area()
        } else {
            self.buoyancy_voxel_points.len() as f32 * self.buoyancy_voxel_size
        }
    }

    /// Time units between shots
    pub fn fire_period(&self) -> f32 {
        1000.0 / self.rate_of_fire.max(f32::EPSILON)
    }
}

/// Voxel centres covering a `width` x `height` rectangle centred on the origin
pub fn voxel_grid(width: f32, height: f32, voxel: f32) -> Vec<Vec2> {
    let cols = (width / voxel).ceil() as usize;
    let rows = (height / voxel).ceil() as usize;
    let mut points = Vec::with_capacity(cols * rows);
    for yi in 0..rows {
        for xi in 0..cols {
            points.push(Vec2::new(
                xi as f32 * voxel + voxel / 2.0 - width / 2.0,
                yi as f32 * voxel + voxel / 2.0 - height / 2.0,
            ));
        }
    }
    points
}
