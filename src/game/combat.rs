//! Combat rules: fire cooldowns, collision damage, scoring and loot

use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;

use super::cargo::CargoKind;
use crate::util::rng::rand_int;

/// Below this momentum a body deals a tenth of its hit damage
pub const CUT_OFF_MOMENTUM: f32 = 2820.0;
/// Launch force applied to a fresh cannonball along the aim direction
pub const CANNON_FORCE_MULTIPLIER: f32 = 60.0;
/// Score for damaging a boat
pub const HIT_SCORE: u32 = 1;
/// Score for sinking one
pub const KILL_SCORE: u32 = 2;
const LOOT_MIN: u32 = 2;
const LOOT_MAX: u32 = 14;

/// Outcome of a damaging collision, for logging and tests
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub damage: f32,
    pub attacker: Option<usize>,
    pub victim: Option<usize>,
    pub killed: bool,
    pub loot: Option<(CargoKind, u32)>,
}

/// Combat system for cooldowns and damage
pub struct CombatSystem;

impl CombatSystem {
    /// Check if a boat can fire (cooldown check)
    pub fn can_fire(fire_cooldown: f32) -> bool {
        fire_cooldown <= 0.0
    }

    /// Count a cooldown down by `dt`, never below zero
    pub fn update_cooldown(cooldown: f32, dt: f32) -> f32 {
        (cooldown - dt).max(0.0)
    }

    /// Cooldown to set after firing: the fire period plus up to a tenth of it
    pub fn fire_cooldown<R: Rng + ?Sized>(rng: &mut R, rate_of_fire: f32) -> f32 {
        let period = 1000.0 / rate_of_fire.max(f32::EPSILON);
        period + rand_int(rng, period / 10.0)
    }

    /// Damage one side of a collision deals. Slow impacts are scaled down;
    /// momentum equal to the cut-off already counts as a full hit.
    pub fn hit_damage(nominal: f32, momentum: f32, cut_off: f32) -> f32 {
        if momentum < cut_off {
            nominal / 10.0
        } else {
            nominal
        }
    }

    /// Total collision damage with +/- 10% integer jitter
    pub fn jittered_damage<R: Rng + ?Sized>(rng: &mut R, total: f32) -> f32 {
        let spread = total / 10.0;
        total + rand_int(rng, spread) - rand_int(rng, spread)
    }

    /// Launch force from `from` toward `aim`
    pub fn cannon_force(from: Vec2, aim: Vec2) -> Vec2 {
        (aim - from).normalize_or_zero() * CANNON_FORCE_MULTIPLIER
    }

    /// Cargo salvaged from a sunk boat
    pub fn roll_loot<R: Rng + ?Sized>(rng: &mut R) -> (CargoKind, u32) {
        let kind = CargoKind::ALL
            .choose(rng)
            .copied()
            .unwrap_or(CargoKind::Timber);
        (kind, rng.gen_range(LOOT_MIN..=LOOT_MAX))
    }
}
