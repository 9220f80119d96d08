//! NPC boat brains: target search, approach and aiming

use glam::Vec2;
use rand::Rng;
use std::f32::consts::{FRAC_PI_4, PI};

use super::archetype::Archetype;
use super::entity::Boat;
use super::physics::rotate;
use crate::util::rng::rand_f32;

/// Time units between NPC re-plans
pub const PLANNING_PERIOD: f32 = 100.0;
pub const DEFAULT_SIGHT_RANGE: f32 = 1000.0;
pub const DEFAULT_AGGRO_RANGE: f32 = 1000.0;
pub const PREFERRED_DISTANCE: f32 = 250.0;
/// Dead band around the preferred distance where the NPC idles
pub const WIGGLE_ROOM: f32 = 100.0;
/// NPCs fire a third as often as the hull's base rate
pub const NPC_FIRE_RATE_DIVISOR: f32 = 3.0;
/// Widest deviation from hull-up a shot may leave at
pub const FIRING_CONE_HALF_ANGLE: f32 = 1.2;
const AIM_DISTANCE: f32 = 100.0;

/// Per-boat planning state
#[derive(Debug, Clone, PartialEq)]
pub struct NpcBrain {
    pub planning_cooldown: f32,
    pub sight_range: f32,
    pub aggro_range: f32,
    pub preferred_distance: f32,
    /// Elevation above the horizon, radians
    pub preferred_fire_angle: f32,
    /// Total random spread around the preferred angle
    pub random_fire_angle: f32,
    /// Boat index picked at the last plan
    pub target: Option<usize>,
}

impl NpcBrain {
    /// Hull-specific ranges win over the NPC defaults
    pub fn for_archetype(archetype: &Archetype) -> Self {
        let defaults = Self::default();
        Self {
            sight_range: archetype.sight_range.unwrap_or(defaults.sight_range),
            aggro_range: archetype.aggro_range.unwrap_or(defaults.aggro_range),
            ..defaults
        }
    }
}

impl Default for NpcBrain {
    fn default() -> Self {
        Self {
            planning_cooldown: 0.0,
            sight_range: DEFAULT_SIGHT_RANGE,
            aggro_range: DEFAULT_AGGRO_RANGE,
            preferred_distance: PREFERRED_DISTANCE,
            preferred_fire_angle: FRAC_PI_4,
            random_fire_angle: PI / 10.0,
            target: None,
        }
    }
}

/// Nearest live boat by horizontal distance, strictly within `cut_off`.
/// Returns the index and its distance.
pub fn find_target(boats: &[Boat], me: usize, cut_off: f32) -> Option<(usize, f32)> {
    let origin = boats.get(me)?.core.position().x;
    let mut best: Option<(usize, f32)> = None;
    for (i, boat) in boats.iter().enumerate() {
        if i == me || !boat.core.is_alive() {
            continue;
        }
        let dx = (boat.core.position().x - origin).abs();
        let limit = best.map_or(cut_off, |(_, d)| d);
        if dx < limit {
            best = Some((i, dx));
        }
    }
    best
}

/// -1, 0 or +1: close in, back off, or hold inside the dead band
pub fn move_direction(x: f32, target_x: f32, preferred: f32, wiggle: f32) -> f32 {
    let dx = target_x - x;
    let outer = preferred + wiggle;
    let inner = preferred - wiggle;
    if dx > 0.0 {
        if dx > outer {
            1.0
        } else if dx < inner {
            -1.0
        } else {
            0.0
        }
    } else if dx < -outer {
        -1.0
    } else if dx > -inner {
        1.0
    } else {
        0.0
    }
}

/// Aim point for a lobbed shot from `from` toward `target_x`
pub fn aim_point<R: Rng + ?Sized>(
    rng: &mut R,
    brain: &NpcBrain,
    from: Vec2,
    hull_angle: f32,
    target_x: f32,
) -> Vec2 {
    let toward = if target_x < from.x { -1.0 } else { 1.0 };
    let elevation = brain.preferred_fire_angle - brain.random_fire_angle / 2.0
        + rand_f32(rng, brain.random_fire_angle);
    // y grows downward, so up is -sin
    let dir = Vec2::new(elevation.cos() * toward, -elevation.sin());
    from + clamp_to_firing_cone(dir, hull_angle, FIRING_CONE_HALF_ANGLE) * AIM_DISTANCE
}

/// Rotate `dir` back inside the cone of `half_angle` around the hull's up
/// vector. Returns a unit vector.
pub fn clamp_to_firing_cone(dir: Vec2, hull_angle: f32, half_angle: f32) -> Vec2 {
    let up = rotate(Vec2::new(0.0, -1.0), hull_angle);
    let dir = dir.normalize_or_zero();
    if dir == Vec2::ZERO {
        return up;
    }
    let off = up.angle_between(dir);
    if off.abs() <= half_angle {
        dir
    } else {
        rotate(up, half_angle.copysign(off))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::EntityKind;
    use crate::game::physics::{BodyLabel, RigidBody};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn boat_at(id: u64, x: f32) -> Boat {
        let archetype = EntityKind::Tug.archetype();
        let body = RigidBody::new(id, BodyLabel::Boat, archetype.collider, Vec2::new(x, 0.0), archetype.density);
        Boat::new(format!("b{id}"), EntityKind::Tug, body, -(id as i32))
    }

    #[test]
    fn test_brain_ranges_from_archetype() {
        let tug = NpcBrain::for_archetype(EntityKind::Tug.archetype());
        assert_eq!(tug.sight_range, DEFAULT_SIGHT_RANGE);
        let pirate = NpcBrain::for_archetype(EntityKind::PirateTug.archetype());
        assert_eq!(pirate.sight_range, 100.0);
        assert_eq!(pirate.aggro_range, 90.0);
    }

    #[test]
    fn test_find_target_picks_nearest_live() {
        let mut boats = vec![boat_at(1, 0.0), boat_at(2, 300.0), boat_at(3, -200.0), boat_at(4, 50.0)];
        boats[3].core.is_dead = true;
        assert_eq!(find_target(&boats, 0, 1000.0), Some((2, 200.0)));
        assert_eq!(find_target(&boats, 0, 150.0), None);
        boats[2].core.remove();
        assert_eq!(find_target(&boats, 0, 1000.0), Some((1, 300.0)));
    }

    #[test]
    fn test_find_target_cut_off_is_exclusive() {
        let boats = vec![boat_at(1, 0.0), boat_at(2, 100.0)];
        assert_eq!(find_target(&boats, 0, 100.0), None);
        assert_eq!(find_target(&boats, 5, 100.0), None);
    }

    #[test]
    fn test_move_direction_dead_band() {
        assert_eq!(move_direction(0.0, 400.0, 250.0, 100.0), 1.0);
        assert_eq!(move_direction(0.0, 100.0, 250.0, 100.0), -1.0);
        assert_eq!(move_direction(0.0, 250.0, 250.0, 100.0), 0.0);
        assert_eq!(move_direction(0.0, -400.0, 250.0, 100.0), -1.0);
        assert_eq!(move_direction(0.0, -100.0, 250.0, 100.0), 1.0);
        assert_eq!(move_direction(0.0, -300.0, 250.0, 100.0), 0.0);
    }

    #[test]
    fn test_aim_leans_toward_target_and_up() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let brain = NpcBrain::default();
        let from = Vec2::new(500.0, 0.0);
        for _ in 0..50 {
            let right = aim_point(&mut rng, &brain, from, 0.0, 900.0);
            assert!(right.x > from.x && right.y < from.y);
            let left = aim_point(&mut rng, &brain, from, 0.0, 100.0);
            assert!(left.x < from.x && left.y < from.y);
        }
    }

    #[test]
    fn test_cone_clamp_on_tilted_hull() {
        // hull rolled hard to the right; a shot to the left gets pulled in
        let dir = clamp_to_firing_cone(Vec2::new(-1.0, 0.0), 1.0, 0.5);
        let up = rotate(Vec2::new(0.0, -1.0), 1.0);
        assert!((up.angle_between(dir).abs() - 0.5).abs() < 1e-4);
        let inside = clamp_to_firing_cone(Vec2::new(0.0, -2.0), 0.0, 0.5);
        assert!((inside - Vec2::new(0.0, -1.0)).length() < 1e-6);
        assert_eq!(clamp_to_firing_cone(Vec2::ZERO, 0.0, 0.5), Vec2::new(0.0, -1.0));
    }
}
