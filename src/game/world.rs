//! The world aggregate: entity arrays, water, physics and the per-tick update

use glam::Vec2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_1_SQRT_2;
use tracing::{debug, warn};

use super::archetype::{Collider, EntityKind};
use super::cargo::REPAIR_MATERIAL;
use super::combat::{CombatSystem, HitResult, CUT_OFF_MOMENTUM, HIT_SCORE, KILL_SCORE};
use super::entity::{Boat, BuoyancyPoint, Cannonball, Crate, Entity, EntityCore, EntityRef};
use super::npc::{self, NpcBrain, NPC_FIRE_RATE_DIVISOR, PLANNING_PERIOD, WIGGLE_ROOM};
use super::physics::{BodyKey, BodyLabel, CollisionEvent, PhysicsSystem, RigidBody};
use super::water::WaterChunk;
use crate::util::rng::{make_random_id, rand_f32, rand_int};
use crate::util::time::clamp_delta;

pub const NPC_PLAYER_ID_PREFIX: &str = "NPC";
/// Boats drop in from just above the waterline, slightly rolled
pub const SPAWN_Y: f32 = -100.0;
pub const SPAWN_ANGLE: f32 = 0.3;
pub const SPAWN_PADDING: f32 = 400.0;
pub const DEFAULT_IDEAL_BOAT_COUNT: usize = 18;
/// How hard a new crate pushes the surface down
pub const CRATE_SPLASH: f32 = 100.0;
/// Fraction of velocity shed per time unit when fully submerged with friction scale 1
pub const WATER_DRAG: f32 = 0.05;
/// Angular speed kept per time unit when fully submerged
pub const ANGULAR_FRICTION: f32 = 0.8;
pub const BUOYANCY_FORCE_MAGNITUDE: f32 = 10.0;
/// Share of buoyancy lost when fully flooded
pub const FLOOD_PENALTY: f32 = 0.88;
/// Velocity added along the heading per time unit at full throttle
pub const ENGINE_MAGNITUDE: f32 = 0.12;
const THROTTLE_DECAY: f32 = 0.9;
const THROTTLE_EPSILON: f32 = 0.05;
/// Depth below the surface before `deep` starts counting
const DEEP_OFFSET: f32 = 10.0;
const CANNONBALL_DEEP_RANGE: f32 = 30.0;
const DECAY_DEPTH_DAMAGE: f32 = 3.0;
const WALL_THICKNESS: f32 = 100.0;

/// Axis-aligned arena rectangle. y grows downward: `min.y` is the roof.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.max.x > self.min.x && self.max.y > self.min.y
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: Vec2::new(0.0, -9000.0),
            max: Vec2::new(28000.0, 500.0),
        }
    }
}

/// Everything needed to build a world
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub bounds: Bounds,
    pub ideal_boat_count: usize,
    /// Hulls new boats are drawn from
    pub boat_roster: Vec<EntityKind>,
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            ideal_boat_count: DEFAULT_IDEAL_BOAT_COUNT,
            boat_roster: vec![EntityKind::Tug],
            seed: 0,
        }
    }
}

/// Root aggregate. Owns every entity and the water; nothing outlives it.
pub struct World {
    pub bounds: Bounds,
    pub water: WaterChunk,
    pub boats: Vec<Boat>,
    pub cannonballs: Vec<Cannonball>,
    pub crates: Vec<Crate>,
    /// Monotonic simulation time in frame units
    pub total_time: f32,
    pub ideal_boat_count: usize,
    pub cut_off_momentum: f32,
    boat_roster: Vec<EntityKind>,
    physics: PhysicsSystem,
    walls: Vec<RigidBody>,
    rng: ChaCha8Rng,
    respawns_last_tick: usize,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let bounds = if config.bounds.is_valid() {
            config.bounds
        } else {
            warn!(bounds = ?config.bounds, "Invalid world bounds, using defaults");
            Bounds::default()
        };
        let roster = if config.boat_roster.iter().any(|k| k.is_boat()) {
            config.boat_roster.into_iter().filter(|k| k.is_boat()).collect()
        } else {
            vec![EntityKind::Tug]
        };

        let mut physics = PhysicsSystem::new();
        let walls = Self::build_walls(&mut physics, &bounds);

        Self {
            bounds,
            water: WaterChunk::spanning(bounds.min.x, bounds.max.x, bounds.max.y),
            boats: Vec::new(),
            cannonballs: Vec::new(),
            crates: Vec::new(),
            total_time: 0.0,
            ideal_boat_count: config.ideal_boat_count,
            cut_off_momentum: CUT_OFF_MOMENTUM,
            boat_roster: roster,
            physics,
            walls,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            respawns_last_tick: 0,
        }
    }

    /// Left, right and floor colliders just outside the arena
    fn build_walls(physics: &mut PhysicsSystem, bounds: &Bounds) -> Vec<RigidBody> {
        let half = WALL_THICKNESS / 2.0;
        let tall = Collider::Rect {
            width: WALL_THICKNESS,
            height: bounds.height() + 2.0 * WALL_THICKNESS,
        };
        let wide = Collider::Rect {
            width: bounds.width() + 2.0 * WALL_THICKNESS,
            height: WALL_THICKNESS,
        };
        let mid_y = bounds.center().y;
        vec![
            RigidBody::new_static(
                physics.next_body_id(),
                BodyLabel::Wall,
                tall,
                Vec2::new(bounds.min.x - half, mid_y),
            ),
            RigidBody::new_static(
                physics.next_body_id(),
                BodyLabel::Wall,
                tall,
                Vec2::new(bounds.max.x + half, mid_y),
            ),
            RigidBody::new_static(
                physics.next_body_id(),
                BodyLabel::Wall,
                wide,
                Vec2::new(bounds.center().x, bounds.max.y + half),
            ),
        ]
    }

    /// Populate the initial NPC fleet
    pub fn setup(&mut self) {
        for _ in 0..self.ideal_boat_count {
            self.spawn_npc_boat(None);
        }
        debug!(boats = self.boats.len(), "World populated");
    }

    pub fn walls(&self) -> &[RigidBody] {
        &self.walls
    }

    pub fn alive_boat_count(&self) -> usize {
        self.boats.iter().filter(|b| b.core.is_alive()).count()
    }

    /// NPC replacements made by the last `update`
    pub fn respawns_last_tick(&self) -> usize {
        self.respawns_last_tick
    }

    /// Index of the player's current (non-deleted) boat
    pub fn find_player_boat(&self, player_id: &str) -> Option<usize> {
        self.boats
            .iter()
            .position(|b| !b.deleted && b.player_id == player_id)
    }

    // ---- spawning ----

    /// Place a fresh boat for `player_id`. With `respawn_index` the boat
    /// overwrites that slot; otherwise the lowest reusable slot is taken
    /// before the array grows.
    pub fn spawn_boat(&mut self, player_id: impl Into<String>, respawn_index: Option<usize>) -> usize {
        let kind = self
            .boat_roster
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(EntityKind::Tug);
        let archetype = kind.archetype();

        let span = self.bounds.width() - 2.0 * SPAWN_PADDING;
        let x = if span > 0.0 {
            self.bounds.min.x + SPAWN_PADDING + rand_f32(&mut self.rng, span)
        } else {
            self.bounds.center().x
        };
        let position = Vec2::new(x, SPAWN_Y.clamp(self.bounds.min.y, self.bounds.max.y));

        let group = self.physics.next_group();
        let mut body = RigidBody::new(
            self.physics.next_body_id(),
            BodyLabel::Boat,
            archetype.collider,
            position,
            archetype.density,
        );
        body.angle = SPAWN_ANGLE;
        body.group = group;

        let mut boat = Boat::new(player_id.into(), kind, body, group);
        boat.fire_cooldown = rand_int(&mut self.rng, archetype.fire_period());

        let slot = respawn_index
            .filter(|&i| i < self.boats.len())
            .or_else(|| self.boats.iter().position(Boat::is_reusable_slot));
        match slot {
            Some(i) => {
                self.boats[i] = boat;
                i
            }
            None => {
                self.boats.push(boat);
                self.boats.len() - 1
            }
        }
    }

    /// Spawn an NPC-controlled boat with a synthetic player id
    pub fn spawn_npc_boat(&mut self, respawn_index: Option<usize>) -> usize {
        let player_id = format!("{NPC_PLAYER_ID_PREFIX}{}", make_random_id(&mut self.rng));
        let index = self.spawn_boat(player_id, respawn_index);
        let boat = &mut self.boats[index];
        boat.rate_of_fire /= NPC_FIRE_RATE_DIVISOR;
        boat.npc = Some(NpcBrain::for_archetype(boat.core.kind.archetype()));
        index
    }

    /// Launch a cannonball from a live boat toward `aim`.
    /// `None` when the boat is missing, dead or removed.
    pub fn spawn_cannonball(&mut self, boat_index: usize, aim: Vec2) -> Option<usize> {
        let boat = self.boats.get(boat_index)?;
        if !boat.core.is_alive() {
            return None;
        }
        let from = boat
            .core
            .body
            .world_point(boat.core.kind.archetype().cannon_offset);
        let group = boat.group;

        let archetype = EntityKind::IronCannonball.archetype();
        let mut body = RigidBody::new(
            self.physics.next_body_id(),
            BodyLabel::Cannonball,
            archetype.collider,
            from,
            archetype.density,
        );
        body.group = group;
        body.kick(CombatSystem::cannon_force(from, aim));

        let ball = Cannonball::new(boat_index, body);
        let index = match self.cannonballs.iter().position(|c| c.core.removed) {
            Some(i) => {
                self.cannonballs[i] = ball;
                i
            }
            None => {
                self.cannonballs.push(ball);
                self.cannonballs.len() - 1
            }
        };
        Some(index)
    }

    /// Drop a crate at `position` and splash the water under it
    pub fn spawn_crate(&mut self, position: Vec2) -> usize {
        let position = self.bounds.clamp(position);
        let archetype = EntityKind::WoodCrate.archetype();
        let body = RigidBody::new(
            self.physics.next_body_id(),
            BodyLabel::Crate,
            archetype.collider,
            position,
            archetype.density,
        );
        let item = Crate::new(body);
        let index = match self.crates.iter().position(|c| c.core.removed) {
            Some(i) => {
                self.crates[i] = item;
                i
            }
            None => {
                self.crates.push(item);
                self.crates.len() - 1
            }
        };
        self.water.splash(position.x, CRATE_SPLASH);
        index
    }

    /// Soft-remove any entity
    pub fn remove_entity(&mut self, entity: EntityRef) {
        if let Some(core) = self.core_mut(entity) {
            core.remove();
        }
    }

    /// A player left: their boat is removed and marked deleted so the slot
    /// can be reused. Returns the slot.
    pub fn delete_boat(&mut self, player_id: &str) -> Option<usize> {
        let index = self.find_player_boat(player_id)?;
        let boat = &mut self.boats[index];
        boat.core.remove();
        boat.deleted = true;
        Some(index)
    }

    // ---- commands ----

    /// Set throttle to `direction` (-1..=1); ±1 also turns the boat
    pub fn move_boat(&mut self, index: usize, direction: f32) -> bool {
        let Some(boat) = self.boats.get_mut(index) else {
            return false;
        };
        if !boat.core.is_alive() || !direction.is_finite() {
            return false;
        }
        let direction = direction.clamp(-1.0, 1.0);
        if direction == 1.0 || direction == -1.0 {
            boat.direction = direction;
        }
        boat.throttle = direction;
        true
    }

    /// Fire if the cooldown allows. Players pass an aim point; NPCs pass
    /// `None` and aim at the nearest boat in aggro range.
    pub fn fire_from_boat(&mut self, index: usize, aim: Option<Vec2>) -> Option<usize> {
        let boat = self.boats.get(index)?;
        if !boat.core.is_alive() || !CombatSystem::can_fire(boat.fire_cooldown) {
            return None;
        }
        let from = boat.core.position();
        let aim = match (aim, boat.npc.as_ref()) {
            (Some(aim), _) => aim,
            (None, Some(brain)) => {
                let (target, _) = npc::find_target(&self.boats, index, brain.aggro_range)?;
                let target_x = self.boats[target].core.position().x;
                npc::aim_point(&mut self.rng, brain, from, boat.core.body.angle, target_x)
            }
            // No aim from a player: lob forward at 45 degrees
            (None, None) => from + Vec2::new(boat.direction * FRAC_1_SQRT_2, -FRAC_1_SQRT_2) * 100.0,
        };
        let rate_of_fire = boat.rate_of_fire;

        let cooldown = CombatSystem::fire_cooldown(&mut self.rng, rate_of_fire);
        let boat = &mut self.boats[index];
        boat.fire_cooldown = cooldown;
        boat.core.firing = 1.0;
        self.spawn_cannonball(index, aim)
    }

    /// Spend one unit of repair material for 1 HP. Nothing changes when the
    /// cooldown is running, the hull is whole, or the hold has no material.
    pub fn repair_boat(&mut self, index: usize) -> bool {
        let Some(boat) = self.boats.get_mut(index) else {
            return false;
        };
        let max_hp = boat.core.kind.archetype().max_hp;
        if !boat.core.is_alive() || boat.repair_cooldown > 0.0 || boat.core.hp >= max_hp {
            return false;
        }
        if boat.cargo.count(REPAIR_MATERIAL) < 1 {
            return false;
        }
        boat.cargo.remove(REPAIR_MATERIAL, 1);
        boat.core.hp = (boat.core.hp + 1.0).min(max_hp);
        boat.repair_cooldown = boat.core.kind.archetype().repair_cooldown;
        true
    }

    // ---- tick ----

    /// Advance the world by `raw_dt` frame units (clamped to `[0, 10]`)
    pub fn update(&mut self, raw_dt: f32) {
        let dt = clamp_delta(raw_dt);
        if dt != raw_dt {
            warn!(raw = raw_dt, clamped = dt, "Delta time out of range, clamped");
        }
        self.total_time += dt;
        self.water.update(dt, self.total_time);

        let bounds = self.bounds;
        for item in &mut self.crates {
            float_entity(&mut item.core, &self.water, &bounds, dt);
            decay(item, dt);
        }
        for boat in &mut self.boats {
            float_entity(&mut boat.core, &self.water, &bounds, dt);
            apply_engines(boat, dt);
            decay(boat, dt);
        }
        for ball in &mut self.cannonballs {
            float_entity(&mut ball.core, &self.water, &bounds, dt);
            decay(ball, dt);
        }

        self.tick_boats(dt);
        self.respawns_last_tick = usize::from(self.auto_respawn().is_some());
        self.step_physics(dt);
        for event in self.physics.drain_events() {
            self.handle_collision(event);
        }
    }

    fn tick_boats(&mut self, dt: f32) {
        for i in 0..self.boats.len() {
            let boat = &mut self.boats[i];
            if !boat.core.is_alive() {
                continue;
            }
            boat.fire_cooldown = CombatSystem::update_cooldown(boat.fire_cooldown, dt);
            boat.repair_cooldown = CombatSystem::update_cooldown(boat.repair_cooldown, dt);
            let Some(brain) = boat.npc.as_mut() else {
                continue;
            };
            brain.planning_cooldown = CombatSystem::update_cooldown(brain.planning_cooldown, dt);
            self.plan_boat(i);
            self.fire_from_boat(i, None);
        }
    }

    /// Re-plan an NPC whose planning cooldown has run out
    pub fn plan_boat(&mut self, index: usize) {
        let Some(boat) = self.boats.get(index) else {
            return;
        };
        let Some(brain) = boat.npc.as_ref() else {
            return;
        };
        if !boat.core.is_alive() || brain.planning_cooldown > 0.0 {
            return;
        }
        let x = boat.core.position().x;
        let preferred = brain.preferred_distance;
        let target = npc::find_target(&self.boats, index, brain.sight_range).map(|(t, _)| t);

        match target {
            Some(t) => {
                let target_x = self.boats[t].core.position().x;
                let direction = npc::move_direction(x, target_x, preferred, WIGGLE_ROOM);
                self.move_boat(index, direction);
            }
            None => self.boats[index].throttle = 0.0,
        }
        if let Some(brain) = self.boats[index].npc.as_mut() {
            brain.target = target;
            brain.planning_cooldown = PLANNING_PERIOD;
        }
    }

    /// Replace at most one removed NPC when the fleet is under strength
    fn auto_respawn(&mut self) -> Option<usize> {
        let alive = self.alive_boat_count();
        if alive >= self.ideal_boat_count {
            return None;
        }
        let slot = self.boats.iter().position(|b| b.is_npc() && b.core.removed);
        if slot.is_none() && self.boats.len() >= self.ideal_boat_count {
            return None;
        }
        debug!(alive, ideal = self.ideal_boat_count, ?slot, "Respawning an NPC boat");
        Some(self.spawn_npc_boat(slot))
    }

    fn step_physics(&mut self, dt: f32) {
        let mut bodies: Vec<&mut RigidBody> = self
            .walls
            .iter_mut()
            .chain(self.boats.iter_mut().map(|b| &mut b.core.body))
            .chain(self.cannonballs.iter_mut().map(|c| &mut c.core.body))
            .chain(self.crates.iter_mut().map(|c| &mut c.core.body))
            .collect();
        self.physics.step(&mut bodies, dt);
    }

    // ---- collisions ----

    /// Queue a collision-start event for the next drain
    pub fn push_collision(&mut self, event: CollisionEvent) {
        self.physics.push_event(event);
    }

    /// Drain queued collision events without advancing physics
    pub fn process_collisions(&mut self) -> Vec<HitResult> {
        self.physics
            .drain_events()
            .into_iter()
            .filter_map(|event| self.handle_collision(event))
            .collect()
    }

    /// Damage, scoring and projectile cleanup for one collision start
    pub fn handle_collision(&mut self, event: CollisionEvent) -> Option<HitResult> {
        let a = self.resolve_body(event.a)?;
        let b = self.resolve_body(event.b)?;
        if self.core(a)?.removed || self.core(b)?.removed {
            return None;
        }
        let total = self.side_damage(a, event.momentum_a) + self.side_damage(b, event.momentum_b);
        if total <= 0.0 {
            return None;
        }
        let damage = CombatSystem::jittered_damage(&mut self.rng, total);
        for side in [a, b] {
            if let Some(core) = self.core_mut(side) {
                core.hit = 1.0;
                core.apply_damage(damage);
            }
        }

        let mut result = self.attribute_hit(a, b);
        result.damage = damage;

        for side in [a, b] {
            if let EntityRef::Cannonball(i) = side {
                self.cannonballs[i].core.remove();
            }
        }
        Some(result)
    }

    fn side_damage(&self, side: EntityRef, momentum: f32) -> f32 {
        let nominal = match side {
            EntityRef::Cannonball(i) => self.cannonballs[i].hit_damage,
            EntityRef::Boat(i) => self.boats[i].core.kind.archetype().hit_damage,
            EntityRef::Crate(i) => self.crates[i].core.kind.archetype().hit_damage,
        };
        CombatSystem::hit_damage(nominal, momentum, self.cut_off_momentum)
    }

    /// The cannonball side names the attacker; the other side is the victim.
    /// A victim that is dead after the hit yields the kill bonus and loot.
    fn attribute_hit(&mut self, a: EntityRef, b: EntityRef) -> HitResult {
        let mut result = HitResult {
            damage: 0.0,
            attacker: None,
            victim: None,
            killed: false,
            loot: None,
        };
        let (attacker, victim) = match (self.shooter_of(a), self.shooter_of(b)) {
            (_, Some(attacker)) => (attacker, a),
            (Some(attacker), _) => (attacker, b),
            _ => return result,
        };
        let EntityRef::Boat(victim) = victim else {
            return result;
        };
        if attacker == victim {
            return result;
        }
        result.attacker = Some(attacker);
        result.victim = Some(victim);

        let target = &mut self.boats[victim];
        if target.core.hp <= 0.0 {
            target.kill();
        }
        if target.core.is_dead {
            let (kind, amount) = CombatSystem::roll_loot(&mut self.rng);
            let shooter = &mut self.boats[attacker];
            shooter.score += KILL_SCORE;
            let leftover = shooter.cargo.give(kind, amount);
            result.killed = true;
            result.loot = Some((kind, amount - leftover));
            debug!(attacker, victim, ?kind, amount, "Boat sunk");
        } else {
            self.boats[attacker].score += HIT_SCORE;
        }
        result
    }

    /// Boat that fired this cannonball, if it is still the same boat
    fn shooter_of(&self, side: EntityRef) -> Option<usize> {
        let EntityRef::Cannonball(i) = side else {
            return None;
        };
        let ball = &self.cannonballs[i];
        let boat = self.boats.get(ball.boat_index)?;
        (!boat.core.removed && boat.group == ball.core.body.group).then_some(ball.boat_index)
    }

    /// Find the entity that owns a body. Walls and stale ids yield `None`.
    pub fn resolve_body(&self, key: BodyKey) -> Option<EntityRef> {
        match key.label {
            BodyLabel::Boat => self
                .boats
                .iter()
                .position(|b| b.core.body.id == key.id)
                .map(EntityRef::Boat),
            BodyLabel::Cannonball => self
                .cannonballs
                .iter()
                .position(|c| c.core.body.id == key.id)
                .map(EntityRef::Cannonball),
            BodyLabel::Crate => self
                .crates
                .iter()
                .position(|c| c.core.body.id == key.id)
                .map(EntityRef::Crate),
            BodyLabel::Wall => None,
        }
    }

    pub fn core(&self, entity: EntityRef) -> Option<&EntityCore> {
        match entity {
            EntityRef::Boat(i) => self.boats.get(i).map(|b| &b.core),
            EntityRef::Cannonball(i) => self.cannonballs.get(i).map(|c| &c.core),
            EntityRef::Crate(i) => self.crates.get(i).map(|c| &c.core),
        }
    }

    pub fn core_mut(&mut self, entity: EntityRef) -> Option<&mut EntityCore> {
        match entity {
            EntityRef::Boat(i) => self.boats.get_mut(i).map(|b| &mut b.core),
            EntityRef::Cannonball(i) => self.cannonballs.get_mut(i).map(|c| &mut c.core),
            EntityRef::Crate(i) => self.crates.get_mut(i).map(|c| &mut c.core),
        }
    }
}

/// Boundary clamp plus buoyancy, water friction and depth for one entity
pub fn float_entity(core: &mut EntityCore, water: &WaterChunk, bounds: &Bounds, dt: f32) {
    if core.removed {
        return;
    }
    core.body.position = bounds.clamp(core.body.position);

    let archetype = core.kind.archetype();
    let mut submerged_count = 0usize;
    let mut centroid = Vec2::ZERO;
    core.buoyancy_points.clear();
    for local in &archetype.buoyancy_voxel_points {
        let point = core.body.world_point(*local);
        let submerged = point.y >= water.height_at(point.x);
        if submerged {
            submerged_count += 1;
            centroid += point;
        }
        core.buoyancy_points.push(BuoyancyPoint {
            x: point.x,
            y: point.y,
            submerged,
        });
    }

    let total = core.buoyancy_points.len();
    let percent = if total == 0 {
        0.0
    } else {
        (submerged_count as f32 / total as f32).clamp(0.0, 1.0)
    };
    core.submerged_percent = percent;
    core.submerged = percent > 0.0;

    if core.submerged {
        centroid /= submerged_count as f32;
        let drag = 1.0 - WATER_DRAG * archetype.water_friction_scale * percent * dt;
        core.body.velocity *= drag.clamp(0.0, 1.0);
        let spin = 1.0 - (1.0 - ANGULAR_FRICTION) * percent * dt;
        core.body.damp_angular(spin.clamp(0.0, 1.0));

        let flood = (1.0 - core.flooded * FLOOD_PENALTY).clamp(0.0, 1.0);
        let lift = BUOYANCY_FORCE_MAGNITUDE
            * (core.volume / 100.0)
            * archetype.buoyancy_multiplier
            * percent
            * flood;
        // up is -y
        core.body.apply_force(centroid, Vec2::new(0.0, -lift));
    }

    core.deep = if percent >= 1.0 {
        let surface = water.height_at(core.body.position.x);
        let range = if core.kind == EntityKind::IronCannonball {
            CANNONBALL_DEEP_RANGE
        } else {
            (bounds.max.y - surface).max(1.0)
        };
        ((core.body.position.y - (surface + DEEP_OFFSET)) / range).clamp(0.0, 1.0)
    } else {
        0.0
    };
}

/// Push a submerged boat along its heading while throttle lasts
pub fn apply_engines(boat: &mut Boat, dt: f32) {
    if boat.throttle == 0.0 || !boat.core.submerged || boat.core.removed {
        return;
    }
    let heading = super::physics::rotate(Vec2::new(boat.direction, 0.0), boat.core.body.angle);
    // Throttle only gates the engine; thrust is constant while it lasts
    boat.core.body.velocity += heading * ENGINE_MAGNITUDE * dt;
    boat.throttle *= THROTTLE_DECAY;
    if boat.throttle.abs() < THROTTLE_EPSILON {
        boat.throttle = 0.0;
    }
}

/// Underwater damage, death entry, decay countdown and flash fade
pub fn decay<E: Entity>(entity: &mut E, dt: f32) {
    let core = entity.core_mut();
    if core.removed {
        return;
    }
    if core.kind.archetype().decays_under_water && core.submerged {
        let damage = dt + core.deep * DECAY_DEPTH_DAMAGE;
        core.apply_damage(damage);
    }
    if entity.core().hp <= 0.0 {
        entity.kill();
    }

    let core = entity.core_mut();
    let expired = match core.decaying.as_mut() {
        Some(budget) => {
            *budget -= dt;
            *budget <= 0.0
        }
        None => false,
    };
    if expired {
        core.remove();
    }
    core.fade_flashes();
}
