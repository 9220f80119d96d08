//! Rigid-body integration and collision detection.
//!
//! Units follow 60 Hz frames: velocities are world units per frame and a
//! step of `dt = 1.0` advances one frame. y grows downward.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use super::archetype::Collider;

/// Scale from force/mass to velocity change per frame: (1000 ms / 60)^2
pub const FORCE_STEP_SCALE: f32 = (1000.0 / 60.0) * (1000.0 / 60.0);
/// Downward acceleration in units per frame^2
pub const GRAVITY: f32 = 0.001 * FORCE_STEP_SCALE;
/// Fraction of velocity lost per frame to air
pub const AIR_FRICTION: f32 = 0.01;
/// Rotational inertia multiplier; keeps hulls from spinning on every hit
const INERTIA_SCALE: f32 = 4.0;
/// Fraction of penetration removed per step
const CORRECTION_PERCENT: f32 = 0.8;
/// Penetration tolerated before positional correction kicks in
const CORRECTION_SLOP: f32 = 0.05;
const RESTITUTION: f32 = 0.05;

pub type BodyId = u64;

/// What kind of logical entity owns a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyLabel {
    Boat,
    Cannonball,
    Crate,
    Wall,
}

/// Label plus id: enough to find the owning entity again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyKey {
    pub id: BodyId,
    pub label: BodyLabel,
}

/// Two bodies started touching this step. Momenta are taken before the
/// contact is resolved, so a fast projectile still reads as fast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub a: BodyKey,
    pub b: BodyKey,
    pub momentum_a: f32,
    pub momentum_b: f32,
}

/// A simulated rigid body
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub id: BodyId,
    pub label: BodyLabel,
    pub collider: Collider,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
    pub mass: f32,
    pub inertia: f32,
    /// Bodies sharing a negative group never collide with each other
    pub group: i32,
    pub is_static: bool,
    /// Detached bodies are neither integrated nor collided
    pub attached: bool,
    force: Vec2,
    torque: f32,
}

impl RigidBody {
    pub fn new(id: BodyId, label: BodyLabel, collider: Collider, position: Vec2, density: f32) -> Self {
        let mass = (density * collider.area()).max(f32::EPSILON);
        let inertia = match collider {
            Collider::Circle { radius } => 0.5 * mass * radius * radius,
            Collider::Rect { width, height } => mass * (width * width + height * height) / 12.0,
        } * INERTIA_SCALE;
        Self {
            id,
            label,
            collider,
            position,
            velocity: Vec2::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            mass,
            inertia,
            group: 0,
            is_static: false,
            attached: true,
            force: Vec2::ZERO,
            torque: 0.0,
        }
    }

    /// Immovable body (arena walls)
    pub fn new_static(id: BodyId, label: BodyLabel, collider: Collider, position: Vec2) -> Self {
        Self {
            is_static: true,
            ..Self::new(id, label, collider, position, 1.0)
        }
    }

    pub fn key(&self) -> BodyKey {
        BodyKey {
            id: self.id,
            label: self.label,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.attached && !self.is_static
    }

    /// |velocity| * mass
    pub fn momentum(&self) -> f32 {
        self.velocity.length() * self.mass
    }

    /// Local point rotated by the body angle and moved to its position
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.position + rotate(local, self.angle)
    }

    /// Accumulate a force applied at a world point
    pub fn apply_force(&mut self, point: Vec2, force: Vec2) {
        if !self.is_dynamic() {
            return;
        }
        self.force += force;
        let arm = point - self.position;
        self.torque += arm.perp_dot(force);
    }

    /// One frame's worth of `force` applied instantly at the centre of mass
    pub fn kick(&mut self, force: Vec2) {
        if self.is_dynamic() {
            self.velocity += force / self.mass * FORCE_STEP_SCALE;
        }
    }

    /// Scale the angular velocity in place (water drag)
    pub fn damp_angular(&mut self, factor: f32) {
        self.angular_velocity *= factor;
    }

    /// Outline in world space; circles are approximated with 8 points
    pub fn vertices(&self) -> Vec<Vec2> {
        match self.collider {
            Collider::Rect { width, height } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                [
                    Vec2::new(-hw, -hh),
                    Vec2::new(hw, -hh),
                    Vec2::new(hw, hh),
                    Vec2::new(-hw, hh),
                ]
                .into_iter()
                .map(|p| self.world_point(p))
                .collect()
            }
            Collider::Circle { radius } => (0..8)
                .map(|i| {
                    let a = i as f32 * std::f32::consts::TAU / 8.0;
                    self.position + Vec2::new(a.cos(), a.sin()) * radius
                })
                .collect(),
        }
    }

    fn aabb(&self) -> (Vec2, Vec2) {
        match self.collider {
            Collider::Circle { radius } => (
                self.position - Vec2::splat(radius),
                self.position + Vec2::splat(radius),
            ),
            Collider::Rect { width, height } => {
                let (c, s) = (self.angle.cos().abs(), self.angle.sin().abs());
                let half = Vec2::new(
                    width / 2.0 * c + height / 2.0 * s,
                    width / 2.0 * s + height / 2.0 * c,
                );
                (self.position - half, self.position + half)
            }
        }
    }

    /// Advance one step using the accumulated force and torque
    pub fn integrate(&mut self, dt: f32) {
        if !self.is_dynamic() {
            self.force = Vec2::ZERO;
            self.torque = 0.0;
            return;
        }
        let friction = (1.0 - AIR_FRICTION * dt).max(0.0);
        self.velocity += self.force / self.mass * FORCE_STEP_SCALE * dt;
        self.velocity.y += GRAVITY * dt;
        self.velocity *= friction;
        self.position += self.velocity * dt;

        self.angular_velocity += self.torque / self.inertia * FORCE_STEP_SCALE * dt;
        self.angular_velocity *= friction;
        self.angle += self.angular_velocity * dt;

        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }
}

/// Rotate `v` by `angle` radians
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Penetration of `b` into `a`; `normal` points from `a` toward `b`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub normal: Vec2,
    pub depth: f32,
}

/// Collision detection, resolution and collision-start bookkeeping
#[derive(Debug, Default)]
pub struct PhysicsSystem {
    next_body_id: BodyId,
    next_group: i32,
    active_pairs: HashSet<(BodyId, BodyId)>,
    events: VecDeque<CollisionEvent>,
}

impl PhysicsSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_body_id(&mut self) -> BodyId {
        self.next_body_id += 1;
        self.next_body_id
    }

    /// Fresh non-colliding group, the way each boat and its cannonballs
    /// avoid hitting each other
    pub fn next_group(&mut self) -> i32 {
        self.next_group -= 1;
        self.next_group
    }

    /// Queue an event by hand (tests, scripted hits)
    pub fn push_event(&mut self, event: CollisionEvent) {
        self.events.push_back(event);
    }

    /// Take every collision-start event recorded so far, in order
    pub fn drain_events(&mut self) -> Vec<CollisionEvent> {
        self.events.drain(..).collect()
    }

    /// Integrate all bodies, then detect and resolve contacts.
    /// New contacts are queued as collision-start events.
    pub fn step(&mut self, bodies: &mut [&mut RigidBody], dt: f32) {
        for body in bodies.iter_mut() {
            body.integrate(dt);
        }

        let mut order: Vec<(usize, Vec2, Vec2)> = bodies
            .iter()
            .enumerate()
            .filter(|(_, b)| b.attached)
            .map(|(i, b)| {
                let (min, max) = b.aabb();
                (i, min, max)
            })
            .collect();
        order.sort_by(|a, b| a.1.x.total_cmp(&b.1.x));

        let mut touching = HashSet::new();
        for (n, &(i, min_i, max_i)) in order.iter().enumerate() {
            for &(j, min_j, max_j) in &order[n + 1..] {
                if min_j.x > max_i.x {
                    break;
                }
                if min_j.y > max_i.y || max_j.y < min_i.y {
                    continue;
                }
                let (a, b) = pair_mut(bodies, i, j);
                if !Self::can_collide(a, b) {
                    continue;
                }
                let Some(contact) = Self::check_collision(a, b) else {
                    continue;
                };
                let pair = (a.id.min(b.id), a.id.max(b.id));
                if !self.active_pairs.contains(&pair) {
                    self.events.push_back(CollisionEvent {
                        a: a.key(),
                        b: b.key(),
                        momentum_a: a.momentum(),
                        momentum_b: b.momentum(),
                    });
                }
                touching.insert(pair);
                Self::resolve_collision(a, b, contact);
            }
        }
        self.active_pairs = touching;
    }

    /// Group and static filtering
    pub fn can_collide(a: &RigidBody, b: &RigidBody) -> bool {
        if a.is_static && b.is_static {
            return false;
        }
        if a.group != 0 && a.group == b.group {
            return a.group > 0;
        }
        true
    }

    /// Narrow phase for any pair of colliders
    pub fn check_collision(a: &RigidBody, b: &RigidBody) -> Option<Contact> {
        match (a.collider, b.collider) {
            (Collider::Circle { radius: ra }, Collider::Circle { radius: rb }) => {
                circle_circle(a.position, ra, b.position, rb)
            }
            (Collider::Rect { width, height }, Collider::Circle { radius }) => {
                rect_circle(a, Vec2::new(width, height) / 2.0, b.position, radius)
            }
            (Collider::Circle { radius }, Collider::Rect { width, height }) => {
                rect_circle(b, Vec2::new(width, height) / 2.0, a.position, radius).map(|c| Contact {
                    normal: -c.normal,
                    depth: c.depth,
                })
            }
            (Collider::Rect { .. }, Collider::Rect { .. }) => rect_rect(a, b),
        }
    }

    /// Push the bodies apart and remove approaching velocity
    pub fn resolve_collision(a: &mut RigidBody, b: &mut RigidBody, contact: Contact) {
        let inv_a = if a.is_dynamic() { 1.0 / a.mass } else { 0.0 };
        let inv_b = if b.is_dynamic() { 1.0 / b.mass } else { 0.0 };
        let inv_sum = inv_a + inv_b;
        if inv_sum <= 0.0 {
            return;
        }

        let correction =
            contact.normal * ((contact.depth - CORRECTION_SLOP).max(0.0) * CORRECTION_PERCENT / inv_sum);
        a.position -= correction * inv_a;
        b.position += correction * inv_b;

        let approach = (b.velocity - a.velocity).dot(contact.normal);
        if approach < 0.0 {
            let impulse = -(1.0 + RESTITUTION) * approach / inv_sum;
            a.velocity -= contact.normal * impulse * inv_a;
            b.velocity += contact.normal * impulse * inv_b;
        }
    }
}

fn pair_mut<'a>(
    bodies: &'a mut [&mut RigidBody],
    i: usize,
    j: usize,
) -> (&'a mut RigidBody, &'a mut RigidBody) {
    if i < j {
        let (left, right) = bodies.split_at_mut(j);
        (&mut *left[i], &mut *right[0])
    } else {
        let (left, right) = bodies.split_at_mut(i);
        (&mut *right[0], &mut *left[j])
    }
}

fn circle_circle(pa: Vec2, ra: f32, pb: Vec2, rb: f32) -> Option<Contact> {
    let d = pb - pa;
    let dist = d.length();
    let reach = ra + rb;
    if dist >= reach {
        return None;
    }
    let normal = if dist > 1e-6 { d / dist } else { Vec2::X };
    Some(Contact {
        normal,
        depth: reach - dist,
    })
}

/// Contact with the normal pointing from the rectangle toward the circle
fn rect_circle(rect: &RigidBody, half: Vec2, center: Vec2, radius: f32) -> Option<Contact> {
    let local = rotate(center - rect.position, -rect.angle);
    let closest = local.clamp(-half, half);
    let diff = local - closest;
    let dist_sq = diff.length_squared();

    if dist_sq > 1e-12 {
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        return Some(Contact {
            normal: rotate(diff / dist, rect.angle),
            depth: radius - dist,
        });
    }

    // Centre inside the rectangle: leave through the nearest face
    let gap_x = half.x - local.x.abs();
    let gap_y = half.y - local.y.abs();
    let local_normal = if gap_x < gap_y {
        Vec2::new(local.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, local.y.signum())
    };
    Some(Contact {
        normal: rotate(local_normal, rect.angle),
        depth: gap_x.min(gap_y) + radius,
    })
}

fn rect_rect(a: &RigidBody, b: &RigidBody) -> Option<Contact> {
    let corners_a = a.vertices();
    let corners_b = b.vertices();
    let axes = [
        rotate(Vec2::X, a.angle),
        rotate(Vec2::Y, a.angle),
        rotate(Vec2::X, b.angle),
        rotate(Vec2::Y, b.angle),
    ];

    let mut best: Option<Contact> = None;
    for axis in axes {
        let (min_a, max_a) = project(&corners_a, axis);
        let (min_b, max_b) = project(&corners_b, axis);
        let overlap = max_a.min(max_b) - min_a.max(min_b);
        if overlap <= 0.0 {
            return None;
        }
        if best.map_or(true, |c| overlap < c.depth) {
            let normal = if (b.position - a.position).dot(axis) < 0.0 {
                -axis
            } else {
                axis
            };
            best = Some(Contact {
                normal,
                depth: overlap,
            });
        }
    }
    best
}

fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    points.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}
