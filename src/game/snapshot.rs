//! Snapshot building: the reduced world projection sent to followers

use crate::ws::buffer::F32Buffer;
use crate::ws::protocol::{EntityView, Point, Snapshot, WaterView, Wireframe};

use super::entity::{Boat, Cannonball, EntityCore};
use super::water::WaterChunk;
use super::world::World;

/// Builds snapshots for network transmission
pub struct SnapshotBuilder {
    /// Include vertices and buoyancy points
    wireframes: bool,
    /// Send the full ripple array every this many syncs
    ripple_resync_every: Option<u32>,
    syncs_since_resync: u32,
}

impl SnapshotBuilder {
    pub fn new(wireframes: bool, ripple_resync_every: Option<u32>) -> Self {
        Self {
            wireframes,
            ripple_resync_every: ripple_resync_every.map(|n| n.max(1)),
            syncs_since_resync: 0,
        }
    }

    /// Count one sync; true when this one should carry ripple deltas
    fn should_resync(&mut self) -> bool {
        let Some(every) = self.ripple_resync_every else {
            return false;
        };
        self.syncs_since_resync += 1;
        if self.syncs_since_resync >= every {
            self.syncs_since_resync = 0;
            true
        } else {
            false
        }
    }

    /// Make the next snapshot carry ripple deltas (a follower just joined)
    pub fn force_resync(&mut self) {
        if let Some(every) = self.ripple_resync_every {
            self.syncs_since_resync = every;
        }
    }

    /// Build a snapshot of the world as it stands
    pub fn build(&mut self, world: &World) -> Snapshot {
        let crates: Vec<f32> = world
            .crates
            .iter()
            .filter(|c| !c.core.removed)
            .flat_map(|c| [c.core.body.position.x, c.core.body.position.y, c.core.body.angle])
            .collect();
        let include_ripple = self.should_resync();

        Snapshot {
            total_time: world.total_time,
            crates: F32Buffer(crates),
            boats: world.boats.iter().map(|b| self.boat_view(b)).collect(),
            cannonballs: world
                .cannonballs
                .iter()
                .map(|c| self.cannonball_view(c))
                .collect(),
            water: water_view(&world.water, include_ripple),
        }
    }

    fn base_view(&self, core: &EntityCore) -> EntityView {
        EntityView {
            kind: core.kind,
            x: core.body.position.x,
            y: core.body.position.y,
            angle: core.body.angle,
            hp: core.hp,
            hit: core.hit,
            firing: core.firing,
            is_dead: core.is_dead,
            removed: core.removed,
            submerged_percent: core.submerged_percent,
            deep: core.deep,
            player_id: None,
            boat_index: None,
            direction: None,
            throttle: None,
            score: None,
            cargo: None,
            deleted: false,
            wireframe: self.wireframes.then(|| Wireframe {
                vertices: core.body.vertices().into_iter().map(Point::from).collect(),
                buoyancy_points: core.buoyancy_points.clone(),
            }),
        }
    }

    fn boat_view(&self, boat: &Boat) -> EntityView {
        EntityView {
            player_id: Some(boat.player_id.clone()),
            direction: Some(boat.direction),
            throttle: Some(boat.throttle),
            score: Some(boat.score),
            cargo: Some(boat.cargo.slots().to_vec()),
            deleted: boat.deleted,
            ..self.base_view(&boat.core)
        }
    }

    fn cannonball_view(&self, ball: &Cannonball) -> EntityView {
        EntityView {
            boat_index: Some(ball.boat_index),
            ..self.base_view(&ball.core)
        }
    }
}

fn water_view(water: &WaterChunk, include_ripple: bool) -> WaterView {
    WaterView {
        origin_x: water.origin_x,
        size: water.size.into(),
        vert_count: water.vert_count,
        wave_params: water.wave_params,
        ripple_deltas: include_ripple.then(|| F32Buffer(water.ripple_deltas().to_vec())),
    }
}

/// Snapshot bandwidth stats for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_players_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, player_count: usize, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_players_per_snapshot =
            self.avg_players_per_snapshot * ((n - 1.0) / n) + (player_count as f32 / n);
    }

    pub fn avg_bytes(&self) -> u64 {
        self.total_bytes.checked_div(self.total_snapshots).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::WorldConfig;
    use glam::Vec2;

    fn world() -> World {
        let mut world = World::new(WorldConfig {
            ideal_boat_count: 2,
            seed: 1,
            ..WorldConfig::default()
        });
        world.setup();
        world
    }

    #[test]
    fn test_projection_is_thin_by_default() {
        let mut world = world();
        world.spawn_crate(Vec2::new(1000.0, -20.0));
        let removed = world.spawn_crate(Vec2::new(2000.0, -20.0));
        world.crates[removed].core.remove();

        let mut builder = SnapshotBuilder::new(false, None);
        let snapshot = builder.build(&world);
        assert_eq!(snapshot.crates.len(), 3);
        assert_eq!(snapshot.boats.len(), 2);
        assert!(snapshot.boats.iter().all(|b| b.wireframe.is_none()));
        assert!(snapshot.boats[0].cargo.is_some());
        assert!(snapshot.water.ripple_deltas.is_none());

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("wireframe"));
        assert!(!json.contains("ripple_deltas"));
    }

    #[test]
    fn test_wireframes_add_geometry() {
        let mut world = world();
        world.update(1.0);
        let mut builder = SnapshotBuilder::new(true, None);
        let snapshot = builder.build(&world);
        let frame = snapshot.boats[0].wireframe.as_ref().expect("wireframe on");
        assert_eq!(frame.vertices.len(), 4);
        assert_eq!(frame.buoyancy_points.len(), 50);
    }

    #[test]
    fn test_ripple_resync_cadence() {
        let world = world();
        let mut builder = SnapshotBuilder::new(false, Some(3));
        let carried: Vec<bool> = (0..6)
            .map(|_| builder.build(&world).water.ripple_deltas.is_some())
            .collect();
        assert_eq!(carried, vec![false, false, true, false, false, true]);

        builder.force_resync();
        assert!(builder.build(&world).water.ripple_deltas.is_some());
    }

    #[test]
    fn test_stats_running_average() {
        let mut stats = SnapshotStats::default();
        stats.record(2, 100);
        stats.record(4, 300);
        assert_eq!(stats.avg_bytes(), 200);
        assert!((stats.avg_players_per_snapshot - 3.0).abs() < 1e-6);
    }
}
