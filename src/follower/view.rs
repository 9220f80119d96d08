//! Follower-side world view rebuilt from host syncs

use glam::Vec2;
use serde::Serialize;

use crate::game::wave::{SurfaceSample, WaveField, WaveSurface};
use crate::ws::protocol::{EntityView, Snapshot, WaterView};

/// One crate decoded from the flattened triples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrateView {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// Read-only world state as last seen by a follower
#[derive(Debug, Default)]
pub struct FollowerView {
    player_id: String,
    total_time: f32,
    boats: Vec<EntityView>,
    cannonballs: Vec<EntityView>,
    crates: Vec<CrateView>,
    water: Option<WaterView>,
    /// Ripple deltas from the last resync, empty until one arrives
    ripple: Vec<f32>,
    surface: WaveSurface,
    syncs: u64,
}

impl FollowerView {
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            ..Self::default()
        }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Replace the view with a fresh sync
    pub fn apply(&mut self, snapshot: Snapshot) {
        let Snapshot {
            total_time,
            crates,
            boats,
            cannonballs,
            water,
        } = snapshot;

        self.crates = crates
            .as_slice()
            .chunks_exact(3)
            .map(|c| CrateView {
                x: c[0],
                y: c[1],
                angle: c[2],
            })
            .collect();
        if let Some(ripple) = &water.ripple_deltas {
            self.ripple = ripple.0.clone();
        }
        self.surface = rebuild_surface(&water, total_time, &self.ripple);

        self.total_time = total_time;
        self.boats = boats;
        self.cannonballs = cannonballs;
        self.water = Some(water);
        self.syncs += 1;
    }

    pub fn syncs(&self) -> u64 {
        self.syncs
    }

    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    pub fn boats(&self) -> &[EntityView] {
        &self.boats
    }

    pub fn cannonballs(&self) -> &[EntityView] {
        &self.cannonballs
    }

    pub fn crates(&self) -> &[CrateView] {
        &self.crates
    }

    /// Surface columns in world coordinates
    pub fn water_surface(&self) -> Vec<SurfaceSample> {
        let origin_x = self.water.as_ref().map_or(0.0, |w| w.origin_x);
        self.surface
            .samples()
            .into_iter()
            .map(|s| SurfaceSample {
                x: s.x + origin_x,
                ..s
            })
            .collect()
    }

    pub fn my_boat_index(&self) -> Option<usize> {
        self.boats.iter().position(|b| {
            !b.deleted && b.player_id.as_deref() == Some(self.player_id.as_str())
        })
    }

    pub fn my_boat(&self) -> Option<&EntityView> {
        self.my_boat_index().map(|i| &self.boats[i])
    }

    /// Where a camera should look: our boat, else the middle of the water
    pub fn focus_coords(&self) -> Vec2 {
        if let Some(boat) = self.my_boat().filter(|b| !b.removed) {
            return boat.position();
        }
        self.water
            .as_ref()
            .map_or(Vec2::ZERO, |w| Vec2::new(w.origin_x + w.size.x / 2.0, 0.0))
    }
}

fn rebuild_surface(water: &WaterView, total_time: f32, ripple: &[f32]) -> WaveSurface {
    let columns = water.vert_count.x.max(2);
    WaveField::evaluate(
        columns,
        total_time,
        &water.wave_params,
        water.size.x / (columns - 1) as f32,
        ripple,
    )
}
