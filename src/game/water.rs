//! Water chunk: spring ripples plus the procedural wave, with height queries

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::spring::SpringSurface;
use super::wave::{WaveField, WaveParams, WaveSurface};

/// Horizontal world units between surface columns. Much lower and the
/// springs get unstable.
pub const WATER_UNITS_PER_VERT: f32 = 28.0;
/// Rows of vertices used by renderers below the surface
pub const WATER_VERTICAL_VERTS: usize = 6;

/// Vertex resolution of the surface mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertCount {
    pub x: usize,
    pub y: usize,
}

/// The single water body of a world
#[derive(Debug, Clone)]
pub struct WaterChunk {
    /// World x of column 0
    pub origin_x: f32,
    /// Width and height in world units
    pub size: Vec2,
    pub vert_count: VertCount,
    pub wave_params: WaveParams,
    springs: SpringSurface,
    surface: WaveSurface,
}

impl WaterChunk {
    pub fn new(origin_x: f32, size: Vec2, vert_count_x: usize, vert_count_y: usize) -> Self {
        // At least two columns so spacing is always defined
        let vert_count = VertCount {
            x: vert_count_x.max(2),
            y: vert_count_y.max(1),
        };
        let mut chunk = Self {
            origin_x,
            size,
            vert_count,
            wave_params: WaveParams::default(),
            springs: SpringSurface::new(vert_count.x),
            surface: WaveSurface::default(),
        };
        chunk.update_surface(0.0);
        chunk
    }

    /// Chunk covering `[min_x, max_x]` at the standard column spacing
    pub fn spanning(min_x: f32, max_x: f32, depth: f32) -> Self {
        let width = (max_x - min_x).max(WATER_UNITS_PER_VERT);
        let columns = (width / WATER_UNITS_PER_VERT).round() as usize;
        Self::new(min_x, Vec2::new(width, depth), columns, WATER_VERTICAL_VERTS)
    }

    pub fn x_per_vert(&self) -> f32 {
        self.size.x / (self.vert_count.x - 1) as f32
    }

    /// Column nearest to the left of world `x`, clamped into the chunk
    pub fn column_at(&self, x: f32) -> usize {
        let local = ((x - self.origin_x) / self.x_per_vert()).floor();
        if local.is_nan() || local < 0.0 {
            return 0;
        }
        (local as usize).min(self.vert_count.x - 1)
    }

    /// Surface height at world `x`, interpolated between neighbouring columns.
    /// y grows downward, so smaller values are higher water.
    pub fn height_at(&self, x: f32) -> f32 {
        let spacing = self.x_per_vert();
        let local = ((x - self.origin_x) / spacing).clamp(0.0, (self.vert_count.x - 1) as f32);
        if local.is_nan() {
            return self.surface.offset_y(0);
        }
        let i = local.floor() as usize;
        let frac = local - i as f32;
        let a = self.surface.offset_y(i);
        let b = self.surface.offset_y((i + 1).min(self.vert_count.x - 1));
        a + (b - a) * frac
    }

    /// Kick the column under `x` downward (or upward) by `dy`
    pub fn splash(&mut self, x: f32, dy: f32) {
        let column = self.column_at(x);
        self.springs.set_delta_y(column, dy);
    }

    /// Add velocity to the column under `x`
    pub fn disturb(&mut self, x: f32, velocity: Vec2) {
        let column = self.column_at(x);
        self.springs.push(column, velocity.x, velocity.y);
    }

    pub fn ripple_deltas(&self) -> &[f32] {
        self.springs.deltas()
    }

    pub fn ripple_velocities(&self) -> &[f32] {
        self.springs.velocities()
    }

    pub fn surface(&self) -> &WaveSurface {
        &self.surface
    }

    /// Advance the springs and recompute the surface for `total_time`
    pub fn update(&mut self, dt: f32, total_time: f32) {
        self.springs.step(dt);
        self.update_surface(total_time);
    }

    fn update_surface(&mut self, total_time: f32) {
        self.surface = WaveField::evaluate(
            self.vert_count.x,
            total_time,
            &self.wave_params,
            self.x_per_vert(),
            self.springs.deltas(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spanning_uses_standard_spacing() {
        let chunk = WaterChunk::spanning(0.0, 2800.0, 500.0);
        assert_eq!(chunk.vert_count.x, 100);
        assert_eq!(chunk.ripple_deltas().len(), 200);
        assert_eq!(chunk.ripple_velocities().len(), 200);
    }

    #[test]
    fn test_column_lookup_clamps() {
        let chunk = WaterChunk::new(100.0, Vec2::new(900.0, 300.0), 10, 6);
        assert_eq!(chunk.x_per_vert(), 100.0);
        assert_eq!(chunk.column_at(-50.0), 0);
        assert_eq!(chunk.column_at(100.0), 0);
        assert_eq!(chunk.column_at(350.0), 2);
        assert_eq!(chunk.column_at(50_000.0), 9);
    }

    #[test]
    fn test_height_matches_surface_at_columns() {
        let mut chunk = WaterChunk::spanning(0.0, 2800.0, 500.0);
        chunk.update(1.0, 250.0);
        let spacing = chunk.x_per_vert();
        for i in [0usize, 10, 57] {
            let h = chunk.height_at(i as f32 * spacing);
            assert!((h - chunk.surface().offset_y(i)).abs() < 1e-3);
        }
    }

    #[test]
    fn test_splash_shows_in_surface() {
        let mut chunk = WaterChunk::spanning(0.0, 2800.0, 500.0);
        chunk.update(1.0, 10.0);
        let before = chunk.height_at(1400.0);
        chunk.splash(1400.0, 100.0);
        chunk.update(0.0, 10.0);
        let after = chunk.surface().offset_y(chunk.column_at(1400.0));
        assert!(after > before + 50.0);
    }
}
