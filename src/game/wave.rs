//! Deterministic procedural wave surface.
//!
//! The host and every follower evaluate the same function from the same thin
//! parameter set, so nothing here may read clocks, RNGs, or global state.
//! Math is done in `f64` and narrowed to `f32` at the end, which keeps the
//! output identical for identical inputs.

use serde::{Deserialize, Serialize};

/// Default vertical amplitude of the base wave
pub const DEFAULT_AMPLITUDE: f32 = 20.0;
/// Horizontal sway of each vertex
const HORIZONTAL_SWAY: f64 = -16.0;

fn default_amplitude() -> f32 {
    DEFAULT_AMPLITUDE
}

/// Parameters shared by host and followers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveParams {
    /// Wave number
    pub k: f32,
    /// Angular frequency
    pub w: f32,
    /// Vertical amplitude
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            k: 1.0,
            w: 1.0,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

/// Output of one evaluation. Both buffers are flat `(x, y)` pairs, one pair
/// per surface column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaveSurface {
    /// Final vertex positions (`x` scaled by spacing, plus displacement)
    pub verts: Vec<f32>,
    /// Displacement of each vertex from its rest position
    pub offsets: Vec<f32>,
}

impl WaveSurface {
    pub fn column_count(&self) -> usize {
        self.verts.len() / 2
    }

    /// Displacement `y` of column `i`, or 0 when out of range
    pub fn offset_y(&self, i: usize) -> f32 {
        self.offsets.get(i * 2 + 1).copied().unwrap_or(0.0)
    }

    /// Per-column samples, the shape renderers consume
    pub fn samples(&self) -> Vec<SurfaceSample> {
        self.verts
            .chunks_exact(2)
            .zip(self.offsets.chunks_exact(2))
            .map(|(v, o)| SurfaceSample {
                x: v[0],
                y: v[1],
                dx: o[0],
                dy: o[1],
            })
            .collect()
    }
}

/// A single surface column as seen by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSample {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

/// Stateless wave evaluator
pub struct WaveField;

impl WaveField {
    /// Evaluate the surface for `vertex_count` columns at `total_time`.
    ///
    /// `ripple` holds flat `(dx, dy)` pairs layered on top of the procedural
    /// wave; missing entries count as zero so a short (or empty) ripple buffer
    /// is valid input.
    pub fn evaluate(
        vertex_count: usize,
        total_time: f32,
        params: &WaveParams,
        x_per_vertex: f32,
        ripple: &[f32],
    ) -> WaveSurface {
        let mut verts = vec![0.0_f32; vertex_count * 2];
        let mut offsets = vec![0.0_f32; vertex_count * 2];

        let k = f64::from(params.k);
        let w = f64::from(params.w);
        let amplitude = f64::from(params.amplitude);
        let total = f64::from(total_time);
        let t = total / 20.0;
        let t2 = (total / 100.0).sin();

        for xi in 0..vertex_count {
            let i = xi * 2;
            let x = xi as f64;
            let ripple_dx = f64::from(ripple.get(i).copied().unwrap_or(0.0));
            let ripple_dy = f64::from(ripple.get(i + 1).copied().unwrap_or(0.0));

            let dx = (k * x + w * t).cos() * HORIZONTAL_SWAY + ripple_dx;
            let dy = (k * x + w * t).sin() * amplitude
                // reversing waves
                + (k * 0.4 * x + w * t2).sin() * amplitude * 1.2
                // swells
                + (0.1 * x + 0.2 * t).sin() * amplitude * 2.0
                + ripple_dy;

            offsets[i] = dx as f32;
            offsets[i + 1] = dy as f32;
            verts[i] = (x * f64::from(x_per_vertex) + dx) as f32;
            verts[i + 1] = dy as f32;
        }

        WaveSurface { verts, offsets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_surface_at_time_zero() {
        let params = WaveParams::default();
        let surface = WaveField::evaluate(4, 0.0, &params, 10.0, &[]);
        assert_eq!(surface.verts.len(), 8);
        // Column 0 at t=0: cos(0) * -16 sway, all sines vanish
        assert!((surface.offsets[0] + 16.0).abs() < 1e-5);
        assert!(surface.offsets[1].abs() < 1e-5);
        assert!((surface.verts[2] - (10.0 + surface.offsets[2])).abs() < 1e-4);
    }

    #[test]
    fn test_ripple_is_layered_on_top() {
        let params = WaveParams::default();
        let base = WaveField::evaluate(3, 120.0, &params, 28.0, &[]);
        let ripple = [0.0, 0.0, 5.0, -7.0, 0.0, 0.0];
        let rippled = WaveField::evaluate(3, 120.0, &params, 28.0, &ripple);
        assert!((rippled.offsets[2] - base.offsets[2] - 5.0).abs() < 1e-4);
        assert!((rippled.offsets[3] - base.offsets[3] + 7.0).abs() < 1e-4);
        assert_eq!(rippled.offsets[0], base.offsets[0]);
    }

    #[test]
    fn test_amplitude_scales_height() {
        let small = WaveParams {
            amplitude: 1.0,
            ..Default::default()
        };
        let large = WaveParams {
            amplitude: 40.0,
            ..Default::default()
        };
        let a = WaveField::evaluate(10, 333.0, &small, 28.0, &[]);
        let b = WaveField::evaluate(10, 333.0, &large, 28.0, &[]);
        let sum_a: f32 = (0..10).map(|i| a.offset_y(i).abs()).sum();
        let sum_b: f32 = (0..10).map(|i| b.offset_y(i).abs()).sum();
        assert!(sum_b > sum_a);
    }

    #[test]
    fn test_samples_match_buffers() {
        let surface = WaveField::evaluate(5, 42.0, &WaveParams::default(), 28.0, &[]);
        let samples = surface.samples();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[3].x, surface.verts[6]);
        assert_eq!(samples[3].dy, surface.offsets[7]);
    }

    proptest! {
        #[test]
        fn prop_evaluate_is_pure(
            count in 1usize..64,
            time in 0.0f32..1.0e6,
            k in 0.1f32..3.0,
            w in 0.1f32..3.0,
            ripple in proptest::collection::vec(-100.0f32..100.0, 0..128),
        ) {
            let params = WaveParams { k, w, amplitude: DEFAULT_AMPLITUDE };
            let a = WaveField::evaluate(count, time, &params, 28.0, &ripple);
            let b = WaveField::evaluate(count, time, &params, 28.0, &ripple);
            prop_assert_eq!(
                a.verts.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
                b.verts.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
            );
            prop_assert_eq!(
                a.offsets.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
                b.offsets.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
            );
        }
    }
}
