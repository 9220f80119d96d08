//! Damped, coupled mass-spring ripples layered on the procedural wave.
//!
//! Host-only state. Followers never integrate this; they see whatever ripple
//! buffer the host last shipped (often none).

/// Stiffness constant (Hooke's law)
pub const SPRING_K: f32 = 0.01;
/// Velocity loss per unit time
pub const SPRING_DAMPING: f32 = 0.016;
/// Neighbour coupling; negative pulls neighbours toward each other
pub const SPRING_WAVE_SPREAD: f32 = -0.008;
/// Hard bound on any displacement component
pub const MAX_SPRING_DELTA: f32 = 100.0;
/// Displacements smaller than this snap to zero
const SNAP_EPSILON: f32 = 1e-4;

/// One `(dx, dy)` spring per surface column, stored flat
#[derive(Debug, Clone, PartialEq)]
pub struct SpringSurface {
    deltas: Vec<f32>,
    velocities: Vec<f32>,
}

impl SpringSurface {
    pub fn new(columns: usize) -> Self {
        Self {
            deltas: vec![0.0; columns * 2],
            velocities: vec![0.0; columns * 2],
        }
    }

    pub fn columns(&self) -> usize {
        self.deltas.len() / 2
    }

    /// Flat `(dx, dy)` displacement pairs
    pub fn deltas(&self) -> &[f32] {
        &self.deltas
    }

    /// Flat `(vx, vy)` velocity pairs
    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    /// Overwrite the vertical displacement of one column (splashes).
    /// Out-of-range columns are ignored.
    pub fn set_delta_y(&mut self, column: usize, dy: f32) {
        if let Some(slot) = self.deltas.get_mut(column * 2 + 1) {
            *slot = clamp_delta(dy);
        }
    }

    /// Add velocity to one column (wakes)
    pub fn push(&mut self, column: usize, vx: f32, vy: f32) {
        let i = column * 2;
        if i + 1 < self.velocities.len() {
            self.velocities[i] += vx;
            self.velocities[i + 1] += vy;
        }
    }

    /// Integrate every column by `dt`, then spread to neighbours.
    pub fn step(&mut self, dt: f32) {
        for i in (0..self.deltas.len()).step_by(2) {
            for axis in [i, i + 1] {
                let delta = self.deltas[axis];
                let mut velocity = self.velocities[axis];
                let force = -SPRING_K * delta - SPRING_DAMPING * velocity;
                velocity += force * dt;
                let next = clamp_delta(delta + velocity * dt);
                self.deltas[axis] = if next.abs() < SNAP_EPSILON { 0.0 } else { next };
                self.velocities[axis] = if velocity.is_finite() { velocity } else { 0.0 };
            }
        }

        let len = self.deltas.len();
        for i in (0..len).step_by(2) {
            let (mid_x, mid_y) = (self.deltas[i], self.deltas[i + 1]);
            if i >= 2 {
                self.spread_into(i - 2, mid_x, mid_y, dt);
            }
            if i + 2 < len {
                self.spread_into(i + 2, mid_x, mid_y, dt);
            }
        }
    }

    fn spread_into(&mut self, neighbour: usize, mid_x: f32, mid_y: f32, dt: f32) {
        let dx = self.deltas[neighbour] - mid_x;
        let dy = self.deltas[neighbour + 1] - mid_y;
        self.velocities[neighbour] += dx * SPRING_WAVE_SPREAD * dt;
        self.velocities[neighbour + 1] += dy * SPRING_WAVE_SPREAD * dt;
    }
}

fn clamp_delta(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-MAX_SPRING_DELTA, MAX_SPRING_DELTA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_buffers_have_even_matching_length() {
        let springs = SpringSurface::new(7);
        assert_eq!(springs.deltas().len(), 14);
        assert_eq!(springs.velocities().len(), 14);
        assert_eq!(springs.columns(), 7);
    }

    #[test]
    fn test_splash_settles_back_to_rest() {
        let mut springs = SpringSurface::new(16);
        springs.set_delta_y(8, 100.0);
        for _ in 0..20_000 {
            springs.step(1.0);
        }
        assert!(springs.deltas().iter().all(|d| d.abs() < 0.5));
    }

    #[test]
    fn test_splash_spreads_to_neighbours() {
        let mut springs = SpringSurface::new(5);
        springs.set_delta_y(2, 80.0);
        springs.step(1.0);
        // Neighbours get pulled toward the raised column
        assert!(springs.velocities()[3] > 0.0);
        assert!(springs.velocities()[7] > 0.0);
        // Columns two away are untouched after one step
        assert_eq!(springs.velocities()[1], 0.0);
    }

    #[test]
    fn test_out_of_range_column_ignored() {
        let mut springs = SpringSurface::new(2);
        springs.set_delta_y(5, 10.0);
        springs.push(9, 1.0, 1.0);
        assert!(springs.deltas().iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_tiny_values_snap_to_zero() {
        let mut springs = SpringSurface::new(1);
        springs.set_delta_y(0, 0.00005);
        springs.step(1.0);
        assert_eq!(springs.deltas()[1], 0.0);
    }

    proptest! {
        #[test]
        fn prop_displacement_stays_bounded(
            splashes in proptest::collection::vec((0usize..32, -500.0f32..500.0), 1..16),
            kicks in proptest::collection::vec((0usize..32, -50.0f32..50.0), 0..16),
            steps in 1usize..400,
            dt in 0.0f32..10.0,
        ) {
            let mut springs = SpringSurface::new(32);
            for (col, dy) in &splashes {
                springs.set_delta_y(*col, *dy);
            }
            for (col, v) in &kicks {
                springs.push(*col, *v, *v);
            }
            for _ in 0..steps {
                springs.step(dt);
                prop_assert!(springs.deltas().iter().all(|d| d.abs() <= MAX_SPRING_DELTA));
            }
        }
    }
}
