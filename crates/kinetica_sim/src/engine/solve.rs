//! # Collision Solve
//!
//! Bucket-local collision response. For every particle `k` in a bucket:
//!
//! 1. If it is leaving the world on an axis, that axis's velocity is
//!    negated and the particle takes no part in pair checks as `k`.
//! 2. Otherwise it is tested against every later particle `l > k` in the
//!    same bucket and overlapping, approaching pairs exchange an impulse
//!    along the contact normal.
//!
//! Neighbouring buckets are never consulted, so two particles filed in
//! different buckets pass through each other. The resolver is single pass:
//! overlaps created by earlier resolutions in the same step are not
//! revisited.
//!
//! ## Impulse
//!
//! ```text
//! n       = (p1 - p2) / (|p1 - p2| + 1e-5)
//! closing = (v1 - v2) . n
//! j       = -(1 + e) * closing / 2          (skipped if closing >= 0)
//! v1 += j * n
//! v2 -= j * n
//! ```
//!
//! With unit masses and `e = 1` this is `j = -closing`.

/// Added to the centre distance so coincident particles get a finite normal.
pub const CONTACT_EPSILON: f32 = 1e-5;

/// Read and write access to the velocity columns during solve.
///
/// The serial path hands out plain slices. The parallel path shares one
/// view between workers that each own a disjoint set of buckets.
pub(crate) trait VelocityField {
    /// Velocity of particle `index`.
    fn get(&self, index: usize) -> (f32, f32);
    /// Overwrites the velocity of particle `index`.
    fn set(&mut self, index: usize, velocity: (f32, f32));
}

/// Velocity columns borrowed as slices.
pub(crate) struct Velocities<'a> {
    pub(crate) x: &'a mut [f32],
    pub(crate) y: &'a mut [f32],
}

impl VelocityField for Velocities<'_> {
    #[inline]
    fn get(&self, index: usize) -> (f32, f32) {
        (self.x[index], self.y[index])
    }

    #[inline]
    fn set(&mut self, index: usize, (vx, vy): (f32, f32)) {
        self.x[index] = vx;
        self.y[index] = vy;
    }
}

/// Read-only inputs of the solve phase.
#[derive(Clone, Copy)]
pub(crate) struct SolveKernel<'a> {
    pub(crate) pos_x: &'a [f32],
    pub(crate) pos_y: &'a [f32],
    pub(crate) radius: &'a [f32],
    pub(crate) half_width: f32,
    pub(crate) half_height: f32,
    pub(crate) restitution: f32,
}

/// True if an edge of the particle is past the wall it is moving towards.
#[inline]
fn leaving(pos: f32, radius: f32, velocity: f32, half_extent: f32) -> bool {
    (pos + radius >= half_extent && velocity > 0.0)
        || (pos - radius <= -half_extent && velocity < 0.0)
}

impl SolveKernel<'_> {
    /// Runs reflection and pair response over one bucket.
    pub(crate) fn solve_bucket<V: VelocityField>(&self, bucket: &[u32], velocities: &mut V) {
        for (k, &this) in bucket.iter().enumerate() {
            let this = this as usize;
            if self.reflect(this, velocities) {
                continue;
            }
            for &other in &bucket[k + 1..] {
                self.resolve_pair(this, other as usize, velocities);
            }
        }
    }

    /// Negates the velocity on every axis the particle is leaving through.
    ///
    /// Returns true if any axis was reflected.
    #[inline]
    pub(crate) fn reflect<V: VelocityField>(&self, index: usize, velocities: &mut V) -> bool {
        let (vx, vy) = velocities.get(index);
        let r = self.radius[index];
        let out_x = leaving(self.pos_x[index], r, vx, self.half_width);
        let out_y = leaving(self.pos_y[index], r, vy, self.half_height);
        if !(out_x || out_y) {
            return false;
        }

        let vx = if out_x { -vx } else { vx };
        let vy = if out_y { -vy } else { vy };
        velocities.set(index, (vx, vy));
        true
    }

    /// Applies the contact impulse to an overlapping, approaching pair.
    ///
    /// Returns true if velocities changed.
    #[inline]
    pub(crate) fn resolve_pair<V: VelocityField>(
        &self,
        a: usize,
        b: usize,
        velocities: &mut V,
    ) -> bool {
        let dx = self.pos_x[a] - self.pos_x[b];
        let dy = self.pos_y[a] - self.pos_y[b];
        let dist_sq = dx * dx + dy * dy;
        let reach = self.radius[a] + self.radius[b];
        if dist_sq > reach * reach {
            return false;
        }

        let dist = dist_sq.sqrt() + CONTACT_EPSILON;
        let nx = dx / dist;
        let ny = dy / dist;

        let (ax, ay) = velocities.get(a);
        let (bx, by) = velocities.get(b);
        let closing = (ax - bx) * nx + (ay - by) * ny;
        if closing >= 0.0 {
            return false;
        }

        let impulse = -(1.0 + self.restitution) * closing * 0.5;
        velocities.set(a, (ax + impulse * nx, ay + impulse * ny));
        velocities.set(b, (bx - impulse * nx, by - impulse * ny));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        pos_x: Vec<f32>,
        pos_y: Vec<f32>,
        radius: Vec<f32>,
        vel_x: Vec<f32>,
        vel_y: Vec<f32>,
    }

    impl Fixture {
        fn new(particles: &[(f32, f32, f32, f32, f32)]) -> Self {
            Self {
                pos_x: particles.iter().map(|p| p.0).collect(),
                pos_y: particles.iter().map(|p| p.1).collect(),
                vel_x: particles.iter().map(|p| p.2).collect(),
                vel_y: particles.iter().map(|p| p.3).collect(),
                radius: particles.iter().map(|p| p.4).collect(),
            }
        }

        fn solve(&mut self, bucket: &[u32], restitution: f32) {
            let kernel = SolveKernel {
                pos_x: &self.pos_x,
                pos_y: &self.pos_y,
                radius: &self.radius,
                half_width: 100.0,
                half_height: 100.0,
                restitution,
            };
            let mut velocities = Velocities {
                x: &mut self.vel_x,
                y: &mut self.vel_y,
            };
            kernel.solve_bucket(bucket, &mut velocities);
        }
    }

    #[test]
    fn test_head_on_pair_swaps_velocities() {
        let mut f = Fixture::new(&[(-0.5, 0.0, 50.0, 0.0, 5.0), (0.5, 0.0, -50.0, 0.0, 5.0)]);
        f.solve(&[0, 1], 1.0);

        assert!((f.vel_x[0] + 50.0).abs() < 1e-2);
        assert!((f.vel_x[1] - 50.0).abs() < 1e-2);
        assert!(f.vel_y[0].abs() < 1e-6 && f.vel_y[1].abs() < 1e-6);
    }

    #[test]
    fn test_separating_pair_is_untouched() {
        let mut f = Fixture::new(&[(-0.5, 0.0, -10.0, 0.0, 5.0), (0.5, 0.0, 10.0, 0.0, 5.0)]);
        f.solve(&[0, 1], 1.0);
        assert_eq!(f.vel_x, vec![-10.0, 10.0]);
    }

    #[test]
    fn test_distant_pair_is_untouched() {
        let mut f = Fixture::new(&[(-20.0, 0.0, 10.0, 0.0, 5.0), (20.0, 0.0, -10.0, 0.0, 5.0)]);
        f.solve(&[0, 1], 1.0);
        assert_eq!(f.vel_x, vec![10.0, -10.0]);
    }

    #[test]
    fn test_coincident_pair_stays_finite() {
        let mut f = Fixture::new(&[(3.0, 3.0, 1.0, 0.0, 5.0), (3.0, 3.0, -1.0, 0.0, 5.0)]);
        f.solve(&[0, 1], 1.0);
        assert!(f.vel_x.iter().chain(&f.vel_y).all(|v| v.is_finite()));
        // Zero normal means zero closing speed; nothing to resolve.
        assert_eq!(f.vel_x, vec![1.0, -1.0]);
    }

    #[test]
    fn test_reflection_only_flips_offending_axis() {
        let mut f = Fixture::new(&[(97.0, 0.0, 30.0, 20.0, 5.0)]);
        f.solve(&[0], 1.0);
        assert_eq!((f.vel_x[0], f.vel_y[0]), (-30.0, 20.0));
    }

    #[test]
    fn test_no_double_reflection() {
        // Touching the right wall but already moving left.
        let mut f = Fixture::new(&[(97.0, 0.0, -30.0, 0.0, 5.0)]);
        f.solve(&[0], 1.0);
        assert_eq!(f.vel_x[0], -30.0);
    }

    #[test]
    fn test_reflecting_particle_skips_its_pairs() {
        // Particle 0 leaves through the bottom wall and would otherwise
        // collide with particle 1.
        let mut f = Fixture::new(&[(0.0, -97.0, 10.0, -5.0, 5.0), (2.0, -97.0, -10.0, 0.0, 5.0)]);
        f.solve(&[0, 1], 1.0);
        assert_eq!((f.vel_x[0], f.vel_y[0]), (10.0, 5.0));
        assert_eq!((f.vel_x[1], f.vel_y[1]), (-10.0, 0.0));
    }

    #[test]
    fn test_restitution_scales_impulse() {
        let mut f = Fixture::new(&[(-0.5, 0.0, 50.0, 0.0, 5.0), (0.5, 0.0, -50.0, 0.0, 5.0)]);
        f.solve(&[0, 1], 0.0);

        // Perfectly inelastic: both end up (almost) at rest, momentum kept.
        assert!(f.vel_x[0].abs() < 1e-2 && f.vel_x[1].abs() < 1e-2);
        assert!((f.vel_x[0] + f.vel_x[1]).abs() < 1e-4);
    }
}
