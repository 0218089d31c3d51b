//! # Parallel Solve and Integrate
//!
//! Fork-join over a fixed worker pool:
//!
//! ```text
//! rebuild (caller thread)
//!     │
//!     ├── solve rows [a, b)        ┐
//!     ├── solve rows [b, c)        │ scope join
//!     └── solve rows [.., z)       ┘
//!     │
//!     ├── integrate chunk 0        ┐
//!     └── integrate chunk ..       ┘ scope join
//! ```
//!
//! Row ranges are cut to carry about the same number of particles. Folding
//! around the origin leaves the upper rows empty, so those are skipped.
//!
//! Every particle is filed in exactly one bucket and every bucket in
//! exactly one row, so workers own disjoint sets of velocity entries and
//! need no locks. Bucket order inside a worker does not affect the result,
//! which makes this path bit-identical to the serial one.

#![allow(unsafe_code)]

use std::marker::PhantomData;
use std::ops::Range;
use std::ptr::NonNull;

use kinetica_core::SpatialGrid;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::integrate::integrate_range;
use super::solve::{SolveKernel, VelocityField};
use crate::error::{ConfigError, ConfigResult};

/// Velocity columns shared between solve workers.
///
/// SAFETY: Workers only touch the entries of particles filed in their own
/// rows. The grid files each particle index exactly once, so no entry is
/// reached from two workers.
#[derive(Clone, Copy)]
struct SharedVelocities<'a> {
    x: NonNull<f32>,
    y: NonNull<f32>,
    len: usize,
    _columns: PhantomData<&'a mut [f32]>,
}

// SAFETY: see the type-level comment; access is partitioned by bucket.
unsafe impl Send for SharedVelocities<'_> {}
unsafe impl Sync for SharedVelocities<'_> {}

impl<'a> SharedVelocities<'a> {
    fn new(x: &'a mut [f32], y: &'a mut [f32]) -> Self {
        assert_eq!(x.len(), y.len(), "velocity columns must have equal length");
        Self {
            len: x.len(),
            x: NonNull::from(x).cast(),
            y: NonNull::from(y).cast(),
            _columns: PhantomData,
        }
    }
}

impl VelocityField for SharedVelocities<'_> {
    #[inline]
    fn get(&self, index: usize) -> (f32, f32) {
        assert!(index < self.len, "particle {index} outside velocity columns");
        // SAFETY: in bounds; the owning worker is the only one touching `index`.
        unsafe { (*self.x.as_ptr().add(index), *self.y.as_ptr().add(index)) }
    }

    #[inline]
    fn set(&mut self, index: usize, (vx, vy): (f32, f32)) {
        assert!(index < self.len, "particle {index} outside velocity columns");
        // SAFETY: in bounds; the owning worker is the only one touching `index`.
        unsafe {
            *self.x.as_ptr().add(index) = vx;
            *self.y.as_ptr().add(index) = vy;
        }
    }
}

/// Splits rows into at most `parts` contiguous ranges of roughly equal
/// particle count. Empty rows before the first and after the last
/// occupied one belong to no range.
fn balance_rows(row_lens: &[usize], parts: usize) -> Vec<Range<usize>> {
    let total: usize = row_lens.iter().sum();
    let target = total.div_ceil(parts.max(1)).max(1);

    let mut ranges = Vec::with_capacity(parts);
    let mut start = None;
    let mut end = 0;
    let mut filled = 0;
    for (x, &len) in row_lens.iter().enumerate() {
        if len == 0 {
            continue;
        }
        let first = *start.get_or_insert(x);
        end = x + 1;
        filled += len;
        if filled >= target {
            ranges.push(first..end);
            start = None;
            filled = 0;
        }
    }
    if let Some(first) = start {
        ranges.push(first..end);
    }
    ranges
}

/// Fixed pool of solve and integrate workers.
pub(crate) struct Workers {
    pool: ThreadPool,
    count: usize,
}

impl Workers {
    /// Starts `count` worker threads.
    pub(crate) fn new(count: usize) -> ConfigResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(count)
            .thread_name(|i| format!("kinetica-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::ThreadPool(e.to_string()))?;
        Ok(Self { pool, count })
    }

    /// Number of worker threads.
    pub(crate) const fn count(&self) -> usize {
        self.count
    }

    /// Solves every bucket, grid rows split across workers by particle count.
    pub(crate) fn solve(
        &self,
        grid: &SpatialGrid,
        kernel: &SolveKernel<'_>,
        vel_x: &mut [f32],
        vel_y: &mut [f32],
    ) {
        let row_lens: Vec<usize> = (0..grid.dim()).map(|x| grid.row_len(x)).collect();
        let shared = SharedVelocities::new(vel_x, vel_y);
        self.pool.scope(|scope| {
            for rows in balance_rows(&row_lens, self.count) {
                let mut velocities = shared;
                scope.spawn(move |_| {
                    for x in rows {
                        for bucket in grid.row(x) {
                            kernel.solve_bucket(bucket, &mut velocities);
                        }
                    }
                });
            }
        });
    }

    /// Integrates positions, the index range split evenly across workers.
    pub(crate) fn integrate(
        &self,
        pos_x: &mut [f32],
        pos_y: &mut [f32],
        vel_x: &[f32],
        vel_y: &[f32],
        dt: f32,
    ) {
        let chunk = pos_x.len().div_ceil(self.count).max(1);
        self.pool.install(|| {
            pos_x
                .par_chunks_mut(chunk)
                .zip(pos_y.par_chunks_mut(chunk))
                .zip(vel_x.par_chunks(chunk))
                .zip(vel_y.par_chunks(chunk))
                .for_each(|(((px, py), vx), vy)| integrate_range(px, py, vx, vy, dt));
        });
    }
}
