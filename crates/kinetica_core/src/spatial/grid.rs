//! # Uniform Spatial Grid
//!
//! A fixed `G x G` matrix of buckets, rebuilt from scratch every step.
//!
//! ## Bucket mapping
//!
//! ```text
//! bx = | floor((x + r) / partition_size) |   clamped to G - 1
//! by = | floor((y + r) / partition_size) |   clamped to G - 1
//! ```
//!
//! The world is centred on the origin, so the absolute value folds the four
//! quadrants onto the same buckets. Particles that share a bucket are
//! collision candidates; neighbouring buckets are never consulted.
//!
//! ## Layout
//!
//! ```text
//! counts: [c(0,0), c(0,1), ... c(G-1,G-1)]           one u32 per bucket
//! items:  [bucket(0,0) slots | bucket(0,1) slots | ...]  fixed slots each
//! ```
//!
//! Bucket `(x, y)` lives at flat index `x * G + y`, so a grid row is a
//! contiguous run of buckets.

use crate::error::{Fault, FaultResult};

/// Cell index along one axis for a particle's leading edge.
///
/// `as usize` saturates and maps NaN to 0, so any input lands in the grid.
#[inline]
fn axis_cell(edge: f32, partition_size: f32, max_index: usize) -> usize {
    ((edge / partition_size).floor().abs() as usize).min(max_index)
}

/// Uniform grid of fixed-capacity buckets holding particle indices.
///
/// All storage is allocated at construction. `rebuild` only writes into it.
pub struct SpatialGrid {
    /// Buckets per axis.
    dim: usize,
    /// World units per bucket edge.
    partition_size: f32,
    /// Slots per bucket.
    bucket_capacity: usize,
    /// Fill count of every bucket.
    counts: Box<[u32]>,
    /// Bucket slots, `bucket_capacity` per bucket.
    items: Box<[u32]>,
    /// Flat bucket index of every particle from the last rebuild.
    keys: Box<[u32]>,
    /// Particle count of the last rebuild.
    indexed: usize,
}

impl SpatialGrid {
    /// Creates an empty grid.
    ///
    /// # Arguments
    ///
    /// * `dim` - Buckets per axis (`G`)
    /// * `partition_size` - World units per bucket edge
    /// * `bucket_capacity` - Maximum particle indices per bucket
    /// * `particle_capacity` - Maximum particles ever indexed at once
    ///
    /// # Panics
    ///
    /// Panics if any size is zero, if `partition_size` is not a positive
    /// finite number, or if the slot count overflows `usize`.
    #[must_use]
    pub fn new(
        dim: usize,
        partition_size: f32,
        bucket_capacity: usize,
        particle_capacity: usize,
    ) -> Self {
        assert!(dim > 0, "Grid dimension must be greater than zero");
        assert!(
            partition_size.is_finite() && partition_size > 0.0,
            "Partition size must be positive"
        );
        assert!(bucket_capacity > 0, "Bucket capacity must be greater than zero");
        assert!(particle_capacity > 0, "Particle capacity must be greater than zero");

        let buckets = dim.checked_mul(dim);
        let slots = buckets.and_then(|b| b.checked_mul(bucket_capacity));
        let (Some(buckets), Some(slots)) = (buckets, slots) else {
            panic!("grid of {dim} x {dim} buckets with {bucket_capacity} slots overflows usize");
        };
        Self {
            dim,
            partition_size,
            bucket_capacity,
            counts: vec![0; buckets].into_boxed_slice(),
            items: vec![0; slots].into_boxed_slice(),
            keys: vec![0; particle_capacity].into_boxed_slice(),
            indexed: 0,
        }
    }

    /// Returns the bucket count per axis.
    #[inline]
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the edge length of a bucket in world units.
    #[inline]
    #[must_use]
    pub const fn partition_size(&self) -> f32 {
        self.partition_size
    }

    /// Returns the slot count of every bucket.
    #[inline]
    #[must_use]
    pub const fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }

    /// Returns the number of particles indexed by the last rebuild.
    #[inline]
    #[must_use]
    pub const fn indexed(&self) -> usize {
        self.indexed
    }

    /// Maps a particle to its bucket coordinates.
    #[inline]
    #[must_use]
    pub fn bucket_coords(&self, x: f32, y: f32, radius: f32) -> (usize, usize) {
        (self.axis_index(x + radius), self.axis_index(y + radius))
    }

    #[inline]
    fn axis_index(&self, edge: f32) -> usize {
        axis_cell(edge, self.partition_size, self.dim - 1)
    }

    /// Rebuilds every bucket from the given columns.
    ///
    /// Particles are inserted in index order, so two rebuilds over the same
    /// positions produce identical buckets.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::BucketOverflow`] when a bucket runs out of slots.
    /// The grid contents are unspecified afterwards.
    ///
    /// # Panics
    ///
    /// Panics if the columns have different lengths or hold more particles
    /// than the grid was built for.
    pub fn rebuild(&mut self, pos_x: &[f32], pos_y: &[f32], radius: &[f32]) -> FaultResult<()> {
        let n = pos_x.len();
        assert!(
            pos_y.len() == n && radius.len() == n,
            "particle columns must have equal length"
        );
        assert!(
            n <= self.keys.len(),
            "grid built for {} particles, got {n}",
            self.keys.len()
        );

        self.counts.fill(0);
        self.indexed = 0;

        // Pass 1: bucket keys. Straight-line arithmetic over three columns.
        let dim = self.dim;
        let size = self.partition_size;
        for (((key, &x), &y), &r) in self.keys[..n]
            .iter_mut()
            .zip(pos_x)
            .zip(pos_y)
            .zip(radius)
        {
            let bx = axis_cell(x + r, size, dim - 1);
            let by = axis_cell(y + r, size, dim - 1);
            *key = (bx * dim + by) as u32;
        }

        // Pass 2: scatter indices into their buckets.
        let capacity = self.bucket_capacity;
        for (i, &key) in self.keys[..n].iter().enumerate() {
            let bucket = key as usize;
            let slot = self.counts[bucket] as usize;
            if slot >= capacity {
                return Err(Fault::BucketOverflow {
                    bucket_x: bucket / dim,
                    bucket_y: bucket % dim,
                    capacity,
                });
            }
            self.items[bucket * capacity + slot] = i as u32;
            self.counts[bucket] += 1;
        }

        self.indexed = n;
        Ok(())
    }

    /// Empties every bucket.
    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.indexed = 0;
    }

    /// Returns the particle indices in bucket `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the grid.
    #[inline]
    #[must_use]
    pub fn bucket(&self, x: usize, y: usize) -> &[u32] {
        assert!(x < self.dim && y < self.dim, "bucket ({x}, {y}) outside grid");
        self.bucket_at(x * self.dim + y)
    }

    /// Returns the particle indices in the bucket at flat index `flat`.
    #[inline]
    #[must_use]
    pub fn bucket_at(&self, flat: usize) -> &[u32] {
        let start = flat * self.bucket_capacity;
        &self.items[start..start + self.counts[flat] as usize]
    }

    /// Number of particles filed in grid row `x`.
    #[must_use]
    pub fn row_len(&self, x: usize) -> usize {
        let base = x * self.dim;
        self.counts[base..base + self.dim]
            .iter()
            .map(|&c| c as usize)
            .sum()
    }

    /// Returns the buckets of grid row `x`, i.e. `(x, 0..G)`.
    pub fn row(&self, x: usize) -> impl Iterator<Item = &[u32]> + '_ {
        let base = x * self.dim;
        (base..base + self.dim).map(move |flat| self.bucket_at(flat))
    }

    /// Iterates over every bucket in flat order.
    pub fn buckets(&self) -> impl Iterator<Item = &[u32]> + '_ {
        (0..self.dim * self.dim).map(move |flat| self.bucket_at(flat))
    }

    /// Bucket coordinates particle `index` was filed under by the last rebuild.
    #[must_use]
    pub fn bucket_of(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.indexed {
            return None;
        }
        let key = self.keys[index] as usize;
        Some((key / self.dim, key % self.dim))
    }
}
