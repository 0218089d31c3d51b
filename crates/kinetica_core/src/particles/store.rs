//! # Particle Store
//!
//! Structure-of-arrays storage for every live particle.
//!
//! Each attribute lives in its own arena-backed column sized to the fixed
//! capacity:
//!
//! ```text
//! pos_x:  [x0, x1, x2, ... | stale ...]
//! pos_y:  [y0, y1, y2, ... | stale ...]
//! vel_x:  [..]  vel_y: [..]  radius: [..]  color: [..]
//!          ^^^^^^^^^^^^^^^   ^^^^^^^^^^^^
//!          0..count (live)   count..capacity (inert)
//! ```
//!
//! Indices `0..count` are densely packed and valid. Everything past `count`
//! is stale and never read.

use std::mem::size_of;

use crate::error::FaultResult;
use crate::memory::{align_up, Arena, ArenaSlice};

/// A single particle, used for appending and for reading one back.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    /// Centre x in world units.
    pub x: f32,
    /// Centre y in world units.
    pub y: f32,
    /// Velocity x in world units per second.
    pub vx: f32,
    /// Velocity y in world units per second.
    pub vy: f32,
    /// Collision and draw radius, always positive.
    pub radius: f32,
    /// Palette index, cosmetic only.
    pub color: u32,
}

impl Particle {
    /// Creates a particle at `(x, y)` moving with `(vx, vy)`.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, vx: f32, vy: f32, radius: f32) -> Self {
        Self {
            x,
            y,
            vx,
            vy,
            radius,
            color: 0,
        }
    }

    /// Sets the palette index.
    #[inline]
    #[must_use]
    pub const fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }
}

/// Arena handles for the six columns, in allocation order.
#[derive(Clone, Copy, Debug)]
struct Columns {
    pos_x: ArenaSlice<f32>,
    pos_y: ArenaSlice<f32>,
    vel_x: ArenaSlice<f32>,
    vel_y: ArenaSlice<f32>,
    radius: ArenaSlice<f32>,
    color: ArenaSlice<u32>,
}

/// Mutable views of the live prefix of every column.
///
/// All slices have the same length: the live particle count.
pub struct ColumnsMut<'a> {
    /// Centre x.
    pub pos_x: &'a mut [f32],
    /// Centre y.
    pub pos_y: &'a mut [f32],
    /// Velocity x.
    pub vel_x: &'a mut [f32],
    /// Velocity y.
    pub vel_y: &'a mut [f32],
    /// Radius.
    pub radius: &'a mut [f32],
    /// Palette index.
    pub color: &'a mut [u32],
}

impl ColumnsMut<'_> {
    /// Returns the number of live particles in the view.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pos_x.len()
    }

    /// Returns true if the view is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos_x.is_empty()
    }

    /// Writes `particle` into slot `index`.
    #[inline]
    fn write(&mut self, index: usize, particle: Particle) {
        self.pos_x[index] = particle.x;
        self.pos_y[index] = particle.y;
        self.vel_x[index] = particle.vx;
        self.vel_y[index] = particle.vy;
        self.radius[index] = particle.radius;
        self.color[index] = particle.color;
    }
}

/// Fixed-capacity particle storage.
///
/// The columns are acquired from the arena on the first append and kept
/// until [`ParticleStore::clear`], which resets the arena. Capacity never
/// changes after construction.
///
/// # Example
///
/// ```rust,ignore
/// let mut store = ParticleStore::new(1024);
/// store.push(Particle::new(0.0, 0.0, 10.0, 0.0, 5.0))?;
/// assert_eq!(store.position(0), Some((0.0, 0.0)));
/// ```
pub struct ParticleStore {
    /// Backing memory for the columns.
    arena: Arena,
    /// Column handles, `None` until the first append after creation or clear.
    columns: Option<Columns>,
    /// Number of live particles.
    count: usize,
    /// Maximum number of particles.
    capacity: usize,
}

impl ParticleStore {
    /// Returns the arena bytes needed to hold `capacity` particles.
    #[must_use]
    pub const fn required_bytes(capacity: usize) -> usize {
        5 * align_up(capacity * size_of::<f32>()) + align_up(capacity * size_of::<u32>())
    }

    /// Creates a store with an arena sized exactly for `capacity` particles.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_arena(capacity, Arena::new(Self::required_bytes(capacity)))
    }

    /// Creates a store drawing its columns from `arena`.
    ///
    /// An undersized arena is not rejected here; the first append reports
    /// it as [`crate::Fault::AllocatorExhausted`].
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn with_arena(capacity: usize, arena: Arena) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            u32::try_from(capacity).is_ok(),
            "Capacity cannot exceed u32::MAX"
        );

        Self {
            arena,
            columns: None,
            count: 0,
            capacity,
        }
    }

    /// Returns the maximum number of particles.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of live particles.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns true if no particles are live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the store cannot take another particle.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    /// Returns the free slot count.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.capacity - self.count
    }

    /// Returns the backing arena.
    #[inline]
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Appends one particle.
    ///
    /// # Returns
    ///
    /// The new particle's index, or `None` if the store is full. A full
    /// store is left untouched.
    ///
    /// # Errors
    ///
    /// Returns a fault if the columns cannot be acquired from the arena.
    pub fn push(&mut self, particle: Particle) -> FaultResult<Option<u32>> {
        let index = self.count;
        let appended = self.extend_with(1, |_| particle)?;
        Ok((appended == 1).then_some(index as u32))
    }

    /// Appends up to `count` particles produced by `init`.
    ///
    /// `init` receives the position within the batch (`0..count`). The
    /// batch is truncated to the remaining capacity; a full store is left
    /// untouched.
    ///
    /// # Returns
    ///
    /// Number of particles actually appended.
    ///
    /// # Errors
    ///
    /// Returns a fault if the columns cannot be acquired from the arena.
    pub fn extend_with<F>(&mut self, count: usize, mut init: F) -> FaultResult<usize>
    where
        F: FnMut(usize) -> Particle,
    {
        let take = count.min(self.remaining());
        if take == 0 {
            return Ok(0);
        }

        let columns = self.ensure_columns()?;
        let start = self.count;
        let mut full = self.split(columns, self.capacity)?;
        for i in 0..take {
            full.write(start + i, init(i));
        }

        self.count += take;
        Ok(take)
    }

    /// Removes every particle and resets the arena.
    ///
    /// Column handles are dropped; the next append re-acquires them from
    /// the freshly wiped arena.
    pub fn clear(&mut self) {
        self.count = 0;
        self.columns = None;
        self.arena.reset();
    }

    /// Returns mutable views of the live prefix of every column.
    ///
    /// # Errors
    ///
    /// Returns a fault if the column handles went stale.
    pub fn columns_mut(&mut self) -> FaultResult<ColumnsMut<'_>> {
        match self.columns {
            Some(columns) => self.split(columns, self.count),
            None => Ok(ColumnsMut {
                pos_x: &mut [],
                pos_y: &mut [],
                vel_x: &mut [],
                vel_y: &mut [],
                radius: &mut [],
                color: &mut [],
            }),
        }
    }

    /// Centre x of every live particle.
    #[must_use]
    pub fn positions_x(&self) -> &[f32] {
        self.live(|c| c.pos_x)
    }

    /// Centre y of every live particle.
    #[must_use]
    pub fn positions_y(&self) -> &[f32] {
        self.live(|c| c.pos_y)
    }

    /// Velocity x of every live particle.
    #[must_use]
    pub fn velocities_x(&self) -> &[f32] {
        self.live(|c| c.vel_x)
    }

    /// Velocity y of every live particle.
    #[must_use]
    pub fn velocities_y(&self) -> &[f32] {
        self.live(|c| c.vel_y)
    }

    /// Radius of every live particle.
    #[must_use]
    pub fn radii(&self) -> &[f32] {
        self.live(|c| c.radius)
    }

    /// Palette index of every live particle.
    #[must_use]
    pub fn color_indices(&self) -> &[u32] {
        self.columns
            .and_then(|c| self.arena.slice(c.color).ok())
            .map(|s| &s[..self.count])
            .unwrap_or_default()
    }

    /// Centre of particle `index`, or `None` if it is not live.
    #[must_use]
    pub fn position(&self, index: usize) -> Option<(f32, f32)> {
        Some((
            *self.positions_x().get(index)?,
            *self.positions_y().get(index)?,
        ))
    }

    /// Velocity of particle `index`, or `None` if it is not live.
    #[must_use]
    pub fn velocity(&self, index: usize) -> Option<(f32, f32)> {
        Some((
            *self.velocities_x().get(index)?,
            *self.velocities_y().get(index)?,
        ))
    }

    /// Radius of particle `index`, or `None` if it is not live.
    #[must_use]
    pub fn radius(&self, index: usize) -> Option<f32> {
        self.radii().get(index).copied()
    }

    /// Palette index of particle `index`, or `None` if it is not live.
    #[must_use]
    pub fn color_index(&self, index: usize) -> Option<u32> {
        self.color_indices().get(index).copied()
    }

    /// Reads particle `index` back as a whole.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Particle> {
        let (x, y) = self.position(index)?;
        let (vx, vy) = self.velocity(index)?;
        Some(Particle {
            x,
            y,
            vx,
            vy,
            radius: self.radius(index)?,
            color: self.color_index(index)?,
        })
    }

    fn live(&self, pick: impl Fn(Columns) -> ArenaSlice<f32>) -> &[f32] {
        self.columns
            .and_then(|c| self.arena.slice(pick(c)).ok())
            .map(|s| &s[..self.count])
            .unwrap_or_default()
    }

    fn ensure_columns(&mut self) -> FaultResult<Columns> {
        if let Some(columns) = self.columns {
            return Ok(columns);
        }

        let capacity = self.capacity;
        let columns = Columns {
            pos_x: self.arena.alloc_slice(capacity)?,
            pos_y: self.arena.alloc_slice(capacity)?,
            vel_x: self.arena.alloc_slice(capacity)?,
            vel_y: self.arena.alloc_slice(capacity)?,
            radius: self.arena.alloc_slice(capacity)?,
            color: self.arena.alloc_slice(capacity)?,
        };
        self.columns = Some(columns);

        tracing::debug!(
            capacity,
            bytes = self.arena.used(),
            "particle columns acquired from arena"
        );
        Ok(columns)
    }

    fn split(&mut self, columns: Columns, len: usize) -> FaultResult<ColumnsMut<'_>> {
        let [px, py, vx, vy, r, c] = self.arena.split_mut([
            columns.pos_x.block(),
            columns.pos_y.block(),
            columns.vel_x.block(),
            columns.vel_y.block(),
            columns.radius.block(),
            columns.color.block(),
        ])?;

        Ok(ColumnsMut {
            pos_x: &mut bytemuck::cast_slice_mut(px)[..len],
            pos_y: &mut bytemuck::cast_slice_mut(py)[..len],
            vel_x: &mut bytemuck::cast_slice_mut(vx)[..len],
            vel_y: &mut bytemuck::cast_slice_mut(vy)[..len],
            radius: &mut bytemuck::cast_slice_mut(r)[..len],
            color: &mut bytemuck::cast_slice_mut(c)[..len],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fault;

    fn sample(i: usize) -> Particle {
        let f = i as f32;
        Particle::new(f, -f, 2.0 * f, 3.0, 5.0).with_color(i as u32 % 8)
    }

    #[test]
    fn test_store_starts_empty() {
        let store = ParticleStore::new(16);
        assert_eq!(store.count(), 0);
        assert_eq!(store.capacity(), 16);
        assert!(store.positions_x().is_empty());
        assert_eq!(store.position(0), None);
        // Columns are acquired lazily.
        assert_eq!(store.arena().used(), 0);
    }

    #[test]
    fn test_push_and_read_back() {
        let mut store = ParticleStore::new(4);
        let p = Particle::new(1.0, 2.0, 3.0, 4.0, 5.0).with_color(6);

        assert_eq!(store.push(p).unwrap(), Some(0));
        assert_eq!(store.count(), 1);
        assert_eq!(store.get(0), Some(p));
        assert_eq!(store.position(0), Some((1.0, 2.0)));
        assert_eq!(store.velocity(0), Some((3.0, 4.0)));
        assert_eq!(store.radius(0), Some(5.0));
        assert_eq!(store.color_index(0), Some(6));
        assert_eq!(store.get(1), None);
    }

    #[test]
    fn test_columns_use_exact_arena_size() {
        let mut store = ParticleStore::new(10);
        store.push(sample(0)).unwrap();
        assert_eq!(store.arena().used(), ParticleStore::required_bytes(10));
        assert_eq!(store.arena().remaining(), 0);
    }

    #[test]
    fn test_extend_truncates_to_capacity() {
        let mut store = ParticleStore::new(5);
        assert_eq!(store.extend_with(3, sample).unwrap(), 3);
        assert_eq!(store.extend_with(10, sample).unwrap(), 2);
        assert_eq!(store.count(), 5);
        assert!(store.is_full());
        // Appended particles continue at the tail, numbered from the batch start.
        assert_eq!(store.position(3), Some((0.0, 0.0)));
        assert_eq!(store.position(4), Some((1.0, -1.0)));
    }

    #[test]
    fn test_full_store_is_untouched() {
        let mut store = ParticleStore::new(2);
        store.extend_with(2, sample).unwrap();
        let before: Vec<f32> = store.positions_x().to_vec();

        let mut calls = 0;
        let appended = store
            .extend_with(4, |i| {
                calls += 1;
                sample(i + 100)
            })
            .unwrap();

        assert_eq!(appended, 0);
        assert_eq!(calls, 0);
        assert_eq!(store.positions_x(), before.as_slice());
        assert_eq!(store.push(sample(9)).unwrap(), None);
    }

    #[test]
    fn test_clear_resets_arena_and_reacquires() {
        let mut store = ParticleStore::new(8);
        store.extend_with(8, sample).unwrap();
        store.clear();

        assert_eq!(store.count(), 0);
        assert_eq!(store.arena().used(), 0);
        assert!(store.radii().is_empty());

        store.push(Particle::new(7.0, 7.0, 0.0, 0.0, 1.0)).unwrap();
        assert_eq!(store.count(), 1);
        assert_eq!(store.position(0), Some((7.0, 7.0)));

        let columns = store.columns_mut().unwrap();
        columns.pos_x[0] = 8.0;
        assert_eq!(store.position(0), Some((8.0, 7.0)));
    }

    #[test]
    fn test_undersized_arena_faults_on_first_append() {
        let mut store = ParticleStore::with_arena(100, Arena::new(64));
        let err = store.push(sample(0)).unwrap_err();
        assert!(matches!(err, Fault::AllocatorExhausted { capacity: 64, .. }));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_columns_mut_covers_live_prefix() {
        let mut store = ParticleStore::new(16);
        store.extend_with(3, sample).unwrap();

        let columns = store.columns_mut().unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns.vel_x, &[0.0, 2.0, 4.0]);
        assert_eq!(columns.color, &[0, 1, 2]);
    }
}
