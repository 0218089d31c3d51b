//! # Arena Allocator
//!
//! A bump allocator for the particle columns. Everything is handed out from
//! one buffer allocated at startup and released all at once by `reset`.

use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;

use crate::error::{Fault, FaultResult};

/// Alignment every allocation is rounded up to, in bytes.
pub const ALIGNMENT: usize = 8;

/// Rounds `len` up to the next multiple of [`ALIGNMENT`].
#[inline]
#[must_use]
pub const fn align_up(len: usize) -> usize {
    (len + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// An untyped region of the arena.
///
/// Carries the epoch it was issued in, so a block kept across a `reset`
/// is detected instead of silently aliasing newer allocations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaBlock {
    /// Byte offset into the arena (always a multiple of [`ALIGNMENT`]).
    offset: usize,
    /// Requested length in bytes (before rounding).
    bytes: usize,
    /// Arena epoch at allocation time.
    epoch: u32,
}

impl ArenaBlock {
    /// Returns the byte offset of the block.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset
    }

    /// Returns the requested length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.bytes
    }

    /// Returns true if the block is zero-sized.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bytes == 0
    }

    /// Returns the epoch the block was issued in.
    #[inline]
    #[must_use]
    pub const fn epoch(self) -> u32 {
        self.epoch
    }

    /// End of the block after alignment rounding.
    #[inline]
    const fn end(self) -> usize {
        self.offset + align_up(self.bytes)
    }
}

/// A typed handle to `len` elements of `T` inside the arena.
#[derive(Debug)]
pub struct ArenaSlice<T> {
    block: ArenaBlock,
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ArenaSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaSlice<T> {}

impl<T> ArenaSlice<T> {
    /// Returns the element count.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the slice holds no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the untyped block behind this slice.
    #[inline]
    #[must_use]
    pub const fn block(&self) -> ArenaBlock {
        self.block
    }
}

/// A bump-pointer arena allocator.
///
/// Allocations only advance a byte counter. Memory is released all at once
/// by [`Arena::reset`], which also wipes the used region so the next round
/// of allocations starts zeroed.
///
/// The backing store is a slice of `u64` words, so every block starts on an
/// 8-byte boundary and can be viewed as any `Pod` type with alignment <= 8.
///
/// # Thread Safety
///
/// Views are borrowed from the arena, so the borrow checker rules out
/// concurrent mutation. Hand disjoint views to threads, not the arena.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = Arena::new(1024);
/// let xs = arena.alloc_slice::<f32>(16)?;
/// arena.slice_mut(xs)?[0] = 1.0;
/// arena.reset(); // `xs` is stale from here on
/// ```
pub struct Arena {
    /// Zeroed backing storage.
    words: Box<[u64]>,
    /// Bytes handed out so far.
    used: usize,
    /// Total capacity in bytes.
    capacity: usize,
    /// Bumped on every reset.
    epoch: u32,
}

impl Arena {
    /// Creates a new arena with the specified capacity in bytes.
    ///
    /// The whole capacity is allocated and zeroed up front.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let words = vec![0u64; align_up(capacity) / ALIGNMENT].into_boxed_slice();
        Self {
            words,
            used: 0,
            capacity,
            epoch: 0,
        }
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the bytes handed out since the last reset.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Returns the remaining free space in bytes.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.capacity - self.used
    }

    /// Returns the current epoch (number of resets so far).
    #[inline]
    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Allocates `len` bytes, rounded up to [`ALIGNMENT`].
    ///
    /// # Errors
    ///
    /// Returns [`Fault::AllocatorExhausted`] if the rounded request does not
    /// fit in the remaining space. This is fatal for the caller: the arena
    /// never grows.
    pub fn alloc(&mut self, len: usize) -> FaultResult<ArenaBlock> {
        let aligned = len
            .checked_add(ALIGNMENT - 1)
            .map(|l| l & !(ALIGNMENT - 1))
            .ok_or(self.exhausted(usize::MAX))?;

        if aligned > self.remaining() {
            return Err(self.exhausted(aligned));
        }

        let block = ArenaBlock {
            offset: self.used,
            bytes: len,
            epoch: self.epoch,
        };
        self.used += aligned;
        Ok(block)
    }

    /// Allocates a zeroed slice of `count` elements of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::AllocatorExhausted`] if the slice does not fit.
    pub fn alloc_slice<T: Pod>(&mut self, count: usize) -> FaultResult<ArenaSlice<T>> {
        debug_assert!(std::mem::align_of::<T>() <= ALIGNMENT);

        let bytes = size_of::<T>()
            .checked_mul(count)
            .ok_or(self.exhausted(usize::MAX))?;
        let block = self.alloc(bytes)?;

        Ok(ArenaSlice {
            block,
            len: count,
            _marker: PhantomData,
        })
    }

    /// Views a typed slice.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::StaleHandle`] if the slice predates the last reset.
    pub fn slice<T: Pod>(&self, slice: ArenaSlice<T>) -> FaultResult<&[T]> {
        let bytes = self.bytes(slice.block)?;
        Ok(bytemuck::cast_slice(bytes))
    }

    /// Views a typed slice mutably.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::StaleHandle`] if the slice predates the last reset.
    pub fn slice_mut<T: Pod>(&mut self, slice: ArenaSlice<T>) -> FaultResult<&mut [T]> {
        let bytes = self.bytes_mut(slice.block)?;
        Ok(bytemuck::cast_slice_mut(bytes))
    }

    /// Views a block as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::StaleHandle`] if the block predates the last reset.
    pub fn bytes(&self, block: ArenaBlock) -> FaultResult<&[u8]> {
        self.check_epoch(block)?;
        let (start, end) = Self::word_range(block);
        let region: &[u8] = bytemuck::cast_slice(&self.words[start..end]);
        Ok(&region[..block.bytes])
    }

    /// Views a block as raw mutable bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::StaleHandle`] if the block predates the last reset.
    pub fn bytes_mut(&mut self, block: ArenaBlock) -> FaultResult<&mut [u8]> {
        self.check_epoch(block)?;
        let (start, end) = Self::word_range(block);
        let region: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words[start..end]);
        Ok(&mut region[..block.bytes])
    }

    /// Borrows several blocks mutably at once.
    ///
    /// Blocks must be listed in allocation order. Since the arena only ever
    /// bumps forward, blocks from the same epoch never overlap, which is
    /// what makes the simultaneous borrows sound.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::StaleHandle`] if any block predates the last reset.
    ///
    /// # Panics
    ///
    /// Panics if the blocks are not in ascending allocation order.
    pub fn split_mut<const N: usize>(
        &mut self,
        blocks: [ArenaBlock; N],
    ) -> FaultResult<[&mut [u8]; N]> {
        for block in blocks {
            self.check_epoch(block)?;
        }
        for pair in blocks.windows(2) {
            assert!(
                pair[0].end() <= pair[1].offset,
                "arena blocks must be split in allocation order"
            );
        }

        let mut rest: &mut [u64] = &mut self.words;
        let mut cursor = 0usize;

        Ok(std::array::from_fn(|i| {
            let block = blocks[i];
            let (start, end) = Self::word_range(block);

            let remaining = std::mem::take(&mut rest);
            let (_, tail) = remaining.split_at_mut(start - cursor);
            let (own, tail) = tail.split_at_mut(end - start);
            rest = tail;
            cursor = end;

            let region: &mut [u8] = bytemuck::cast_slice_mut(own);
            &mut region[..block.bytes]
        }))
    }

    /// Resets the arena, invalidating all previous allocations.
    ///
    /// Only the used prefix is wiped, so the cost is proportional to what
    /// was allocated rather than to the capacity. Handles from before the
    /// reset fail with [`Fault::StaleHandle`] from here on.
    pub fn reset(&mut self) {
        let used_words = self.used / ALIGNMENT;
        self.words[..used_words].fill(0);
        self.used = 0;
        self.epoch = self.epoch.wrapping_add(1);
        tracing::debug!(epoch = self.epoch, "arena reset");
    }

    #[inline]
    fn check_epoch(&self, block: ArenaBlock) -> FaultResult<()> {
        if block.epoch == self.epoch {
            Ok(())
        } else {
            Err(Fault::StaleHandle {
                handle_epoch: block.epoch,
                arena_epoch: self.epoch,
            })
        }
    }

    #[inline]
    const fn word_range(block: ArenaBlock) -> (usize, usize) {
        (block.offset / ALIGNMENT, block.end() / ALIGNMENT)
    }

    #[inline]
    const fn exhausted(&self, requested: usize) -> Fault {
        Fault::AllocatorExhausted {
            requested,
            used: self.used,
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 8);
        assert_eq!(align_up(8), 8);
        assert_eq!(align_up(13), 16);
    }

    #[test]
    fn test_arena_allocation() {
        let mut arena = Arena::new(1024);
        let slice = arena.alloc_slice::<f32>(10).unwrap();
        assert_eq!(slice.len(), 10);
        assert_eq!(arena.slice(slice).unwrap().len(), 10);
        // 40 bytes is already a multiple of 8
        assert_eq!(arena.used(), 40);
    }

    #[test]
    fn test_arena_rounds_to_alignment() {
        let mut arena = Arena::new(64);
        let a = arena.alloc(3).unwrap();
        let b = arena.alloc(5).unwrap();
        assert_eq!(a.offset(), 0);
        assert_eq!(b.offset(), 8);
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn test_arena_hands_out_zeroed_memory() {
        let mut arena = Arena::new(256);
        let ids = arena.alloc_slice::<u32>(16).unwrap();
        assert!(arena.slice(ids).unwrap().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_arena_exhaustion_is_reported() {
        let mut arena = Arena::new(32);
        let _ = arena.alloc(24).unwrap();

        let err = arena.alloc(9).unwrap_err();
        assert_eq!(
            err,
            Fault::AllocatorExhausted {
                requested: 16,
                used: 24,
                capacity: 32,
            }
        );
        // A failed request leaves the counter untouched.
        assert_eq!(arena.used(), 24);
    }

    #[test]
    fn test_arena_reset() {
        let mut arena = Arena::new(1024);
        let xs = arena.alloc_slice::<f32>(10).unwrap();
        arena.slice_mut(xs).unwrap().fill(7.5);
        assert!(arena.used() > 0);

        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.epoch(), 1);

        // Fresh allocation over the same bytes starts zeroed.
        let ys = arena.alloc_slice::<f32>(10).unwrap();
        assert!(arena.slice(ys).unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_stale_handle_detected_after_reset() {
        let mut arena = Arena::new(128);
        let xs = arena.alloc_slice::<f32>(4).unwrap();
        arena.reset();

        assert!(matches!(
            arena.slice(xs),
            Err(Fault::StaleHandle {
                handle_epoch: 0,
                arena_epoch: 1
            })
        ));
    }

    #[test]
    fn test_split_mut_gives_disjoint_views() {
        let mut arena = Arena::new(256);
        let a = arena.alloc_slice::<f32>(3).unwrap();
        let b = arena.alloc_slice::<u32>(5).unwrap();

        {
            let [ra, rb] = arena.split_mut([a.block(), b.block()]).unwrap();
            let fa: &mut [f32] = bytemuck::cast_slice_mut(ra);
            let fb: &mut [u32] = bytemuck::cast_slice_mut(rb);
            fa.fill(1.0);
            fb.fill(9);
        }

        assert_eq!(arena.slice(a).unwrap(), &[1.0, 1.0, 1.0]);
        assert_eq!(arena.slice(b).unwrap(), &[9, 9, 9, 9, 9]);
    }
}
