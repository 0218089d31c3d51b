//! # Fatal Faults
//!
//! Conditions the simulation cannot continue from. There is no fallback
//! allocation strategy and no overflow bucket, so every variant here ends
//! the simulation: the owner records it, reports it, and stops stepping.

use thiserror::Error;

/// A fatal simulation fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The arena cannot satisfy an allocation.
    #[error("arena exhausted: requested {requested} bytes with {used} of {capacity} bytes used")]
    AllocatorExhausted {
        /// Requested size after alignment rounding.
        requested: usize,
        /// Bytes already handed out.
        used: usize,
        /// Total arena capacity.
        capacity: usize,
    },

    /// More particles mapped to a bucket than it has slots for.
    #[error("bucket ({bucket_x}, {bucket_y}) overflowed its capacity of {capacity} particles")]
    BucketOverflow {
        /// Bucket column.
        bucket_x: usize,
        /// Bucket row.
        bucket_y: usize,
        /// Fixed slot count per bucket.
        capacity: usize,
    },

    /// An arena handle issued before the last reset was used.
    #[error("stale arena handle from epoch {handle_epoch} used in epoch {arena_epoch}")]
    StaleHandle {
        /// Epoch the handle was issued in.
        handle_epoch: u32,
        /// Current arena epoch.
        arena_epoch: u32,
    },
}

/// Result type for operations that can fault.
pub type FaultResult<T> = Result<T, Fault>;
