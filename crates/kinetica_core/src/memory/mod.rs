//! # Memory Management
//!
//! One arena allocated at startup backs every particle column.
//!
//! ## Design Philosophy
//!
//! - No allocation after the first generate
//! - No partial frees, only a whole-arena reset
//! - Handles carry an epoch so use-after-reset is caught

mod arena;

pub use arena::{align_up, Arena, ArenaBlock, ArenaSlice, ALIGNMENT};
