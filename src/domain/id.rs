//! Order id allocation.
//!
//! Orders receive their id lazily, on the first item added. The allocator is
//! handed to the order at construction so that uniqueness depends on the
//! allocator chosen, not on clock resolution.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Source of order ids. Implementations must never return 0, which marks an
/// order whose id has not been assigned yet.
pub trait IdAllocator: Send + Sync + Debug {
    fn next_id(&self) -> u64;
}

/// Monotonic counter starting at 1. Unique for the lifetime of the allocator
/// until it reaches `u64::MAX`, where it saturates.
#[derive(Debug)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Counter whose first id is `first` (0 is bumped to 1).
    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: AtomicU64::new(first.max(1)),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator for SequentialIds {
    fn next_id(&self) -> u64 {
        // the closure always returns Some, so both arms carry the previous value
        match self
            .counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_add(1)))
        {
            Ok(previous) | Err(previous) => previous,
        }
    }
}

/// Wall-clock seconds times 1000 plus a random offset in `1..=100`.
///
/// Best effort only: two ids drawn within the same second collide with
/// probability 1/100.
#[derive(Debug, Default)]
pub struct ClockRandomIds;

impl ClockRandomIds {
    const SPREAD: u64 = 100;
}

impl IdAllocator for ClockRandomIds {
    fn next_id(&self) -> u64 {
        let seconds = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        let offset = rand::thread_rng().gen_range(1..=Self::SPREAD);
        seconds.wrapping_mul(1000).wrapping_add(offset).max(1)
    }
}
