//! Round-robin worker selection.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free cyclic selector.
///
/// The first selection is index 0. The counter wraps on overflow.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next index in `[0, len)`, or `None` when there is nothing to pick.
    pub fn next(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.counter.fetch_add(1, Ordering::Relaxed) % len)
    }
}
