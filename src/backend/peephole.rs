//! Redundant load elimination.
//!
//! Every memory access of the lowered code goes through the accumulator, so
//! right after a `loadAI` or `storeAI` the accumulator holds the value of
//! that memory location. A following `loadAI` of the same location can skip
//! the memory read. Anything else that runs in between may clobber the
//! accumulator and clears the cache, and so does any label since control can
//! arrive there from elsewhere.

use tracing::debug;

use crate::middle::iloc::{MemoryOperand, Register};

/// The one memory location whose value is known to be in the accumulator
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadCache {
    entry: Option<(Register, i32)>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `memory` is the cached location, in which case the load can
    /// be elided
    pub fn hit(&self, memory: &MemoryOperand) -> bool {
        let hit = self
            .entry
            .as_ref()
            .is_some_and(|(base, offset)| base == memory.base && *offset == memory.offset);

        if hit {
            debug!(base = ?memory.base, offset = memory.offset, "elided redundant load");
        }

        hit
    }

    /// Records that the accumulator now mirrors `memory`
    pub fn record(&mut self, memory: &MemoryOperand) {
        self.entry = Some((memory.base.clone(), memory.offset));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
