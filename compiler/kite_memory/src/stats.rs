//! Memory usage counters shared by every pool.

/// Snapshot of a pool's usage.
///
/// `memory_used` counts live bytes handed out to callers. `real_memory_used`
/// is the high-water mark of the bump region, i.e. how much of the buffer has
/// actually been touched. Both peaks are per-`init`; only the facade keeps a
/// cross-request total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Capacity of the underlying buffer.
    pub memory_limit: usize,
    /// Bytes currently allocated.
    pub memory_used: usize,
    /// Peak of `memory_used` since the last reset.
    pub max_memory_used: usize,
    /// Bytes of the buffer consumed by the bump pointer.
    pub real_memory_used: usize,
    /// Peak of `real_memory_used` since the last reset.
    pub max_real_memory_used: usize,
    /// Number of successful allocations since the last reset.
    pub total_allocations: u64,
    /// Sum of all allocation sizes since the last reset.
    pub total_memory_allocated: u64,
}

impl MemoryStats {
    /// Fresh counters for a buffer of `limit` bytes.
    pub const fn new(limit: usize) -> Self {
        MemoryStats {
            memory_limit: limit,
            memory_used: 0,
            max_memory_used: 0,
            real_memory_used: 0,
            max_real_memory_used: 0,
            total_allocations: 0,
            total_memory_allocated: 0,
        }
    }

    pub(crate) fn on_allocate(&mut self, size: usize) {
        self.memory_used += size;
        self.max_memory_used = self.max_memory_used.max(self.memory_used);
        self.total_allocations += 1;
        self.total_memory_allocated += size as u64;
    }

    pub(crate) fn on_deallocate(&mut self, size: usize) {
        self.memory_used = self.memory_used.saturating_sub(size);
    }

    pub(crate) fn on_bump(&mut self, consumed: usize) {
        self.real_memory_used = consumed;
        self.max_real_memory_used = self.max_real_memory_used.max(consumed);
    }

    /// Bytes still available to the pool's callers.
    pub fn memory_available(&self) -> usize {
        self.memory_limit.saturating_sub(self.memory_used)
    }
}
