//! Lock-protected pool used as an alternate target for redirected allocations.
//!
//! Installed through `set_script_allocator_replacement` when script-owned
//! allocations must not land in the request arena (oversize workloads, or
//! code running outside the worker that owns the arena). Unlike the arena it
//! owns its buffer and may be shared between threads.

use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr::NonNull;

use parking_lot::Mutex;

use crate::error::AllocError;
use crate::pool::{ArenaResource, ARENA_ALIGN};
use crate::stats::MemoryStats;

/// An [`ArenaResource`] over an owned buffer, guarded by a mutex.
#[derive(Debug)]
pub struct SynchronizedPool {
    buffer: NonNull<u8>,
    layout: Layout,
    arena: Mutex<ArenaResource>,
}

// SAFETY: the buffer is owned by the pool and only reached through the mutex.
unsafe impl Send for SynchronizedPool {}
// SAFETY: every access to the arena state goes through `arena`'s lock.
unsafe impl Sync for SynchronizedPool {}

impl SynchronizedPool {
    /// Create a pool with `capacity` bytes taken from the system allocator.
    pub fn new(capacity: usize) -> Result<Self, AllocError> {
        let layout = Layout::from_size_align(capacity.max(ARENA_ALIGN), ARENA_ALIGN)
            .map_err(|_| AllocError::InvalidLayout { size: capacity })?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { System.alloc(layout) };
        let buffer = NonNull::new(raw).ok_or(AllocError::OutOfMemory {
            requested: capacity,
            available: 0,
        })?;
        let mut arena = ArenaResource::new();
        // SAFETY: the buffer was just allocated for exclusive use by this pool
        // and is released only in `Drop`, after the arena is gone.
        unsafe { arena.init(buffer.as_ptr(), layout.size()) };
        Ok(SynchronizedPool {
            buffer,
            layout,
            arena: Mutex::new(arena),
        })
    }

    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.arena.lock().allocate(size)
    }

    pub fn allocate0(&self, size: usize) -> Option<NonNull<u8>> {
        self.arena.lock().allocate0(size)
    }

    /// # Safety
    ///
    /// See [`ArenaResource::reallocate`].
    pub unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        new_size: usize,
        old_size: usize,
    ) -> Option<NonNull<u8>> {
        self.arena.lock().reallocate(ptr, new_size, old_size)
    }

    /// # Safety
    ///
    /// See [`ArenaResource::deallocate`].
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        self.arena.lock().deallocate(ptr, size);
    }

    /// Whether `ptr` was handed out by this pool.
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.buffer.as_ptr() as usize;
        let addr = ptr as usize;
        addr >= start && addr < start + self.layout.size()
    }

    pub fn stats(&self) -> MemoryStats {
        *self.arena.lock().stats()
    }
}

impl Drop for SynchronizedPool {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with exactly this layout.
        unsafe { System.dealloc(self.buffer.as_ptr(), self.layout) };
    }
}
