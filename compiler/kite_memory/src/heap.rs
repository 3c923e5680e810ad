//! Persistent heap pool.
//!
//! Memory that must survive request boundaries (caches, counters shared by
//! consecutive requests) is taken straight from the system allocator and is
//! never touched by arena resets. The pool only adds accounting so
//! `memory_get_static_usage` can report it.

use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::AllocError;
use crate::pool::ARENA_ALIGN;

/// Accounting wrapper around the system allocator.
#[derive(Debug)]
pub struct HeapPool {
    used: AtomicUsize,
    allocations: AtomicU64,
}

impl HeapPool {
    pub const fn new() -> Self {
        HeapPool {
            used: AtomicUsize::new(0),
            allocations: AtomicU64::new(0),
        }
    }

    /// Live bytes handed out by this pool.
    pub fn memory_used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    /// Allocations performed over the pool's lifetime.
    pub fn total_allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let layout = layout_for(size)?;
        // SAFETY: `layout_for` never produces a zero-sized layout.
        let ptr = unsafe { System.alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or(AllocError::OutOfMemory {
            requested: size,
            available: 0,
        })?;
        self.used.fetch_add(layout.size(), Ordering::Relaxed);
        self.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(ptr)
    }

    /// # Safety
    ///
    /// `ptr` must come from this pool with size `old_size` and not be freed.
    pub unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        new_size: usize,
        old_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let old_layout = layout_for(old_size)?;
        let new_layout = layout_for(new_size)?;
        let fresh = System.realloc(ptr.as_ptr(), old_layout, new_layout.size());
        let fresh = NonNull::new(fresh).ok_or(AllocError::OutOfMemory {
            requested: new_size,
            available: 0,
        })?;
        self.used.fetch_sub(old_layout.size(), Ordering::Relaxed);
        self.used.fetch_add(new_layout.size(), Ordering::Relaxed);
        Ok(fresh)
    }

    /// # Safety
    ///
    /// `ptr` must come from this pool with size `size` and not be freed.
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        let Ok(layout) = layout_for(size) else {
            return;
        };
        System.dealloc(ptr.as_ptr(), layout);
        self.used.fetch_sub(layout.size(), Ordering::Relaxed);
    }
}

impl Default for HeapPool {
    fn default() -> Self {
        Self::new()
    }
}

fn layout_for(size: usize) -> Result<Layout, AllocError> {
    Layout::from_size_align(size.max(1), ARENA_ALIGN).map_err(|_| AllocError::InvalidLayout { size })
}

/// The process-wide persistent pool.
static HEAP: HeapPool = HeapPool::new();

/// Allocate persistent memory (survives `free_script_allocator`).
pub fn heap_allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
    HEAP.allocate(size)
}

/// Resize persistent memory.
///
/// # Safety
///
/// `ptr` must come from [`heap_allocate`]/[`heap_reallocate`] with size
/// `old_size` and must not have been freed.
pub unsafe fn heap_reallocate(
    ptr: NonNull<u8>,
    new_size: usize,
    old_size: usize,
) -> Result<NonNull<u8>, AllocError> {
    HEAP.reallocate(ptr, new_size, old_size)
}

/// Release persistent memory.
///
/// # Safety
///
/// `ptr` must come from [`heap_allocate`]/[`heap_reallocate`] with size `size`
/// and must not have been freed.
pub unsafe fn heap_deallocate(ptr: NonNull<u8>, size: usize) {
    HEAP.deallocate(ptr, size);
}

/// Live bytes in the persistent pool.
pub fn heap_memory_used() -> usize {
    HEAP.memory_used()
}

#[cfg(test)]
mod tests;
