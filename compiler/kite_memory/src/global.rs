//! `GlobalAlloc` adapter that redirects allocations into script memory.
//!
//! Install it in a worker binary:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOC: kite_memory::ScriptAllocator = kite_memory::ScriptAllocator;
//! ```
//!
//! While the current thread has malloc replacement enabled, requests with an
//! alignment the arena can honour go to the replacement pool (if installed)
//! or to the request arena. Everything else, and anything that does not fit,
//! goes to the system allocator. Frees and reallocs are routed by address, so
//! memory keeps returning to whoever handed it out after the flag flips.

use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr::{self, NonNull};

use crate::pool::ARENA_ALIGN;
use crate::script::{self, Redirect};

/// Process allocator that honours the per-thread malloc replacement flag.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptAllocator;

unsafe impl GlobalAlloc for ScriptAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() <= ARENA_ALIGN {
            if let Some(ptr) = script::redirected_alloc(layout.size(), false) {
                return ptr.as_ptr();
            }
        }
        System.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.align() <= ARENA_ALIGN {
            if let Some(ptr) = script::redirected_alloc(layout.size(), true) {
                return ptr.as_ptr();
            }
        }
        System.alloc_zeroed(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if let Some(nn) = NonNull::new(ptr) {
            if script::redirected_dealloc(nn, layout.size()) {
                return;
            }
        }
        System.dealloc(ptr, layout);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let Some(nn) = NonNull::new(ptr) else {
            return System.realloc(ptr, layout, new_size);
        };
        match script::redirected_realloc(nn, new_size, layout.size()) {
            Redirect::Done(fresh) => fresh.as_ptr(),
            Redirect::Foreign => System.realloc(ptr, layout, new_size),
            Redirect::Move => {
                let new_layout = Layout::from_size_align_unchecked(new_size, layout.align());
                let fresh = self.alloc(new_layout);
                if !fresh.is_null() {
                    ptr::copy_nonoverlapping(ptr, fresh, layout.size().min(new_size));
                    self.dealloc(ptr, layout);
                }
                fresh
            }
        }
    }
}

/// Size prefix written in front of every [`malloc_replace`] block.
const PREFIX: usize = ARENA_ALIGN;

/// `malloc`-style entry point into script memory.
///
/// The block remembers its own size, so it is released with
/// [`free_replace`] alone. Returns null when no request is active or the
/// arena is exhausted.
pub fn malloc_replace(size: usize) -> *mut u8 {
    let Some(total) = size.checked_add(PREFIX) else {
        return ptr::null_mut();
    };
    match script::allocate(total) {
        Ok(base) => {
            // SAFETY: the piece is at least `PREFIX` bytes and 8-byte aligned.
            unsafe {
                base.as_ptr().cast::<usize>().write(total);
                base.as_ptr().add(PREFIX)
            }
        }
        Err(_) => ptr::null_mut(),
    }
}

/// Release a block obtained from [`malloc_replace`]. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or come from [`malloc_replace`] during the current
/// request, and must not have been freed.
pub unsafe fn free_replace(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    let base = ptr.sub(PREFIX);
    let total = base.cast::<usize>().read();
    script::deallocate(NonNull::new_unchecked(base), total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{script_memory_stats, ScriptMemory};

    #[test]
    fn malloc_replace_round_trip() {
        let Ok(mut memory) = ScriptMemory::new(4096) else {
            panic!("failed to reserve script memory");
        };
        let _scope = memory.enter();

        let ptr = malloc_replace(20);
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % ARENA_ALIGN, 0);
        assert_eq!(script_memory_stats().memory_used, 32);

        unsafe { free_replace(ptr) };
        assert_eq!(script_memory_stats().memory_used, 0);
    }

    #[test]
    fn malloc_replace_outside_a_request_is_null() {
        assert!(malloc_replace(8).is_null());
        unsafe { free_replace(ptr::null_mut()) };
    }
}
