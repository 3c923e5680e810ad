//! Kite memory subsystem.
//!
//! Three allocators back the runtime:
//!
//! - [`ArenaResource`]: the per-request script arena. Pieces are freed
//!   individually while the request runs and all at once when it ends.
//! - [`HeapPool`]: persistent memory that survives request boundaries.
//! - [`SynchronizedPool`]: a lock-protected arena that can replace the
//!   request arena as the target of redirected allocations.
//!
//! The facade in [`script`] ties them to the request lifecycle and exposes
//! the counters behind `memory_get_usage` and friends. [`ScriptAllocator`]
//! plugs the facade into Rust's global allocator so ordinary `Box`/`Vec`/`Rc`
//! allocations land in script memory while replacement is enabled.

#![allow(
    unsafe_code,
    reason = "allocators manage raw memory and implement GlobalAlloc"
)]

mod error;
mod global;
mod heap;
mod pool;
pub mod script;
mod stats;
mod synchronized;

pub use error::AllocError;
pub use global::{free_replace, malloc_replace, ScriptAllocator};
pub use heap::{heap_allocate, heap_deallocate, heap_memory_used, heap_reallocate, HeapPool};
pub use pool::{piece_size, ArenaResource, ARENA_ALIGN, SMALL_PIECE_LIMIT};
pub use script::{
    allocate, allocate0, allocator_state, deallocate, disable_malloc_replacement,
    drop_script_allocator_replacement, enable_malloc_replacement, free_script_allocator,
    global_init_script_allocator, init_script_allocator, is_malloc_replaced, is_script_running,
    query_num, reallocate, script_memory_stats, set_script_allocator_replacement,
    total_memory_allocated, AllocatorState, ScriptMemory, ScriptScope,
};
pub use stats::MemoryStats;
pub use synchronized::SynchronizedPool;
