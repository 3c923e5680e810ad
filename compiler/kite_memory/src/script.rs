//! Allocator facade: the per-worker script allocator and its lifecycle.
//!
//! Each worker thread owns one context:
//!
//! ```text
//!   Uninitialized ──init──▶ Active ──free──▶ Finalized
//!                             ▲                  │
//!                             └──────init────────┘
//! ```
//!
//! `init_script_allocator` hands the context a buffer for the coming request
//! and resets the per-request counters; `free_script_allocator` drops the
//! whole arena in one step. Between the two, generic allocations may be
//! redirected into the arena (see [`crate::ScriptAllocator`]) while the
//! replacement flag is on.
//!
//! Everything here is reachable from inside `GlobalAlloc`, so the state is
//! kept in a `const`-initialized thread local without destructors, the arena
//! borrow is never held across a call that could allocate, and logging only
//! happens after the borrow is released.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::AllocError;
use crate::pool::{ArenaResource, ARENA_ALIGN};
use crate::stats::MemoryStats;
use crate::synchronized::SynchronizedPool;

/// Lifecycle state of a worker's script allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocatorState {
    /// No request has started on this worker yet.
    Uninitialized,
    /// A request is running and owns the arena.
    Active,
    /// The last request finished; the arena is dead until the next init.
    Finalized,
}

struct ScriptContext {
    state: Cell<AllocatorState>,
    arena: RefCell<ArenaResource>,
    /// Start and length of the current (or last) arena. Kept after
    /// finalization so late frees of dead arena memory are recognized;
    /// cleared when the buffer itself is released.
    bounds: Cell<(usize, usize)>,
    /// Pool receiving redirected allocations instead of the arena.
    replacement: Cell<Option<&'static SynchronizedPool>>,
    /// Last installed replacement, still consulted when routing frees.
    known_pool: Cell<Option<&'static SynchronizedPool>>,
    replace_malloc: Cell<bool>,
    script_running: Cell<bool>,
    query_num: Cell<u64>,
    /// Bytes allocated by requests that already finished.
    finished_total: Cell<u64>,
}

impl ScriptContext {
    const fn new() -> Self {
        ScriptContext {
            state: Cell::new(AllocatorState::Uninitialized),
            arena: RefCell::new(ArenaResource::new()),
            bounds: Cell::new((0, 0)),
            replacement: Cell::new(None),
            known_pool: Cell::new(None),
            replace_malloc: Cell::new(false),
            script_running: Cell::new(false),
            query_num: Cell::new(0),
            finished_total: Cell::new(0),
        }
    }

    fn owns(&self, ptr: *const u8) -> bool {
        let (start, len) = self.bounds.get();
        let addr = ptr as usize;
        addr >= start && addr < start + len
    }

    fn current_total(&self) -> u64 {
        match self.arena.try_borrow() {
            Ok(arena) => arena.stats().total_memory_allocated,
            Err(_) => 0,
        }
    }

    /// Close the running request, folding its volume into the total.
    fn finish(&self) -> MemoryStats {
        self.replace_malloc.set(false);
        self.script_running.set(false);
        self.state.set(AllocatorState::Finalized);
        let stats = *self.arena.borrow().stats();
        self.finished_total
            .set(self.finished_total.get() + stats.total_memory_allocated);
        stats
    }
}

thread_local! {
    static CONTEXT: ScriptContext = const { ScriptContext::new() };
}

// ── Lifecycle ───────────────────────────────────────────────────────────

/// Reset this worker's allocator to its pristine, pre-first-request state.
///
/// Called once when a worker starts; also forgets the request counter.
/// Refused while a request is active, since live arena values would no
/// longer be recognized when freed.
pub fn global_init_script_allocator() -> Result<(), AllocError> {
    let reset = CONTEXT.with(|ctx| {
        if ctx.state.get() == AllocatorState::Active {
            return false;
        }
        ctx.state.set(AllocatorState::Uninitialized);
        *ctx.arena.borrow_mut() = ArenaResource::new();
        ctx.bounds.set((0, 0));
        ctx.replace_malloc.set(false);
        ctx.script_running.set(false);
        ctx.query_num.set(0);
        ctx.finished_total.set(0);
        true
    });
    if !reset {
        tracing::error!("critical: global_init_script_allocator during an active request");
        return Err(AllocError::RequestActive);
    }
    tracing::debug!("script allocator reset for a new worker");
    Ok(())
}

/// Start a request: serve script memory from `size` bytes at `buffer`.
///
/// Resets current and peak usage; the cross-request total is kept.
///
/// # Safety
///
/// `buffer` must be valid for reads and writes of `size` bytes and must not
/// be used by anything else until [`free_script_allocator`] returns. Memory
/// from a previous arena must not be freed after this call.
pub unsafe fn init_script_allocator(buffer: NonNull<u8>, size: usize) {
    let (query, interrupted) = CONTEXT.with(|ctx| {
        let interrupted = ctx.state.get() == AllocatorState::Active;
        if interrupted {
            ctx.finish();
        }
        let mut arena = ctx.arena.borrow_mut();
        arena.init(buffer.as_ptr(), size);
        ctx.bounds.set(arena.bounds());
        drop(arena);

        ctx.state.set(AllocatorState::Active);
        ctx.script_running.set(true);
        let query = ctx.query_num.get() + 1;
        ctx.query_num.set(query);
        (query, interrupted)
    });
    if interrupted {
        tracing::error!(query, "previous request never called free_script_allocator");
    }
    tracing::debug!(query, size, "script allocator initialized");
}

/// Finish a request: the whole arena becomes invalid at once.
pub fn free_script_allocator() {
    let finished = CONTEXT.with(|ctx| {
        if ctx.state.get() == AllocatorState::Active {
            Some((ctx.query_num.get(), ctx.finish()))
        } else {
            ctx.replace_malloc.set(false);
            ctx.script_running.set(false);
            None
        }
    });
    match finished {
        Some((query, stats)) => tracing::debug!(
            query,
            used = stats.memory_used,
            peak = stats.max_memory_used,
            real_peak = stats.max_real_memory_used,
            "script allocator freed"
        ),
        None => tracing::warn!("free_script_allocator called without an active request"),
    }
}

// ── Script memory ───────────────────────────────────────────────────────

fn with_active_arena<R>(f: impl FnOnce(&mut ArenaResource) -> R) -> Result<R, AllocError> {
    let result = CONTEXT.with(|ctx| match ctx.state.get() {
        AllocatorState::Uninitialized => Err(AllocError::NotInitialized),
        AllocatorState::Finalized => Err(AllocError::Finalized),
        AllocatorState::Active => Ok(f(&mut ctx.arena.borrow_mut())),
    });
    if let Err(err) = &result {
        tracing::error!(%err, "critical: script allocator misuse");
    }
    result
}

fn out_of_memory(arena: &ArenaResource, requested: usize) -> AllocError {
    AllocError::OutOfMemory {
        requested,
        available: arena.stats().memory_available(),
    }
}

/// Allocate `size` bytes of script memory.
pub fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
    with_active_arena(|arena| {
        arena
            .allocate(size)
            .ok_or_else(|| out_of_memory(arena, size))
    })?
}

/// Allocate `size` zero-filled bytes of script memory.
pub fn allocate0(size: usize) -> Result<NonNull<u8>, AllocError> {
    with_active_arena(|arena| {
        arena
            .allocate0(size)
            .ok_or_else(|| out_of_memory(arena, size))
    })?
}

/// Resize script memory. On failure the old piece stays valid.
///
/// # Safety
///
/// `ptr` must come from [`allocate`]/[`allocate0`]/[`reallocate`] during the
/// current request with size `old_size`, and must not have been freed.
pub unsafe fn reallocate(
    ptr: NonNull<u8>,
    new_size: usize,
    old_size: usize,
) -> Result<NonNull<u8>, AllocError> {
    with_active_arena(|arena| {
        arena
            .reallocate(ptr, new_size, old_size)
            .ok_or_else(|| out_of_memory(arena, new_size))
    })?
}

/// Return script memory. A no-op once the request is finalized.
///
/// # Safety
///
/// `ptr` must come from this worker's arena with size `size` and must not
/// have been freed. Passing a different size corrupts the arena.
pub unsafe fn deallocate(ptr: NonNull<u8>, size: usize) {
    let foreign = CONTEXT.with(|ctx| {
        if !ctx.owns(ptr.as_ptr()) {
            return true;
        }
        if ctx.state.get() == AllocatorState::Active {
            ctx.arena.borrow_mut().deallocate(ptr, size);
        }
        false
    });
    if foreign {
        tracing::error!(
            addr = ptr.as_ptr() as usize,
            size,
            "critical: deallocate of memory outside the script arena"
        );
    }
}

// ── Replacement ─────────────────────────────────────────────────────────

/// Send redirected allocations to `pool` instead of the arena.
pub fn set_script_allocator_replacement(pool: &'static SynchronizedPool) {
    CONTEXT.with(|ctx| {
        ctx.replacement.set(Some(pool));
        ctx.known_pool.set(Some(pool));
    });
    tracing::debug!("script allocator replacement installed");
}

/// Stop sending redirected allocations to the replacement pool.
///
/// Pieces it already handed out are still returned to it when freed.
pub fn drop_script_allocator_replacement() {
    CONTEXT.with(|ctx| ctx.replacement.set(None));
    tracing::debug!("script allocator replacement dropped");
}

/// Start redirecting generic allocations into script memory.
///
/// Returns `false` (and leaves the flag off) when there is neither an active
/// arena nor a replacement pool to redirect to.
pub fn enable_malloc_replacement() -> bool {
    let enabled = CONTEXT.with(|ctx| {
        let target = ctx.state.get() == AllocatorState::Active || ctx.replacement.get().is_some();
        ctx.replace_malloc.set(target);
        target
    });
    if !enabled {
        tracing::warn!("malloc replacement requested outside of a request");
    }
    enabled
}

/// Stop redirecting generic allocations.
pub fn disable_malloc_replacement() {
    CONTEXT.with(|ctx| ctx.replace_malloc.set(false));
}

// ── Introspection ───────────────────────────────────────────────────────

/// Requests started on this worker; 0 before the first request.
pub fn query_num() -> u64 {
    CONTEXT.with(|ctx| ctx.query_num.get())
}

/// Whether a request is between init and free.
pub fn is_script_running() -> bool {
    CONTEXT.with(|ctx| ctx.script_running.get())
}

/// Whether generic allocations are currently redirected.
pub fn is_malloc_replaced() -> bool {
    CONTEXT.with(|ctx| ctx.replace_malloc.get())
}

pub fn allocator_state() -> AllocatorState {
    CONTEXT.with(|ctx| ctx.state.get())
}

/// Counters of the current (or last) request's arena.
pub fn script_memory_stats() -> MemoryStats {
    CONTEXT.with(|ctx| match ctx.arena.try_borrow() {
        Ok(arena) => *arena.stats(),
        Err(_) => MemoryStats::default(),
    })
}

/// Bytes allocated from script memory across all requests of this worker.
pub fn total_memory_allocated() -> u64 {
    CONTEXT.with(|ctx| {
        let running = if ctx.state.get() == AllocatorState::Active {
            ctx.current_total()
        } else {
            0
        };
        ctx.finished_total.get() + running
    })
}

// ── GlobalAlloc routing ─────────────────────────────────────────────────

/// Outcome of routing a realloc of a possibly script-owned pointer.
pub(crate) enum Redirect {
    /// Resized by the owning pool.
    Done(NonNull<u8>),
    /// Script-owned, but must be moved to fresh memory by the caller.
    Move,
    /// Not script memory; use the system allocator.
    Foreign,
}

/// Allocate from the redirection target, if redirection is on.
pub(crate) fn redirected_alloc(size: usize, zeroed: bool) -> Option<NonNull<u8>> {
    CONTEXT
        .try_with(|ctx| {
            if !ctx.replace_malloc.get() {
                return None;
            }
            if let Some(pool) = ctx.replacement.get() {
                return if zeroed {
                    pool.allocate0(size)
                } else {
                    pool.allocate(size)
                };
            }
            if ctx.state.get() != AllocatorState::Active {
                return None;
            }
            let mut arena = ctx.arena.try_borrow_mut().ok()?;
            if zeroed {
                arena.allocate0(size)
            } else {
                arena.allocate(size)
            }
        })
        .ok()
        .flatten()
}

/// Free `ptr` if it is script memory. Returns `false` for foreign pointers.
///
/// # Safety
///
/// `ptr`/`size` must describe a live allocation made through the global
/// allocator.
pub(crate) unsafe fn redirected_dealloc(ptr: NonNull<u8>, size: usize) -> bool {
    CONTEXT
        .try_with(|ctx| {
            if ctx.owns(ptr.as_ptr()) {
                if ctx.state.get() == AllocatorState::Active {
                    if let Ok(mut arena) = ctx.arena.try_borrow_mut() {
                        arena.deallocate(ptr, size);
                    }
                }
                return true;
            }
            match ctx.known_pool.get() {
                Some(pool) if pool.contains(ptr.as_ptr()) => {
                    pool.deallocate(ptr, size);
                    true
                }
                _ => false,
            }
        })
        .unwrap_or(false)
}

/// Resize `ptr` inside its owning pool when it is script memory.
///
/// # Safety
///
/// Same as [`redirected_dealloc`].
pub(crate) unsafe fn redirected_realloc(
    ptr: NonNull<u8>,
    new_size: usize,
    old_size: usize,
) -> Redirect {
    CONTEXT
        .try_with(|ctx| {
            if ctx.owns(ptr.as_ptr()) {
                if ctx.state.get() != AllocatorState::Active {
                    return Redirect::Move;
                }
                let resized = match ctx.arena.try_borrow_mut() {
                    Ok(mut arena) => arena.reallocate(ptr, new_size, old_size),
                    Err(_) => None,
                };
                return resized.map_or(Redirect::Move, Redirect::Done);
            }
            match ctx.known_pool.get() {
                Some(pool) if pool.contains(ptr.as_ptr()) => pool
                    .reallocate(ptr, new_size, old_size)
                    .map_or(Redirect::Move, Redirect::Done),
                _ => Redirect::Foreign,
            }
        })
        .unwrap_or(Redirect::Foreign)
}

// ── Scoped lifecycle ────────────────────────────────────────────────────

/// An arena buffer owned by a worker and reused for every request.
///
/// Dropping it finishes a request that is still running on it (for example
/// when its scope was leaked) and detaches the allocator from the buffer.
#[derive(Debug)]
pub struct ScriptMemory {
    buffer: NonNull<u8>,
    layout: Layout,
}

impl ScriptMemory {
    /// Reserve `size` bytes from the system allocator.
    pub fn new(size: usize) -> Result<Self, AllocError> {
        let layout = Layout::from_size_align(size.max(ARENA_ALIGN), ARENA_ALIGN)
            .map_err(|_| AllocError::InvalidLayout { size })?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { System.alloc(layout) };
        let buffer = NonNull::new(raw).ok_or(AllocError::OutOfMemory {
            requested: size,
            available: 0,
        })?;
        Ok(ScriptMemory { buffer, layout })
    }

    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Begin a request backed by this buffer.
    ///
    /// The returned guard frees the script allocator when dropped, including
    /// during unwinding, so the buffer cannot be reused by a second scope
    /// while the first is alive.
    pub fn enter(&mut self) -> ScriptScope<'_> {
        // SAFETY: `self` is mutably borrowed by the scope, so nothing else can
        // touch the buffer until `free_script_allocator` runs in its `Drop`.
        unsafe { init_script_allocator(self.buffer, self.layout.size()) };
        ScriptScope {
            _memory: PhantomData,
            _single_thread: PhantomData,
        }
    }
}

impl Drop for ScriptMemory {
    fn drop(&mut self) {
        release_buffer(self.buffer.as_ptr() as usize, self.layout.size());
        // SAFETY: allocated in `new` with exactly this layout.
        unsafe { System.dealloc(self.buffer.as_ptr(), self.layout) };
    }
}

/// Detach the context from an arena carved out of `size` bytes at `start`
/// before the buffer goes back to the system, so neither new allocations
/// nor address checks touch it again.
fn release_buffer(start: usize, size: usize) {
    let interrupted = CONTEXT
        .try_with(|ctx| {
            let (arena_start, arena_len) = ctx.bounds.get();
            if arena_len == 0 || arena_start < start || arena_start >= start + size {
                return false;
            }
            let interrupted = ctx.state.get() == AllocatorState::Active;
            if interrupted {
                ctx.finish();
            }
            ctx.bounds.set((0, 0));
            *ctx.arena.borrow_mut() = ArenaResource::new();
            interrupted
        })
        .unwrap_or(false);
    if interrupted {
        tracing::error!("script memory released while its request was still running");
    }
}

/// A running request. Dropping it calls [`free_script_allocator`].
#[derive(Debug)]
pub struct ScriptScope<'a> {
    _memory: PhantomData<&'a mut ScriptMemory>,
    /// The allocator context is per thread.
    _single_thread: PhantomData<*const ()>,
}

impl ScriptScope<'_> {
    /// Redirect (or stop redirecting) generic allocations into the arena.
    pub fn replace_malloc(&self, enabled: bool) {
        if enabled {
            enable_malloc_replacement();
        } else {
            disable_malloc_replacement();
        }
    }

    pub fn stats(&self) -> MemoryStats {
        script_memory_stats()
    }
}

impl Drop for ScriptScope<'_> {
    fn drop(&mut self) {
        free_script_allocator();
    }
}
