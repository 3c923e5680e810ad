//! Unsynchronized pool resource over a caller-supplied buffer.
//!
//! Layout of the managed region:
//!
//! ```text
//!   begin                      top                          end
//!   +--------------------------+----------------------------+
//!   | handed out / free pieces | untouched (bump region)    |
//!   +--------------------------+----------------------------+
//! ```
//!
//! Pieces carry no header. Freed pieces are threaded into intrusive lists
//! stored in their own first words:
//!
//! - **small** (≤ [`SMALL_PIECE_LIMIT`]): one LIFO list per 8-byte size class;
//! - **large**: a single first-fit list of `{ size, next }` nodes, split on
//!   reuse.
//!
//! Allocation tries the matching free list, then the bump pointer. Freeing
//! the piece that ends at `top` rolls the bump pointer back instead.
//!
//! The resource never allocates itself, so it is safe to drive from inside a
//! `GlobalAlloc` implementation.

use std::ptr::{self, NonNull};

use crate::stats::MemoryStats;

/// Alignment of every piece handed out by the arena.
pub const ARENA_ALIGN: usize = 8;

/// Largest piece served from the per-size free lists.
pub const SMALL_PIECE_LIMIT: usize = 4096;

const SMALL_CLASSES: usize = SMALL_PIECE_LIMIT / ARENA_ALIGN;

/// Free-list node written into a released large piece.
#[repr(C)]
struct LargePiece {
    size: usize,
    next: *mut LargePiece,
}

/// Round a request up to the arena granularity.
///
/// Zero-sized requests still consume one granule so every piece has room
/// for a free-list link. Returns `None` when rounding would overflow.
pub const fn piece_size(size: usize) -> Option<usize> {
    if size > usize::MAX - ARENA_ALIGN {
        return None;
    }
    let size = if size == 0 { 1 } else { size };
    Some((size + ARENA_ALIGN - 1) & !(ARENA_ALIGN - 1))
}

/// Pool allocator serving script memory from one contiguous buffer.
pub struct ArenaResource {
    begin: *mut u8,
    end: *mut u8,
    top: *mut u8,
    small: [*mut u8; SMALL_CLASSES],
    large: *mut LargePiece,
    stats: MemoryStats,
}

// SAFETY: the resource only holds addresses into a buffer it does not own;
// moving it to another thread is fine as long as access stays exclusive,
// which `&mut self` on every mutating method enforces.
unsafe impl Send for ArenaResource {}

impl ArenaResource {
    /// An arena with no buffer. Every allocation fails until [`init`](Self::init).
    pub const fn new() -> Self {
        ArenaResource {
            begin: ptr::null_mut(),
            end: ptr::null_mut(),
            top: ptr::null_mut(),
            small: [ptr::null_mut(); SMALL_CLASSES],
            large: ptr::null_mut(),
            stats: MemoryStats::new(0),
        }
    }

    /// Take over `size` bytes at `buffer`, forgetting any previous buffer.
    ///
    /// The start is aligned up to [`ARENA_ALIGN`] and the usable size rounded
    /// down, so up to `2 * ARENA_ALIGN - 2` bytes may be unused.
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for reads and writes of `size` bytes, must not
    /// be accessed by anything else while the arena serves it, and must
    /// outlive every piece handed out.
    pub unsafe fn init(&mut self, buffer: *mut u8, size: usize) {
        let addr = buffer as usize;
        let skip = addr.wrapping_neg() & (ARENA_ALIGN - 1);
        let usable = size.saturating_sub(skip) & !(ARENA_ALIGN - 1);
        self.begin = buffer.wrapping_add(skip);
        self.end = self.begin.wrapping_add(usable);
        self.top = self.begin;
        self.small = [ptr::null_mut(); SMALL_CLASSES];
        self.large = ptr::null_mut();
        self.stats = MemoryStats::new(usable);
    }

    /// Counters since the last [`init`](Self::init).
    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    /// Whether `ptr` points into the managed buffer.
    pub fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        addr >= self.begin as usize && addr < self.end as usize
    }

    /// Start address and usable length of the managed buffer.
    pub fn bounds(&self) -> (usize, usize) {
        (self.begin as usize, self.end as usize - self.begin as usize)
    }

    /// Allocate `size` bytes, 8-byte aligned.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        let size = piece_size(size)?;
        // SAFETY: free lists only ever hold pieces of this arena.
        let recycled = unsafe {
            if size <= SMALL_PIECE_LIMIT {
                self.pop_small(size)
            } else {
                self.take_large(size)
            }
        };
        let ptr = match recycled {
            Some(ptr) => ptr,
            None => self.bump(size)?,
        };
        self.stats.on_allocate(size);
        Some(ptr)
    }

    /// Allocate `size` zero-filled bytes.
    pub fn allocate0(&mut self, size: usize) -> Option<NonNull<u8>> {
        let ptr = self.allocate(size)?;
        // SAFETY: the piece is at least `size` bytes and exclusively ours.
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Some(ptr)
    }

    /// Return a piece to the arena.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this arena's `allocate*`/`reallocate` with the same
    /// `size`, must not have been freed since, and the arena must not have
    /// been re-initialized in between.
    pub unsafe fn deallocate(&mut self, ptr: NonNull<u8>, size: usize) {
        let Some(size) = piece_size(size) else {
            return;
        };
        self.stats.on_deallocate(size);
        let raw = ptr.as_ptr();
        if raw.wrapping_add(size) == self.top {
            self.top = raw;
            self.stats.on_bump(self.consumed());
            return;
        }
        self.push_free(raw, size);
    }

    /// Resize a piece, moving it when it cannot grow in place.
    ///
    /// On failure the old piece is left untouched and still owned by the caller.
    ///
    /// # Safety
    ///
    /// Same contract as [`deallocate`](Self::deallocate) for `ptr`/`old_size`.
    pub unsafe fn reallocate(
        &mut self,
        ptr: NonNull<u8>,
        new_size: usize,
        old_size: usize,
    ) -> Option<NonNull<u8>> {
        let new_piece = piece_size(new_size)?;
        let old_piece = piece_size(old_size)?;
        if new_piece == old_piece {
            return Some(ptr);
        }

        let raw = ptr.as_ptr();
        if raw.wrapping_add(old_piece) == self.top {
            let room = self.end as usize - raw as usize;
            if new_piece <= room {
                self.top = raw.wrapping_add(new_piece);
                self.stats.on_deallocate(old_piece);
                self.stats.on_allocate(new_piece);
                self.stats.on_bump(self.consumed());
                return Some(ptr);
            }
        }

        let fresh = self.allocate(new_size)?;
        ptr::copy_nonoverlapping(raw, fresh.as_ptr(), old_piece.min(new_piece));
        self.deallocate(ptr, old_size);
        Some(fresh)
    }

    fn consumed(&self) -> usize {
        self.top as usize - self.begin as usize
    }

    fn bump(&mut self, size: usize) -> Option<NonNull<u8>> {
        let room = self.end as usize - self.top as usize;
        if size > room {
            return None;
        }
        let ptr = self.top;
        self.top = self.top.wrapping_add(size);
        self.stats.on_bump(self.consumed());
        NonNull::new(ptr)
    }

    unsafe fn pop_small(&mut self, size: usize) -> Option<NonNull<u8>> {
        let slot = &mut self.small[size / ARENA_ALIGN - 1];
        let head = NonNull::new(*slot)?;
        *slot = head.as_ptr().cast::<*mut u8>().read();
        Some(head)
    }

    unsafe fn take_large(&mut self, size: usize) -> Option<NonNull<u8>> {
        let mut link: *mut *mut LargePiece = ptr::addr_of_mut!(self.large);
        while !(*link).is_null() {
            let piece = *link;
            let piece_len = (*piece).size;
            if piece_len >= size {
                *link = (*piece).next;
                let rest = piece_len - size;
                if rest > 0 {
                    self.push_free(piece.cast::<u8>().add(size), rest);
                }
                return NonNull::new(piece.cast::<u8>());
            }
            link = ptr::addr_of_mut!((*piece).next);
        }
        None
    }

    unsafe fn push_free(&mut self, ptr: *mut u8, size: usize) {
        if size <= SMALL_PIECE_LIMIT {
            let slot = &mut self.small[size / ARENA_ALIGN - 1];
            ptr.cast::<*mut u8>().write(*slot);
            *slot = ptr;
        } else {
            let piece = ptr.cast::<LargePiece>();
            piece.write(LargePiece {
                size,
                next: self.large,
            });
            self.large = piece;
        }
    }
}

impl Default for ArenaResource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArenaResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaResource")
            .field("begin", &self.begin)
            .field("end", &self.end)
            .field("top", &self.top)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
