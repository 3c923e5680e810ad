//! Allocator error type.

use thiserror::Error;

/// Reasons an allocation request can be rejected.
///
/// Exhaustion is recoverable by the caller (fall back, or raise a critical
/// error). Lifecycle violations are usage bugs in the host and are logged as
/// critical by the facade before being returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AllocError {
    /// `allocate` was called before the first `init_script_allocator`.
    #[error("script allocator used before the first init_script_allocator call")]
    NotInitialized,
    /// `allocate` was called after `free_script_allocator` and before the next init.
    #[error("script allocator used after free_script_allocator")]
    Finalized,
    /// The allocator was reset while a request still owned the arena.
    #[error("script allocator reset while a request is running")]
    RequestActive,
    /// The pool has no piece large enough for the request.
    #[error("not enough script memory: requested {requested} bytes, {available} bytes left")]
    OutOfMemory { requested: usize, available: usize },
    /// The requested size cannot be described by a `Layout`.
    #[error("invalid allocation size {size}")]
    InvalidLayout { size: usize },
}
