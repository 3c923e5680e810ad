//! Memory introspection builtins backed by the script allocator counters.

use kite_memory::{heap_memory_used, script_memory_stats, total_memory_allocated};

fn to_script_int(bytes: impl TryInto<i64>) -> i64 {
    bytes.try_into().unwrap_or(i64::MAX)
}

/// `memory_get_usage()`: bytes currently used by the request arena.
///
/// `real` is accepted for signature compatibility and ignored.
pub fn memory_get_usage(_real: bool) -> i64 {
    to_script_int(script_memory_stats().memory_used)
}

/// `memory_get_peak_usage()`: peak arena usage for this request.
pub fn memory_get_peak_usage(real: bool) -> i64 {
    let stats = script_memory_stats();
    to_script_int(if real {
        stats.max_real_memory_used
    } else {
        stats.max_memory_used
    })
}

/// `memory_get_total_usage()`: bytes allocated from script memory across
/// every request this worker has served.
pub fn memory_get_total_usage() -> i64 {
    to_script_int(total_memory_allocated())
}

/// `memory_get_static_usage()`: bytes held by the persistent heap pool.
pub fn memory_get_static_usage() -> i64 {
    to_script_int(heap_memory_used())
}
