//! Tests for the persistent heap pool.

use super::*;

#[test]
fn allocate_and_free_track_live_bytes() {
    let pool = HeapPool::new();
    let Ok(ptr) = pool.allocate(24) else {
        panic!("system allocation failed");
    };
    assert_eq!(pool.memory_used(), 24);
    assert_eq!(pool.total_allocations(), 1);

    unsafe { pool.deallocate(ptr, 24) };
    assert_eq!(pool.memory_used(), 0);
    assert_eq!(pool.total_allocations(), 1);
}

#[test]
fn reallocate_preserves_prefix_and_adjusts_usage() {
    let pool = HeapPool::new();
    let Ok(ptr) = pool.allocate(8) else {
        panic!("system allocation failed");
    };
    unsafe { ptr.as_ptr().cast::<u64>().write(0xDEAD_BEEF) };

    let Ok(grown) = (unsafe { pool.reallocate(ptr, 64, 8) }) else {
        panic!("system reallocation failed");
    };
    assert_eq!(unsafe { grown.as_ptr().cast::<u64>().read() }, 0xDEAD_BEEF);
    assert_eq!(pool.memory_used(), 64);

    unsafe { pool.deallocate(grown, 64) };
    assert_eq!(pool.memory_used(), 0);
}

#[test]
fn zero_sized_requests_still_get_a_unique_pointer() {
    let pool = HeapPool::new();
    let (Ok(a), Ok(b)) = (pool.allocate(0), pool.allocate(0)) else {
        panic!("system allocation failed");
    };
    assert_ne!(a, b);
    unsafe {
        pool.deallocate(a, 0);
        pool.deallocate(b, 0);
    }
    assert_eq!(pool.memory_used(), 0);
}

#[test]
fn oversized_request_is_an_invalid_layout() {
    let pool = HeapPool::new();
    assert_eq!(
        pool.allocate(usize::MAX),
        Err(AllocError::InvalidLayout { size: usize::MAX })
    );
}

#[test]
fn global_heap_functions_survive_independently() {
    let before = heap_memory_used();
    let Ok(ptr) = heap_allocate(128) else {
        panic!("system allocation failed");
    };
    assert!(heap_memory_used() >= before + 128);
    unsafe { heap_deallocate(ptr, 128) };
}
