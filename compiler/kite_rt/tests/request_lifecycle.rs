//! A request from arena init to teardown, with script values allocated in
//! the arena through the global allocator.

use kite_memory::{allocate, AllocError, ScriptAllocator, ScriptMemory};
use kite_rt::{Array, ArrayKey, Var};

#[global_allocator]
static ALLOC: ScriptAllocator = ScriptAllocator;

fn memory(size: usize) -> ScriptMemory {
    match ScriptMemory::new(size) {
        Ok(memory) => memory,
        Err(err) => panic!("failed to reserve script memory: {err}"),
    }
}

#[test]
fn copy_on_write_inside_a_request() {
    let mut memory = memory(1 << 20);
    let scope = memory.enter();
    scope.replace_malloc(true);

    let original = Var::Array(Array::from_vec(vec![Var::Int(1), Var::Int(2)]));
    let mut copy = original.clone();
    copy.set_value(&Var::from("k"), Var::Int(3));

    let in_arena = scope.stats().memory_used;
    scope.replace_malloc(false);

    let Var::Array(before) = &original else {
        panic!("original must stay an array");
    };
    assert_eq!(before.count(), 2);
    assert!(before.is_vector());
    assert_eq!(before.get(0), Some(&Var::Int(1)));
    assert_eq!(before.get(1), Some(&Var::Int(2)));
    assert!(!before.has_key("k"));

    let Var::Array(after) = &copy else {
        panic!("copy must stay an array");
    };
    let keys: Vec<ArrayKey> = after.keys().collect();
    assert_eq!(keys, vec![ArrayKey::Int(0), ArrayKey::Int(1), ArrayKey::from("k")]);
    assert_eq!(after.get("k"), Some(&Var::Int(3)));
    assert!(!after.ptr_eq(before));
    assert!(in_arena > 0);

    drop(copy);
    drop(original);
    drop(scope);

    assert!(matches!(allocate(16), Err(AllocError::Finalized)));
}

#[test]
fn each_request_starts_with_fresh_counters() {
    let mut memory = memory(1 << 18);
    let first_total;
    {
        let scope = memory.enter();
        scope.replace_malloc(true);
        let values: Vec<Var> = (0..64).map(Var::Int).collect();
        scope.replace_malloc(false);
        assert!(scope.stats().memory_used > 0);
        drop(values);
        first_total = kite_memory::total_memory_allocated();
    }
    let scope = memory.enter();
    assert_eq!(scope.stats().memory_used, 0);
    assert_eq!(scope.stats().max_memory_used, 0);
    assert!(kite_memory::total_memory_allocated() >= first_total);
}
