//! Requests whose values are allocated in the arena through the global
//! allocator.

use kite_memory::ScriptAllocator;
use kite_rt::arith::append;
use kite_rt::compare::eq;
use kite_rt::{Array, Var};
use kite_worker::{RequestOutcome, Worker, WorkerConfig};

#[global_allocator]
static ALLOC: ScriptAllocator = ScriptAllocator;

fn worker() -> Worker {
    let config = WorkerConfig {
        script_memory: 1 << 20,
        ..WorkerConfig::default()
    };
    match Worker::new(config) {
        Ok(worker) => worker,
        Err(err) => panic!("{err}"),
    }
}

#[test]
fn script_values_live_in_the_arena() {
    let mut worker = worker();
    let report = worker.run_request(|| {
        let mut names: Array<Var> = Array::new();
        for i in 0..100_i64 {
            let mut name = Var::from("user_");
            append(&mut name, &i);
            names.push_back(name);
        }
        let copy = names.clone();
        names.set(0, Var::from("root"));
        eq(&copy.get(0).cloned().unwrap_or_default(), &Var::from("user_0"))
    });
    assert_eq!(report.outcome, RequestOutcome::Completed(true));
    assert!(report.stats.max_memory_used > 0);
    assert_eq!(report.stats.memory_used, 0);
}

#[test]
fn arena_exhaustion_falls_back_without_corrupting_later_requests() {
    let config = WorkerConfig {
        script_memory: 64 * 1024,
        ..WorkerConfig::default()
    };
    let Ok(mut worker) = Worker::new(config) else {
        panic!("worker init failed");
    };
    for _ in 0..3 {
        let report = worker.run_request(|| {
            let big: Vec<u64> = (0..100_000).collect();
            big.iter().sum::<u64>()
        });
        assert_eq!(report.outcome, RequestOutcome::Completed(4_999_950_000));
    }
}

#[test]
fn panic_messages_survive_the_next_request() {
    let mut worker = worker();
    let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        worker.run_request(|| -> i64 {
            let code = Var::from(7_i64).to_int();
            panic!("host bug {code}");
        })
    }));
    let Err(payload) = caught else {
        panic!("request should have panicked");
    };

    let report = worker.run_request(|| {
        let filler = vec![b'x'; 256 * 1024];
        filler.len()
    });
    assert_eq!(report.outcome, RequestOutcome::Completed(256 * 1024));

    let Some(message) = payload.downcast_ref::<String>() else {
        panic!("payload should be a String");
    };
    assert_eq!(message, "host bug 7");
}
