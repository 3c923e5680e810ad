use pretty_assertions::assert_eq;

use kite_rt::diagnostics::{critical_error, current_error_reporting, unimplemented_function};
use kite_rt::{capture_warnings, Var};

use super::*;

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
fn completed_requests_are_numbered() {
    let mut worker = worker();
    let first = worker.run_request(|| 40 + 2);
    let second = worker.run_request(|| true);
    assert_eq!(first.outcome, RequestOutcome::Completed(42));
    assert_eq!(first.query_num, 1);
    assert_eq!(second.query_num, 2);
    assert!(second.is_completed());
}

#[test]
fn critical_errors_abort_only_the_request() {
    let mut worker = worker();
    let report = worker.run_request(|| -> i64 { critical_error("stack overflow in script") });
    assert_eq!(
        report.outcome,
        RequestOutcome::Aborted(CriticalError {
            message: "stack overflow in script".to_owned(),
        })
    );
    assert!(!kite_memory::is_script_running());

    let next = worker.run_request(|| Var::from("7").to_int());
    assert_eq!(next.outcome, RequestOutcome::Completed(7));
}

#[test]
fn unimplemented_functions_are_critical() {
    let mut worker = worker();
    let report = worker.run_request(|| {
        unimplemented_function("mb_strtolower");
    });
    let RequestOutcome::Aborted(error) = report.outcome else {
        panic!("request should have been aborted");
    };
    assert_eq!(error.message, "unimplemented_function: mb_strtolower");
}

#[test]
fn other_panics_propagate() {
    let mut worker = worker();
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        worker.run_request(|| {
            panic!("bug in the host");
        })
    }));
    assert!(result.is_err());
    assert!(!kite_memory::is_script_running());
}

#[test]
fn error_level_applies_per_request() {
    let config = WorkerConfig {
        script_memory: 1 << 20,
        error_level: 0,
        replace_malloc: false,
    };
    let Ok(mut worker) = Worker::new(config) else {
        panic!("worker init failed");
    };
    let ((), warnings) = capture_warnings(|| {
        let report = worker.run_request(|| {
            assert_eq!(current_error_reporting(), 0);
            Var::new_array().to_int()
        });
        assert_eq!(report.outcome, RequestOutcome::Completed(0));
    });
    assert!(warnings.is_empty());
}

#[test]
fn stats_are_reported_per_request() {
    let mut worker = worker();
    let report = worker.run_request(|| {
        assert!(kite_memory::allocate(128).is_ok());
    });
    assert!(report.stats.memory_used >= 128);
    assert_eq!(worker.run_request(|| ()).stats.memory_used, 0);
    assert_eq!(worker.config().script_memory, 1 << 20);
}

#[test]
fn workers_cannot_be_created_inside_a_request() {
    let mut worker = worker();
    let report = worker.run_request(|| {
        matches!(
            Worker::new(WorkerConfig::default()),
            Err(WorkerError::ScriptMemory(AllocError::RequestActive))
        )
    });
    assert_eq!(report.outcome, RequestOutcome::Completed(true));
    assert_eq!(worker.run_request(|| ()).query_num, 2);
}

#[test]
fn non_string_panic_payloads_are_replaced() {
    let payload = detach_payload(&42_u32);
    let Some(message) = payload.downcast_ref::<&'static str>() else {
        panic!("payload should be a message");
    };
    assert_eq!(*message, "script panicked with a non-string payload");

    let payload = detach_payload(&String::from("copied"));
    assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("copied"));
}
