//! Request execution.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use kite_memory::{global_init_script_allocator, query_num, AllocError, MemoryStats, ScriptMemory};
use kite_rt::diagnostics::{error_reporting, log_handler, set_warning_handler};
use kite_rt::CriticalError;
use thiserror::Error;

use crate::config::WorkerConfig;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("script memory unavailable: {0}")]
    ScriptMemory(#[from] AllocError),
}

/// How a request ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestOutcome<R> {
    Completed(R),
    /// The script raised a critical error; the arena was still released.
    Aborted(CriticalError),
}

/// What the worker observed about one request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestReport<R> {
    pub outcome: RequestOutcome<R>,
    /// Number of the request, starting at 1 for each worker.
    pub query_num: u64,
    /// Arena counters at the moment the script returned.
    pub stats: MemoryStats,
}

impl<R> RequestReport<R> {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RequestOutcome::Completed(_))
    }
}

/// Serves requests on the current thread from one reused arena.
#[derive(Debug)]
pub struct Worker {
    config: WorkerConfig,
    memory: ScriptMemory,
}

impl Worker {
    /// Reset this thread's allocator and reserve the arena.
    ///
    /// Fails inside a running request. Thread-local runtime state is created
    /// here, outside script memory.
    pub fn new(config: WorkerConfig) -> Result<Self, WorkerError> {
        global_init_script_allocator()?;
        let memory = ScriptMemory::new(config.script_memory)?;
        set_warning_handler(log_handler());
        tracing::debug!(script_memory = config.script_memory, "worker started");
        Ok(Worker { config, memory })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run one request.
    ///
    /// The result type is `Copy` so nothing the script returns can own
    /// memory from an arena that is about to be reset. A [`CriticalError`]
    /// raised by the script becomes [`RequestOutcome::Aborted`]; any other
    /// panic resumes after the arena is released, with its message copied
    /// out of script memory.
    pub fn run_request<R: Copy>(&mut self, script: impl FnOnce() -> R) -> RequestReport<R> {
        error_reporting(self.config.error_level);
        let replace_malloc = self.config.replace_malloc;
        let scope = self.memory.enter();
        let query_num = query_num();
        tracing::debug!(query_num, "request started");

        scope.replace_malloc(replace_malloc);
        let result = panic::catch_unwind(AssertUnwindSafe(script));
        scope.replace_malloc(false);

        let outcome = match result {
            Ok(value) => RequestOutcome::Completed(value),
            Err(payload) => match payload.downcast::<CriticalError>() {
                // Copy the message out of the arena before it is reset.
                Ok(error) => RequestOutcome::Aborted(CriticalError {
                    message: error.message.as_str().to_owned(),
                }),
                Err(other) => {
                    let payload = detach_payload(&*other);
                    drop(other);
                    drop(scope);
                    panic::resume_unwind(payload);
                }
            },
        };
        let stats = scope.stats();
        drop(scope);

        match &outcome {
            RequestOutcome::Completed(_) => {
                tracing::debug!(query_num, memory_used = stats.memory_used, "request finished");
            }
            RequestOutcome::Aborted(error) => {
                tracing::warn!(query_num, %error, "request aborted");
            }
        }
        RequestReport {
            outcome,
            query_num,
            stats,
        }
    }
}

/// Copy a panic payload that may live in script memory.
///
/// Must run with replacement off. Payloads other than strings cannot be
/// copied and are replaced by a fixed message.
fn detach_payload(payload: &(dyn Any + Send)) -> Box<dyn Any + Send> {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        Box::new(*message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        Box::new(message.as_str().to_owned())
    } else {
        Box::new("script panicked with a non-string payload")
    }
}

#[cfg(test)]
mod tests;
