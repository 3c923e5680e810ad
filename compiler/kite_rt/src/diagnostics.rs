//! Warning and critical-error sink for script code.
//!
//! Warnings are recoverable: the caller reports them and continues with a
//! fallback value. Where they go is decided per worker thread by a
//! [`WarningHandlerImpl`]:
//! - Native: `tracing::warn!` (default)
//! - Tests/embedders: buffer for assertions
//! - Silent: discarded
//!
//! Critical errors abort the running request. They are logged and then
//! unwound with a [`CriticalError`] payload that the request harness catches.

use std::cell::{Cell, RefCell};
use std::panic;
use std::rc::Rc;

use bitflags::bitflags;
use parking_lot::Mutex;
use thiserror::Error;

bitflags! {
    /// Reporting level set through `error_reporting`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ErrorLevel: u32 {
        /// Report recoverable warnings.
        const WARNING = 0b01;
        /// Attach the request number to every report.
        const VERBOSE = 0b10;
    }
}

/// The language's `E_ALL` mask; any level containing it enables everything.
pub const E_ALL: i64 = 32767;

/// Payload of the unwind started by [`critical_error`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("critical error: {message}")]
pub struct CriticalError {
    pub message: String,
}

/// Warning handler that captures messages in memory.
#[derive(Debug, Default)]
pub struct BufferWarningHandler {
    messages: Mutex<Vec<String>>,
}

impl BufferWarningHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&self, message: &str) {
        self.messages.lock().push(message.to_owned());
    }

    /// Captured messages, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Drain captured messages.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }
}

/// Warning handler implementation using enum dispatch.
#[derive(Debug)]
pub enum WarningHandlerImpl {
    /// Reports through `tracing` (default).
    Log,
    /// Captures to a buffer (tests, embedders).
    Buffer(BufferWarningHandler),
    /// Discards every warning.
    Silent,
}

impl WarningHandlerImpl {
    pub fn warn(&self, message: &str, level: ErrorLevel) {
        match self {
            Self::Log if level.contains(ErrorLevel::VERBOSE) => {
                tracing::warn!(query = kite_memory::query_num(), "{message}");
            }
            Self::Log => tracing::warn!("{message}"),
            Self::Buffer(h) => h.warn(message),
            Self::Silent => {}
        }
    }

    /// Captured messages; empty for handlers that don't capture.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Buffer(h) => h.messages(),
            Self::Log | Self::Silent => Vec::new(),
        }
    }

    /// Drain captured messages; empty for handlers that don't capture.
    pub fn take(&self) -> Vec<String> {
        match self {
            Self::Buffer(h) => h.take(),
            Self::Log | Self::Silent => Vec::new(),
        }
    }
}

/// Per-worker handle to the active warning handler.
pub type SharedWarningHandler = Rc<WarningHandlerImpl>;

pub fn log_handler() -> SharedWarningHandler {
    Rc::new(WarningHandlerImpl::Log)
}

pub fn buffer_handler() -> SharedWarningHandler {
    Rc::new(WarningHandlerImpl::Buffer(BufferWarningHandler::new()))
}

pub fn silent_handler() -> SharedWarningHandler {
    Rc::new(WarningHandlerImpl::Silent)
}

thread_local! {
    static HANDLER: RefCell<SharedWarningHandler> = RefCell::new(log_handler());
    static LEVEL: Cell<ErrorLevel> = const { Cell::new(ErrorLevel::all()) };
    /// Nesting depth of `without_warnings`.
    static SUPPRESSED: Cell<u32> = const { Cell::new(0) };
}

/// Install `handler` for this thread, returning the previous one.
pub fn set_warning_handler(handler: SharedWarningHandler) -> SharedWarningHandler {
    HANDLER.with(|h| h.replace(handler))
}

pub fn warning_handler() -> SharedWarningHandler {
    HANDLER.with(|h| Rc::clone(&h.borrow()))
}

/// Report a recoverable anomaly.
pub fn warning(message: &str) {
    if SUPPRESSED.with(Cell::get) > 0 {
        return;
    }
    let level = LEVEL.with(Cell::get);
    if !level.contains(ErrorLevel::WARNING) {
        return;
    }
    warning_handler().warn(message, level);
}

/// Abort the current request.
pub fn critical_error(message: &str) -> ! {
    tracing::error!("critical error: {message}");
    panic::panic_any(CriticalError {
        message: message.to_owned(),
    })
}

/// Abort the current request because a builtin has no implementation.
pub fn unimplemented_function(name: &str) -> ! {
    critical_error(&format!("unimplemented_function: {name}"))
}

/// Set the reporting level, returning the previous one.
///
/// Levels are ordinal: 0 silences warnings, 1 reports them, 2 and above
/// (including [`E_ALL`]) also attach the request number. Negative values
/// leave the level unchanged.
pub fn error_reporting(level: i64) -> i64 {
    let previous = current_error_reporting();
    let flags = match level {
        0 => ErrorLevel::empty(),
        1 => ErrorLevel::WARNING,
        2.. => ErrorLevel::WARNING | ErrorLevel::VERBOSE,
        _ => return previous,
    };
    LEVEL.with(|l| l.set(flags));
    previous
}

pub fn current_error_reporting() -> i64 {
    i64::from(LEVEL.with(Cell::get).bits())
}

/// Restores the suppression depth even if `f` unwinds.
struct Suppress;

impl Suppress {
    fn enter() -> Self {
        SUPPRESSED.with(|s| s.set(s.get() + 1));
        Suppress
    }
}

impl Drop for Suppress {
    fn drop(&mut self) {
        SUPPRESSED.with(|s| s.set(s.get().saturating_sub(1)));
    }
}

/// Evaluate `f` with warnings suppressed (the language's `@` operator).
pub fn without_warnings<R>(f: impl FnOnce() -> R) -> R {
    let _guard = Suppress::enter();
    f()
}

/// Restores the previous handler even if `f` unwinds.
struct Restore(Option<SharedWarningHandler>);

impl Drop for Restore {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            set_warning_handler(previous);
        }
    }
}

/// Run `f` with a fresh buffer handler and return what it reported.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let buffer = buffer_handler();
    let _restore = Restore(Some(set_warning_handler(Rc::clone(&buffer))));
    let result = f();
    (result, buffer.take())
}
