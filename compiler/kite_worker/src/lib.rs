//! Kite worker harness.
//!
//! A worker owns one script arena and serves requests one after another on
//! its thread. Each request runs inside a [`kite_memory::ScriptScope`], so the
//! arena is released even when the script aborts with a critical error.
//!
//! Enable logs with `RUST_LOG=kite_memory=debug,kite_worker=debug`.

mod config;
mod worker;

use std::sync::Once;

pub use config::{parse_memory_size, ConfigError, WorkerConfig, MIN_SCRIPT_MEMORY};
pub use worker::{RequestOutcome, RequestReport, Worker, WorkerError};

static TRACING_INIT: Once = Once::new();

/// Install the tracing subscriber.
///
/// Does nothing unless `RUST_LOG` is set. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
