//! Worker configuration from the environment.

use kite_rt::diagnostics::E_ALL;
use thiserror::Error;

/// Smallest arena a worker accepts.
pub const MIN_SCRIPT_MEMORY: usize = 64 * 1024;

const DEFAULT_SCRIPT_MEMORY: usize = 16 * 1024 * 1024;

const SCRIPT_MEMORY_VAR: &str = "KITE_SCRIPT_MEMORY";
const ERROR_LEVEL_VAR: &str = "KITE_ERROR_LEVEL";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}: invalid memory size {value:?}")]
    InvalidMemorySize { var: &'static str, value: String },
    #[error("{var}: {size} bytes is below the minimum of {}", MIN_SCRIPT_MEMORY)]
    MemoryTooSmall { var: &'static str, size: usize },
    #[error("{var}: invalid error level {value:?}")]
    InvalidErrorLevel { var: &'static str, value: String },
}

/// Settings applied to every request a worker serves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Arena size in bytes.
    pub script_memory: usize,
    /// Level passed to `error_reporting` at the start of each request.
    pub error_level: i64,
    /// Route ordinary allocations into the arena while a script runs.
    pub replace_malloc: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            script_memory: DEFAULT_SCRIPT_MEMORY,
            error_level: E_ALL,
            replace_malloc: true,
        }
    }
}

impl WorkerConfig {
    /// Defaults overridden by `KITE_SCRIPT_MEMORY` and `KITE_ERROR_LEVEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = WorkerConfig::default();
        if let Some(value) = lookup(SCRIPT_MEMORY_VAR) {
            let size =
                parse_memory_size(&value).ok_or_else(|| ConfigError::InvalidMemorySize {
                    var: SCRIPT_MEMORY_VAR,
                    value: value.clone(),
                })?;
            if size < MIN_SCRIPT_MEMORY {
                return Err(ConfigError::MemoryTooSmall {
                    var: SCRIPT_MEMORY_VAR,
                    size,
                });
            }
            config.script_memory = size;
        }
        if let Some(value) = lookup(ERROR_LEVEL_VAR) {
            config.error_level = parse_error_level(&value).ok_or(ConfigError::InvalidErrorLevel {
                var: ERROR_LEVEL_VAR,
                value,
            })?;
        }
        Ok(config)
    }
}

/// Parse a byte count with an optional `K`, `M` or `G` suffix (powers of
/// 1024, case-insensitive).
pub fn parse_memory_size(text: &str) -> Option<usize> {
    let text = text.trim();
    let (digits, shift) = match text.as_bytes().last()? {
        b'k' | b'K' => (&text[..text.len() - 1], 10),
        b'm' | b'M' => (&text[..text.len() - 1], 20),
        b'g' | b'G' => (&text[..text.len() - 1], 30),
        _ => (text, 0),
    };
    let base: usize = digits.parse().ok()?;
    base.checked_mul(1 << shift)
}

/// Levels are ordinal, as `error_reporting` reads them; only negative
/// values are rejected.
fn parse_error_level(text: &str) -> Option<i64> {
    let level: i64 = text.trim().parse().ok()?;
    (level >= 0).then_some(level)
}
