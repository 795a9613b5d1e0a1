//! Runtime tunables for the analysis session.
//!
//! Every value has a compile-time default and can be overridden at runtime
//! via a dedicated environment variable. Unparseable values fall back to the
//! default.

use std::path::PathBuf;
use std::time::Duration;

/// Default coalescing window for info snapshots (in milliseconds).
const DEFAULT_COALESCE_MS: u64 = 500;

/// Default grace period for engine and reader teardown (in milliseconds).
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 1000;

/// Default capacity of the channel between the output reader and the session.
const DEFAULT_CHUNK_CAPACITY: usize = 256;

/// Get the coalescing window in milliseconds.
///
/// Priority:
/// 1. `ENGINE_BRIDGE_COALESCE_MS` env variable if set and parseable
/// 2. `500` ms as fallback
pub fn get_coalesce_window_ms() -> u64 {
    if let Ok(value) = std::env::var("ENGINE_BRIDGE_COALESCE_MS") {
        return value.parse().unwrap_or(DEFAULT_COALESCE_MS);
    }

    DEFAULT_COALESCE_MS
}

/// Get the shutdown grace period in milliseconds.
///
/// Priority:
/// 1. `ENGINE_BRIDGE_SHUTDOWN_GRACE_MS` env variable if set and parseable
/// 2. `1000` ms as fallback
pub fn get_shutdown_grace_ms() -> u64 {
    if let Ok(value) = std::env::var("ENGINE_BRIDGE_SHUTDOWN_GRACE_MS") {
        return value.parse().unwrap_or(DEFAULT_SHUTDOWN_GRACE_MS);
    }

    DEFAULT_SHUTDOWN_GRACE_MS
}

/// Whether raw engine lines are passed through to the sink.
///
/// `ENGINE_BRIDGE_RAW_OUTPUT` set to `0` or `false` disables pass-through.
pub fn get_emit_raw_output() -> bool {
    parse_flag(std::env::var("ENGINE_BRIDGE_RAW_OUTPUT").ok().as_deref())
}

/// Explicit engine executable from `STOCKFISH_PATH`, if set.
pub fn get_stockfish_path() -> Option<PathBuf> {
    std::env::var_os("STOCKFISH_PATH")
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

fn parse_flag(value: Option<&str>) -> bool {
    match value {
        Some(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off"),
        None => true,
    }
}

/// Session tunables.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Window over which info snapshots are coalesced into one event.
    pub coalesce_window: Duration,
    /// How long teardown waits for the engine and reader before forcing.
    pub shutdown_grace: Duration,
    /// Emit every engine line under the raw pass-through event name.
    pub emit_raw_output: bool,
    pub chunk_capacity: usize,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self {
            coalesce_window: Duration::from_millis(get_coalesce_window_ms()),
            shutdown_grace: Duration::from_millis(get_shutdown_grace_ms()),
            emit_raw_output: get_emit_raw_output(),
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            coalesce_window: Duration::from_millis(DEFAULT_COALESCE_MS),
            shutdown_grace: Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_MS),
            emit_raw_output: true,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_coalesce_window_ms() {
        let window = get_coalesce_window_ms();
        match std::env::var("ENGINE_BRIDGE_COALESCE_MS") {
            Ok(val) => assert_eq!(window, val.parse().unwrap_or(DEFAULT_COALESCE_MS)),
            Err(_) => assert_eq!(window, DEFAULT_COALESCE_MS),
        }
    }

    #[test]
    fn test_get_shutdown_grace_ms_default() {
        if std::env::var("ENGINE_BRIDGE_SHUTDOWN_GRACE_MS").is_err() {
            assert_eq!(get_shutdown_grace_ms(), DEFAULT_SHUTDOWN_GRACE_MS);
        }
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(None));
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("yes")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(Some("False")));
        assert!(!parse_flag(Some(" off ")));
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.coalesce_window, Duration::from_millis(500));
        assert_eq!(config.shutdown_grace, Duration::from_secs(1));
        assert!(config.emit_raw_output);
    }
}
