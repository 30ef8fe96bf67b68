//! Configuration sections
//!
//! Each section maps to a TOML table in `linewatch.toml`:
//!
//! - [`ServerConfig`] - `[server]`: protocol endpoint(s) and browse root
//! - [`StoreConfig`] - `[store]`: relational store location and timeouts
//! - [`TargetConfig`] - `[target]`: line and machine to sample
//! - [`PollConfig`] - `[poll]`: sweep interval and statistics cadence
//! - [`LoggingConfig`] - `[logging]`: optional rolling log file

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::{
    DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_ENDPOINT, DEFAULT_LINE, DEFAULT_MACHINE,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_ROOT, DEFAULT_SESSION_TIMEOUT_MS, DEFAULT_STATS_EVERY,
};

/// Protocol server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Primary endpoint URL (`opc.tcp://...` or `sim://...`)
    pub endpoint: String,

    /// Endpoints tried in order when the primary refuses
    pub fallback_endpoints: Vec<String>,

    /// Display names from the Objects folder down to (not including) the line
    pub root_path: Vec<String>,

    /// Application name announced to the server
    pub application_name: String,

    /// Server-side session timeout in milliseconds
    pub session_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            fallback_endpoints: Vec::new(),
            root_path: vec![DEFAULT_ROOT.to_string()],
            application_name: "linewatch".to_string(),
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Primary endpoint followed by the fallbacks, duplicates removed
    pub fn candidate_endpoints(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(1 + self.fallback_endpoints.len());
        for ep in std::iter::once(&self.endpoint).chain(self.fallback_endpoints.iter()) {
            let ep = ep.trim();
            if !ep.is_empty() && !out.iter().any(|e| e == ep) {
                out.push(ep.to_string());
            }
        }
        out
    }
}

/// Relational store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; `:memory:` opens a private in-memory store
    pub path: PathBuf,

    /// How long a write waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: super::default_store_path(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

/// The production line and machine being sampled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub line: String,
    pub machine: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            line: DEFAULT_LINE.to_string(),
            machine: DEFAULT_MACHINE.to_string(),
        }
    }
}

/// Poll loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Pause between sweeps in milliseconds
    pub interval_ms: u64,

    /// Log a statistics line every N sweeps (0 disables)
    pub stats_every_sweeps: u64,

    /// Stop after this many sweeps
    pub max_sweeps: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stats_every_sweeps: DEFAULT_STATS_EVERY,
            max_sweeps: None,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for a daily rolling log file; console only when unset
    pub directory: Option<PathBuf>,

    /// File name prefix for the rolling log
    pub file_prefix: String,

    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: "linewatch.log".to_string(),
            default_filter: "info,linewatch=debug".to_string(),
        }
    }
}
