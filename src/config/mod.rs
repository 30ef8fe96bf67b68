//! Configuration module for linewatch
//!
//! The whole deployment is described by one TOML file. Every table and every
//! key is optional; missing values fall back to the compiled-in defaults for
//! the Serac4 palletizer.
//!
//! # Config Location
//!
//! The file is looked up in this order:
//!
//! 1. The path in the `LINEWATCH_CONFIG` environment variable (must exist)
//! 2. `linewatch.toml` in the platform config directory under `dev.linewatch`
//!    - **Linux**: `~/.config/dev.linewatch/`
//!    - **macOS**: `~/Library/Application Support/dev.linewatch/`
//!    - **Windows**: `%APPDATA%\dev.linewatch\`
//! 3. Built-in defaults
//!
//! # Example
//!
//! ```toml
//! [server]
//! endpoint = "opc.tcp://192.168.1.50:49320"
//! fallback_endpoints = ["opc.tcp://localhost:49320"]
//! root_path = ["Matics"]
//!
//! [store]
//! path = "/var/lib/linewatch/readings.db"
//!
//! [target]
//! line = "Serac4"
//! machine = "Palletizer"
//!
//! [poll]
//! interval_ms = 2000
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config and data directories
pub const APP_ID: &str = "dev.linewatch";

/// Config filename
pub const CONFIG_FILE: &str = "linewatch.toml";

/// Environment variable overriding the config path
pub const CONFIG_ENV: &str = "LINEWATCH_CONFIG";

/// Default OPC UA endpoint of the plant server
pub const DEFAULT_ENDPOINT: &str = "opc.tcp://192.168.1.50:49320";

/// Top-level folder under Objects holding the lines
pub const DEFAULT_ROOT: &str = "Matics";

pub const DEFAULT_LINE: &str = "Serac4";

pub const DEFAULT_MACHINE: &str = "Palletizer";

/// Default pause between sweeps
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default statistics cadence in sweeps
pub const DEFAULT_STATS_EVERY: u64 = 10;

/// Default SQLite busy timeout
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Default server-side session timeout
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 60_000;

/// Default database filename
pub const STORE_FILE: &str = "readings.db";

// ==================== Directories ====================

/// Get the config file path in the platform config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Default database location, falling back to the working directory
pub fn default_store_path() -> PathBuf {
    dirs_next::data_dir()
        .map(|p| p.join(APP_ID).join(STORE_FILE))
        .unwrap_or_else(|| PathBuf::from(STORE_FILE))
}

// ==================== App Config ====================

/// Complete deployment configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub target: TargetConfig,
    pub poll: PollConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parse a config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| IngestError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content).map_err(|e| e.with_context(format!("{:?}", path)))
    }

    /// Resolve the config from the environment, the default path, or defaults
    ///
    /// A path named by `LINEWATCH_CONFIG` must load; the default path is only
    /// used when present.
    pub fn discover() -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        match default_config_path() {
            Some(path) if path.exists() => Ok((Self::load(&path)?, Some(path))),
            _ => Ok((Self::default(), None)),
        }
    }

    /// Serialize the config as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| IngestError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Check values that would make the pipeline meaningless
    pub fn validate(&self) -> Result<()> {
        if self.server.candidate_endpoints().is_empty() {
            return Err(IngestError::Config("No server endpoint configured".into()));
        }
        if self.server.root_path.iter().any(|n| n.is_empty()) {
            return Err(IngestError::Config("Empty name in server.root_path".into()));
        }
        if self.target.line.is_empty() {
            return Err(IngestError::Config("target.line must not be empty".into()));
        }
        if self.target.machine.is_empty() {
            return Err(IngestError::Config("target.machine must not be empty".into()));
        }
        if self.poll.interval_ms == 0 {
            return Err(IngestError::Config("poll.interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// Display names from the Objects folder down to the machine
    pub fn browse_path(&self) -> Vec<String> {
        self.server
            .root_path
            .iter()
            .cloned()
            .chain([self.target.line.clone(), self.target.machine.clone()])
            .collect()
    }
}
