//! # linewatch: production-line telemetry ingestion
//!
//! Polls the variables of one machine on an OPC UA automation server and
//! appends every sample to a relational store.
//!
//! ## Architecture
//!
//! - **Client**: Session traits over the server's address space, with a
//!   simulated server and (feature `opcua`) a real OPC UA client
//! - **Ingest**: Path resolution, per-variable sampling, and the poll loop
//!   state machine
//! - **Store**: SQLite schema bootstrap, per-reading transactional writes,
//!   and read-side queries
//!
//! ## Configuration
//!
//! Settings are read from the file named by `LINEWATCH_CONFIG`, or else from
//! `linewatch.toml` in the platform configuration directory under
//! `dev.linewatch`:
//!
//! - **Linux**: `~/.config/dev.linewatch/`
//! - **macOS**: `~/Library/Application Support/dev.linewatch/`
//! - **Windows**: `%APPDATA%\dev.linewatch\`
//!
//! ## Example
//!
//! ```no_run
//! use linewatch::{
//!     client::EndpointConnector,
//!     config::AppConfig,
//!     ingest::{ConnectionManager, PollLoop, Shutdown},
//! };
//!
//! fn main() -> linewatch::Result<()> {
//!     let mut config = AppConfig::default();
//!     config.server.endpoint = "sim://plant".into();
//!     config.poll.max_sweeps = Some(5);
//!
//!     let connector = EndpointConnector::from_config(&config);
//!     let connections = ConnectionManager::open(&config, &connector)?;
//!     let summary = PollLoop::new(config, connections, Shutdown::new()).run()?;
//!     println!("{}", summary.stats);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod ingest;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use client::{Connector, EndpointConnector, NodeHandle, ServerSession, SimulatedServer};
pub use config::AppConfig;
pub use error::{IngestError, Result};
pub use ingest::{ConnectionManager, PollLoop, PollState, RunSummary, Shutdown};
pub use store::{Sink, Store};
pub use types::{DataSample, IngestStats, Quality, Reading, SampleValue};
