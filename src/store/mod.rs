//! Relational store for readings
//!
//! The store is a single SQLite database holding three tables:
//!
//! - `production_line` - one row per line, unique by name
//! - `machine` - one row per machine, unique by name, referencing its line
//! - `reading` - append-only sampled values
//!
//! # Components
//!
//! - [`Store`] - Owns the connection; scoped transactions
//! - [`SchemaBootstrapper`] - Idempotent table creation and seeding
//! - [`Sink`] - Per-reading transactional writes
//! - [`queries`] - Read-side helpers over the same tables

pub mod queries;
pub mod schema;
pub mod sink;

pub use queries::{MachineRecord, StoredReading};
pub use schema::{SchemaBootstrapper, SeedIds};
pub use sink::Sink;

use crate::config::StoreConfig;
use crate::error::{IngestError, Result, ResultExt};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Owned connection to the relational store
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open the store described by the config
    ///
    /// Parent directories of a file-backed store are created as needed.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if config.is_in_memory() {
            return Self::open_in_memory();
        }

        if let Some(dir) = config.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                IngestError::from(e)
                    .with_context(format!("Failed to create store directory {:?}", dir))
            })?;
        }

        let conn = Connection::open(&config.path)
            .with_context(|| format!("Failed to open store {:?}", config.path))?;
        Self::configure(conn, Some(config.path.clone()), config)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory store")?;
        Self::configure(conn, None, &StoreConfig::default())
    }

    fn configure(conn: Connection, path: Option<PathBuf>, config: &StoreConfig) -> Result<Self> {
        conn.busy_timeout(config.busy_timeout())?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn, path })
    }

    /// Database file, or `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a transaction, committing on success
    ///
    /// On error the transaction is rolled back and the original error is
    /// returned.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    /// Check the connection answers
    pub fn ping(&self) -> Result<()> {
        let one: i64 = self
            .conn
            .query_row("SELECT 1", [], |row| row.get(0))
            .context("Store health check failed")?;
        if one == 1 {
            Ok(())
        } else {
            Err(IngestError::Connection("Store health check returned garbage".into()))
        }
    }

    /// Close the connection, reporting any error
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| IngestError::Store(e).with_context("Failed to close store"))
    }
}
