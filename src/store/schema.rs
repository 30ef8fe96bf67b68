//! Schema bootstrap
//!
//! Creates the three tables if they are absent and seeds the configured line
//! and machine. Every statement is safe to repeat, so the bootstrapper runs
//! unconditionally on each start.

use rusqlite::{params, Connection, OptionalExtension};

use super::Store;
use crate::error::{IngestError, Result};

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS production_line (
    id INTEGER PRIMARY KEY,
    name VARCHAR(100) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS machine (
    id INTEGER PRIMARY KEY,
    name VARCHAR(100) NOT NULL UNIQUE,
    bad_product_count INTEGER NOT NULL DEFAULT 0,
    line_id INTEGER REFERENCES production_line(id)
);

CREATE TABLE IF NOT EXISTS reading (
    id INTEGER PRIMARY KEY,
    timestamp TEXT NOT NULL,
    line VARCHAR(100) NOT NULL,
    machine VARCHAR(100) NOT NULL,
    variable VARCHAR(100) NOT NULL,
    value TEXT NOT NULL,
    quality VARCHAR(50) NOT NULL
);

CREATE INDEX IF NOT EXISTS reading_machine_timestamp
    ON reading (machine, timestamp);
"#;

/// Ids of the seeded rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedIds {
    pub line_id: i64,
    pub machine_id: i64,
}

/// Ensures tables and seed rows exist
#[derive(Debug, Clone)]
pub struct SchemaBootstrapper {
    line: String,
    machine: String,
}

impl SchemaBootstrapper {
    pub fn new(line: impl Into<String>, machine: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            machine: machine.into(),
        }
    }

    /// Create tables and seed rows in one transaction
    ///
    /// Any failure is reported as [`IngestError::Bootstrap`] and leaves the
    /// store unchanged.
    pub fn run(&self, store: &Store) -> Result<SeedIds> {
        store
            .transaction(|conn| self.apply(conn))
            .map_err(|e| match e {
                IngestError::Bootstrap(_) => e,
                other => IngestError::Bootstrap(other.to_string()),
            })
    }

    fn apply(&self, conn: &Connection) -> Result<SeedIds> {
        conn.execute_batch(CREATE_TABLES)?;

        conn.execute(
            "INSERT INTO production_line (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
            params![self.line],
        )?;
        let line_id: i64 = conn
            .query_row(
                "SELECT id FROM production_line WHERE name = ?1",
                params![self.line],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| {
                IngestError::Bootstrap(format!("Line '{}' missing after seeding", self.line))
            })?;

        conn.execute(
            "INSERT INTO machine (name, line_id) VALUES (?1, ?2) ON CONFLICT (name) DO NOTHING",
            params![self.machine, line_id],
        )?;
        let machine_id: i64 = conn
            .query_row(
                "SELECT id FROM machine WHERE name = ?1",
                params![self.machine],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| {
                IngestError::Bootstrap(format!("Machine '{}' missing after seeding", self.machine))
            })?;

        tracing::debug!(
            "Schema ready (line '{}' id {}, machine '{}' id {})",
            self.line,
            line_id,
            self.machine,
            machine_id
        );
        Ok(SeedIds {
            line_id,
            machine_id,
        })
    }
}
