//! Read-side queries over the reading tables
//!
//! Used for the end-of-run summary and by the test suite to verify what the
//! pipeline persisted.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::Store;
use crate::error::{IngestError, Result};
use crate::types::{parse_timestamp, Quality};

/// A reading as stored
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReading {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub line: String,
    pub machine: String,
    pub variable: String,
    pub value: String,
    pub quality: Quality,
}

/// A machine row joined with its line name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineRecord {
    pub id: i64,
    pub name: String,
    pub bad_product_count: i64,
    pub line_id: Option<i64>,
    pub line_name: Option<String>,
}

struct RawReading {
    id: i64,
    timestamp: String,
    line: String,
    machine: String,
    variable: String,
    value: String,
    quality: String,
}

impl RawReading {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            line: row.get(2)?,
            machine: row.get(3)?,
            variable: row.get(4)?,
            value: row.get(5)?,
            quality: row.get(6)?,
        })
    }

    fn decode(self) -> Result<StoredReading> {
        let timestamp = parse_timestamp(&self.timestamp).ok_or_else(|| {
            IngestError::Config(format!("Invalid timestamp in row {}: {}", self.id, self.timestamp))
        })?;
        let quality = Quality::parse(&self.quality).ok_or_else(|| {
            IngestError::Config(format!("Unknown quality in row {}: {}", self.id, self.quality))
        })?;
        Ok(StoredReading {
            id: self.id,
            timestamp,
            line: self.line,
            machine: self.machine,
            variable: self.variable,
            value: self.value,
            quality,
        })
    }
}

const READING_COLUMNS: &str = "id, timestamp, line, machine, variable, value, quality";

/// Total number of readings
pub fn count_readings(store: &Store) -> Result<i64> {
    Ok(store
        .connection()
        .query_row("SELECT COUNT(*) FROM reading", [], |row| row.get(0))?)
}

/// Number of readings for one machine
pub fn count_for_machine(store: &Store, machine: &str) -> Result<i64> {
    Ok(store.connection().query_row(
        "SELECT COUNT(*) FROM reading WHERE machine = ?1",
        params![machine],
        |row| row.get(0),
    )?)
}

/// Most recent readings, newest first
pub fn latest(store: &Store, limit: usize) -> Result<Vec<StoredReading>> {
    let mut stmt = store.connection().prepare(&format!(
        "SELECT {} FROM reading ORDER BY timestamp DESC, id DESC LIMIT ?1",
        READING_COLUMNS
    ))?;
    let raw = stmt
        .query_map(params![limit as i64], RawReading::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raw.into_iter().map(RawReading::decode).collect()
}

/// All readings of one variable on a machine, oldest first
pub fn history(store: &Store, machine: &str, variable: &str) -> Result<Vec<StoredReading>> {
    let mut stmt = store.connection().prepare(&format!(
        "SELECT {} FROM reading WHERE machine = ?1 AND variable = ?2 ORDER BY timestamp, id",
        READING_COLUMNS
    ))?;
    let raw = stmt
        .query_map(params![machine, variable], RawReading::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raw.into_iter().map(RawReading::decode).collect()
}

/// Newest timestamp recorded for a machine
pub fn max_timestamp(store: &Store, machine: &str) -> Result<Option<DateTime<Utc>>> {
    let text: Option<String> = store.connection().query_row(
        "SELECT MAX(timestamp) FROM reading WHERE machine = ?1",
        params![machine],
        |row| row.get(0),
    )?;
    match text {
        Some(t) => parse_timestamp(&t)
            .map(Some)
            .ok_or_else(|| IngestError::Config(format!("Invalid stored timestamp: {}", t))),
        None => Ok(None),
    }
}

/// Look up a machine and its line by machine name
pub fn machine(store: &Store, name: &str) -> Result<Option<MachineRecord>> {
    Ok(store
        .connection()
        .query_row(
            r#"
            SELECT m.id, m.name, m.bad_product_count, m.line_id, l.name
            FROM machine m LEFT JOIN production_line l ON l.id = m.line_id
            WHERE m.name = ?1
            "#,
            params![name],
            |row| {
                Ok(MachineRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    bad_product_count: row.get(2)?,
                    line_id: row.get(3)?,
                    line_name: row.get(4)?,
                })
            },
        )
        .optional()?)
}
