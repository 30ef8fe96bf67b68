//! Reading sink
//!
//! Every reading is written as a single-row insert in its own transaction.
//! A failed write is rolled back and returned as [`IngestError::Write`];
//! nothing about it affects the next write.

use rusqlite::params;

use super::Store;
use crate::error::{IngestError, Result};
use crate::types::Reading;

const INSERT_READING: &str = r#"
INSERT INTO reading (timestamp, line, machine, variable, value, quality)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

/// Writes readings to a [`Store`]
#[derive(Debug, Clone, Copy)]
pub struct Sink<'a> {
    store: &'a Store,
}

impl<'a> Sink<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Persist one reading, returning its row id
    pub fn write(&self, reading: &Reading) -> Result<i64> {
        let timestamp = reading.timestamp_text();
        self.store
            .transaction(|conn| {
                conn.execute(
                    INSERT_READING,
                    params![
                        timestamp,
                        reading.line,
                        reading.machine,
                        reading.variable,
                        reading.value,
                        reading.quality.as_str(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .map_err(|e| match e {
                IngestError::Store(source) => IngestError::Write {
                    variable: reading.variable.clone(),
                    source,
                },
                other => other,
            })
    }

    /// Persist readings in order, one transaction each
    ///
    /// The result at index `i` belongs to `readings[i]`.
    pub fn write_batch(&self, readings: &[Reading]) -> Vec<Result<i64>> {
        readings.iter().map(|r| self.write(r)).collect()
    }
}
