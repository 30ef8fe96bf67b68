//! Core data types for linewatch
//!
//! This module contains the fundamental data structures flowing through the
//! ingestion pipeline:
//!
//! - [`Reading`] - One sampled variable, ready to persist
//! - [`Quality`] - Enumerated validity of a sample
//! - [`SampleValue`] - A typed value as decoded by the protocol client
//! - [`ConnectionStatus`] - State of the protocol session
//! - [`IngestStats`] - Counters of successful reads vs. errors

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// Validity indicator reported alongside a sampled value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    Good,
    Uncertain,
    Bad,
}

impl Quality {
    /// Stored text for this quality code
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Good => "Good",
            Quality::Uncertain => "Uncertain",
            Quality::Bad => "Bad",
        }
    }

    /// Parse a stored quality code
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Good" => Some(Quality::Good),
            "Uncertain" => Some(Quality::Uncertain),
            "Bad" => Some(Quality::Bad),
            _ => None,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value as decoded by the protocol client
///
/// The pipeline never coerces these; [`SampleValue::to_string`] is the
/// serialization that gets persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    /// No value present
    Empty,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Empty => f.write_str("None"),
            SampleValue::Bool(b) => write!(f, "{}", b),
            SampleValue::Int(v) => write!(f, "{}", v),
            SampleValue::UInt(v) => write!(f, "{}", v),
            SampleValue::Float(v) => write!(f, "{}", v),
            SampleValue::Text(s) => f.write_str(s),
        }
    }
}

/// Value and quality returned by a single variable read
#[derive(Debug, Clone, PartialEq)]
pub struct DataSample {
    pub value: SampleValue,
    pub quality: Quality,
}

impl DataSample {
    pub fn new(value: SampleValue, quality: Quality) -> Self {
        Self { value, quality }
    }
}

/// One sampled variable of the target machine
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// When the value was read
    pub timestamp: DateTime<Utc>,
    /// Production line name
    pub line: String,
    /// Machine name
    pub machine: String,
    /// Variable display name
    pub variable: String,
    /// Textual serialization of the sampled value
    pub value: String,
    /// Quality code reported with the value
    pub quality: Quality,
}

impl Reading {
    /// Timestamp in the stored text form
    ///
    /// Fixed-width UTC with microseconds, so lexical order is time order.
    pub fn timestamp_text(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

/// Format a timestamp the way the store persists it
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Represents the connection status of the protocol session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected to any server
    #[default]
    Disconnected,
    /// Connected and ready
    Connected,
    /// Connection error occurred
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Counters kept by the poll loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Completed sweeps
    pub sweeps: u64,
    /// Readings persisted
    pub readings: u64,
    /// Variables that failed to read
    pub read_errors: u64,
    /// Readings that failed to persist
    pub write_errors: u64,
}

impl IngestStats {
    /// Total errors of either kind
    pub fn errors(&self) -> u64 {
        self.read_errors + self.write_errors
    }

    /// Calculate the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.readings + self.errors();
        if total == 0 {
            100.0
        } else {
            (self.readings as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sweeps, {} readings, {} errors ({} read, {} write), {:.1}% ok",
            self.sweeps,
            self.readings,
            self.errors(),
            self.read_errors,
            self.write_errors,
            self.success_rate()
        )
    }
}
