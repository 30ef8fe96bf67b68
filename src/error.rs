//! Error handling for linewatch
//!
//! This module defines the error taxonomy of the ingestion pipeline and a
//! Result alias for use throughout the crate.
//!
//! Errors fall into three tiers:
//!
//! - **Fatal/startup**: configuration, connection, bootstrap and resolution
//!   failures. These end the process before any sweep runs.
//! - **Per-item**: a single variable read ([`IngestError::Read`]) or a single
//!   reading write ([`IngestError::Write`]). These are absorbed at the sweep.
//! - **Session-fatal**: loss of the protocol transport
//!   ([`IngestError::SessionLost`]). These end the poll loop.

use thiserror::Error;

/// Main error type for linewatch operations
#[derive(Error, Debug)]
pub enum IngestError {
    /// Errors related to configuration loading/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to open a protocol session or store connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// The protocol transport went away under an open session
    #[error("Session lost on {endpoint}: {message}")]
    SessionLost { endpoint: String, message: String },

    /// A browse path level could not be found in the address space
    #[error("Node '{name}' not found at level {level} (under '{parent}')")]
    Resolution {
        /// 1-based depth of the missing level
        level: usize,
        name: String,
        parent: String,
    },

    /// Schema creation or seeding failed
    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    /// A single variable could not be read
    #[error("Read error on '{variable}': {message}")]
    Read { variable: String, message: String },

    /// A single reading could not be persisted
    #[error("Write error on '{variable}': {source}")]
    Write {
        variable: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Errors from the relational store
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Timeout errors
    #[error("Timeout: {0}")]
    Timeout(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        IngestError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a read error for a variable
    pub fn read(variable: impl Into<String>, message: impl Into<String>) -> Self {
        IngestError::Read {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// The innermost error, skipping context wrappers
    pub fn root(&self) -> &IngestError {
        match self {
            IngestError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error means the protocol session can no longer be used
    pub fn is_session_fatal(&self) -> bool {
        matches!(self.root(), IngestError::SessionLost { .. })
    }

    /// Whether this error is absorbed at sweep granularity
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.root(),
            IngestError::Read { .. } | IngestError::Write { .. } | IngestError::Timeout(_)
        )
    }
}

/// Result type alias for linewatch operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| IngestError::Store(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| IngestError::Store(e).with_context(f()))
    }
}
