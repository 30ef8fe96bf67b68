//! Connection lifecycle
//!
//! [`ConnectionManager`] exclusively owns the protocol session and the store
//! connection. Both are released by [`ConnectionManager::close`], which also
//! runs on drop, so every exit path of the poll loop tears them down.
//!
//! There is no automatic reconnection. When the transport goes away the
//! session is marked lost and the loop stops.

use crate::client::{Connector, ServerSession};
use crate::config::AppConfig;
use crate::error::{IngestError, Result, ResultExt};
use crate::store::Store;
use crate::types::ConnectionStatus;

/// Connect to the first endpoint that accepts
///
/// Endpoints are tried in order; the errors of all failed attempts are
/// reported if none succeeds.
pub fn connect_first(
    connector: &dyn Connector,
    endpoints: &[String],
) -> Result<Box<dyn ServerSession>> {
    let mut failures = Vec::new();
    for endpoint in endpoints {
        tracing::info!("Connecting to {}", endpoint);
        match connector.connect(endpoint) {
            Ok(session) => {
                tracing::info!("Connected to {}", endpoint);
                return Ok(session);
            }
            Err(e) => {
                tracing::warn!("Failed to connect to {}: {}", endpoint, e);
                failures.push(format!("{}: {}", endpoint, e));
            }
        }
    }

    if failures.is_empty() {
        return Err(IngestError::Connection("No endpoints to connect to".into()));
    }
    Err(IngestError::Connection(format!(
        "All endpoints failed ({})",
        failures.join("; ")
    )))
}

/// Owns the protocol session and the store connection
pub struct ConnectionManager {
    session: Option<Box<dyn ServerSession>>,
    store: Option<Store>,
    status: ConnectionStatus,
}

impl ConnectionManager {
    /// Open the store, then the protocol session
    ///
    /// Any failure here is fatal to startup; whatever was opened is closed
    /// again before returning.
    pub fn open(config: &AppConfig, connector: &dyn Connector) -> Result<Self> {
        let store = Store::open(&config.store).context("Opening store")?;
        tracing::info!(
            "Store open at {}",
            store
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string())
        );

        let session = match connect_first(connector, &config.server.candidate_endpoints()) {
            Ok(session) => session,
            Err(e) => {
                if let Err(close) = store.close() {
                    tracing::warn!("{}", close);
                }
                return Err(e);
            }
        };

        Ok(Self::from_parts(session, store))
    }

    /// Wrap already-open connections
    pub fn from_parts(session: Box<dyn ServerSession>, store: Store) -> Self {
        Self {
            session: Some(session),
            store: Some(store),
            status: ConnectionStatus::Connected,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Endpoint of the open session
    pub fn endpoint(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.endpoint())
    }

    /// Verify both connections are usable
    pub fn health_check(&mut self) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| IngestError::Connection("Session already closed".into()))?;
        if !session.is_connected() {
            let endpoint = session.endpoint().to_string();
            self.status = ConnectionStatus::Error;
            return Err(IngestError::SessionLost {
                endpoint,
                message: "session is no longer connected".to_string(),
            });
        }
        self.store()?.ping()
    }

    /// The store connection
    pub fn store(&self) -> Result<&Store> {
        self.store
            .as_ref()
            .ok_or_else(|| IngestError::Connection("Store already closed".into()))
    }

    /// Borrow the session and the store together
    pub fn split(&mut self) -> Result<(&mut dyn ServerSession, &Store)> {
        let session = self
            .session
            .as_deref_mut()
            .ok_or_else(|| IngestError::Connection("Session already closed".into()))?;
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| IngestError::Connection("Store already closed".into()))?;
        Ok((session, store))
    }

    /// Record that the transport is gone
    pub fn mark_session_lost(&mut self) {
        self.status = ConnectionStatus::Error;
    }

    /// Disconnect the session and close the store
    ///
    /// Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.disconnect();
            tracing::info!("Disconnected from {}", session.endpoint());
        }
        if let Some(store) = self.store.take() {
            match store.close() {
                Ok(()) => tracing::info!("Store closed"),
                Err(e) => tracing::warn!("{}", e),
            }
        }
        self.status = ConnectionStatus::Disconnected;
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}
