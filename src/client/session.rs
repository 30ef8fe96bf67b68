//! Protocol session traits
//!
//! This module provides the boundary between the ingestion pipeline and the
//! automation server client. Both the real OPC UA binding and the simulated
//! server implement it, so the pipeline never knows which one it talks to.

use super::node::{NodeHandle, NodeInfo};
use crate::error::Result;
use crate::types::DataSample;

/// An open session against an automation server
///
/// Implementations must be `Send` so the session can be handed to the poll
/// thread. Errors that mean the transport is gone must be reported as
/// [`IngestError::SessionLost`](crate::error::IngestError::SessionLost) so the
/// poll loop can tell them apart from a single bad variable.
///
/// # Example
///
/// ```ignore
/// fn names(session: &mut dyn ServerSession) -> Result<Vec<String>> {
///     Ok(session
///         .root_children()?
///         .iter()
///         .map(|n| n.display_name().to_string())
///         .collect())
/// }
/// ```
pub trait ServerSession: Send {
    /// Endpoint this session is connected to
    fn endpoint(&self) -> &str;

    /// Check if the session is still usable
    fn is_connected(&self) -> bool;

    /// Children of the Objects folder
    fn root_children(&mut self) -> Result<Vec<NodeHandle>>;

    /// Hierarchical children of a node, in server enumeration order
    fn children(&mut self, node: &NodeHandle) -> Result<Vec<NodeHandle>>;

    /// Read the current value and quality of a variable
    fn read_value(&mut self, variable: &NodeInfo) -> Result<DataSample>;

    /// Close the session; further calls fail
    fn disconnect(&mut self);
}

/// Opens sessions by endpoint URL
#[cfg_attr(test, mockall::automock)]
pub trait Connector {
    /// Connect to one endpoint
    fn connect(&self, endpoint: &str) -> Result<Box<dyn ServerSession>>;
}
