//! Automation server client boundary
//!
//! This module owns everything the pipeline knows about the protocol side:
//! node handles, the session traits, and the session implementations.
//!
//! # Components
//!
//! - [`NodeHandle`] - Transient, class-tagged reference into the address space
//! - [`ServerSession`] / [`Connector`] - Traits the pipeline is written against
//! - [`SimulatedServer`] - In-memory address space served on `sim://` endpoints
//! - `OpcUaConnector` - Real OPC UA sessions on `opc.tcp://` endpoints
//!   (feature `opcua`)
//! - [`EndpointConnector`] - Picks one of the above by URL scheme

pub mod node;
#[cfg(feature = "opcua")]
pub mod opcua_session;
pub mod session;
pub mod simulated;

pub use node::{NodeClass, NodeHandle, NodeId, NodeInfo};
#[cfg(feature = "opcua")]
pub use opcua_session::{OpcUaConnector, OpcUaSession};
pub use session::{Connector, ServerSession};
pub use simulated::{SimSession, SimulatedServer, ValuePattern, SIM_SCHEME};

use crate::config::AppConfig;
use crate::error::{IngestError, Result};

/// Endpoint scheme for OPC UA binary over TCP
pub const OPC_TCP_SCHEME: &str = "opc.tcp://";

/// Dispatches connects to the simulator or the OPC UA client by scheme
pub struct EndpointConnector {
    simulated: SimulatedServer,
    #[cfg(feature = "opcua")]
    opcua: OpcUaConnector,
}

impl EndpointConnector {
    /// Build a connector for a deployment
    ///
    /// `sim://` endpoints are served by a demo address space shaped after the
    /// configured browse path.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            simulated: SimulatedServer::demo(
                &config.server.root_path,
                &config.target.line,
                &config.target.machine,
            ),
            #[cfg(feature = "opcua")]
            opcua: OpcUaConnector::new(&config.server),
        }
    }
}

impl Connector for EndpointConnector {
    fn connect(&self, endpoint: &str) -> Result<Box<dyn ServerSession>> {
        if endpoint.starts_with(SIM_SCHEME) {
            return self.simulated.connect(endpoint);
        }

        if endpoint.starts_with(OPC_TCP_SCHEME) {
            #[cfg(feature = "opcua")]
            {
                return self.opcua.connect(endpoint);
            }
            #[cfg(not(feature = "opcua"))]
            {
                return Err(IngestError::Connection(format!(
                    "{} requires building with the `opcua` feature",
                    endpoint
                )));
            }
        }

        Err(IngestError::Connection(format!(
            "Unsupported endpoint scheme: {}",
            endpoint
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_endpoint_connects_to_demo() {
        let connector = EndpointConnector::from_config(&AppConfig::default());
        let mut session = connector.connect("sim://plant").unwrap();
        let roots = session.root_children().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].display_name(), "Matics");
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let connector = EndpointConnector::from_config(&AppConfig::default());
        let err = connector.connect("http://plant").err().unwrap();
        assert!(matches!(err, IngestError::Connection(_)));
    }

    #[cfg(not(feature = "opcua"))]
    #[test]
    fn test_opc_tcp_needs_feature() {
        let connector = EndpointConnector::from_config(&AppConfig::default());
        let err = connector.connect("opc.tcp://127.0.0.1:4840").err().unwrap();
        assert!(err.to_string().contains("opcua"));
    }
}
