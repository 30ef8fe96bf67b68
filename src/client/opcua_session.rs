//! OPC UA session backed by the `opcua` crate
//!
//! Only compiled with the `opcua` feature. Connects anonymously without
//! message security, which is how the plant's KEPServerEX endpoint is
//! exposed on the control network.
//!
//! Browsing follows hierarchical references forward from a node; reads fetch
//! the Value attribute. A failing service call with a connection-class
//! status means the session is gone. Any other failure, including timeouts,
//! only costs the node being browsed or read.

use std::sync::Arc;

use opcua::client::prelude::*;
use opcua::sync::RwLock;

use super::node::{NodeClass as LwNodeClass, NodeHandle, NodeId as LwNodeId, NodeInfo};
use super::session::{Connector, ServerSession};
use crate::config::ServerConfig;
use crate::error::{IngestError, Result};
use crate::types::{DataSample, Quality, SampleValue};

/// Browse result mask requesting every reference field
const RESULT_MASK_ALL: u32 = 0x3f;

/// Opens OPC UA sessions
pub struct OpcUaConnector {
    application_name: String,
    session_timeout_ms: u32,
}

impl OpcUaConnector {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            application_name: config.application_name.clone(),
            session_timeout_ms: config.session_timeout_ms.min(u32::MAX as u64) as u32,
        }
    }
}

impl Connector for OpcUaConnector {
    fn connect(&self, endpoint: &str) -> Result<Box<dyn ServerSession>> {
        let mut client = ClientBuilder::new()
            .application_name(self.application_name.as_str())
            .application_uri(format!("urn:{}", self.application_name))
            .trust_server_certs(true)
            .create_sample_keypair(true)
            .session_retry_limit(0)
            .session_timeout(self.session_timeout_ms)
            .client()
            .ok_or_else(|| IngestError::Connection("Invalid OPC UA client configuration".into()))?;

        let session = client
            .connect_to_endpoint(
                (
                    endpoint,
                    SecurityPolicy::None.to_str(),
                    MessageSecurityMode::None,
                    UserTokenPolicy::anonymous(),
                ),
                IdentityToken::Anonymous,
            )
            .map_err(|status| {
                IngestError::Connection(format!("Failed to connect to {}: {}", endpoint, status))
            })?;

        tracing::debug!("OPC UA session established on {}", endpoint);
        Ok(Box::new(OpcUaSession {
            endpoint: endpoint.to_string(),
            session,
            connected: true,
        }))
    }
}

/// A live OPC UA session
pub struct OpcUaSession {
    endpoint: String,
    session: Arc<RwLock<Session>>,
    connected: bool,
}

impl OpcUaSession {
    fn service_error(&mut self, subject: &str, what: &str, status: StatusCode) -> IngestError {
        let err = classify_failure(&self.endpoint, subject, what, status);
        if err.is_session_fatal() {
            self.connected = false;
        }
        err
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(IngestError::SessionLost {
                endpoint: self.endpoint.clone(),
                message: "session closed".to_string(),
            })
        }
    }

    fn browse(
        &mut self,
        subject: &str,
        node_id: opcua::types::NodeId,
        parent: Option<&LwNodeId>,
    ) -> Result<Vec<NodeHandle>> {
        self.ensure_connected()?;

        let description = BrowseDescription {
            node_id,
            browse_direction: BrowseDirection::Forward,
            reference_type_id: ReferenceTypeId::HierarchicalReferences.into(),
            include_subtypes: true,
            node_class_mask: 0,
            result_mask: RESULT_MASK_ALL,
        };

        let result = self.session.read().browse(&[description]);
        let results = match result {
            Ok(results) => results.unwrap_or_default(),
            Err(status) => return Err(self.service_error(subject, "Browse", status)),
        };

        let mut handles = Vec::new();
        for result in results {
            if result.status_code.is_bad() {
                return Err(self.service_error(subject, "Browse", result.status_code));
            }
            for reference in result.references.unwrap_or_default() {
                let class = match reference.node_class {
                    opcua::types::NodeClass::Object => LwNodeClass::Object,
                    opcua::types::NodeClass::Variable => LwNodeClass::Variable,
                    _ => LwNodeClass::Other,
                };
                let info = NodeInfo {
                    id: LwNodeId::new(reference.node_id.node_id.to_string()),
                    display_name: reference.display_name.text.as_ref().to_string(),
                    parent: parent.cloned(),
                };
                handles.push(NodeHandle::new(class, info));
            }
        }
        Ok(handles)
    }
}

impl ServerSession for OpcUaSession {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn is_connected(&self) -> bool {
        self.connected && self.session.read().is_connected()
    }

    fn root_children(&mut self) -> Result<Vec<NodeHandle>> {
        self.browse("Objects", ObjectId::ObjectsFolder.into(), None)
    }

    fn children(&mut self, node: &NodeHandle) -> Result<Vec<NodeHandle>> {
        let node_id = parse_node_id(node.id())?;
        let parent = node.id().clone();
        self.browse(node.display_name(), node_id, Some(&parent))
    }

    fn read_value(&mut self, variable: &NodeInfo) -> Result<DataSample> {
        self.ensure_connected()?;

        let read = ReadValueId {
            node_id: parse_node_id(&variable.id)?,
            attribute_id: AttributeId::Value as u32,
            index_range: UAString::null(),
            data_encoding: QualifiedName::null(),
        };

        let result = self
            .session
            .read()
            .read(&[read], TimestampsToReturn::Neither, 0.0);
        let values = match result {
            Ok(values) => values,
            Err(status) => {
                return Err(self.service_error(&variable.display_name, "Read", status));
            }
        };

        let data_value = values
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::read(&variable.display_name, "empty read response"))?;

        let status = data_value.status.unwrap_or(StatusCode::Good);
        if status.is_bad() && data_value.value.is_none() {
            return Err(IngestError::read(&variable.display_name, status.to_string()));
        }

        let value = data_value.value.map(sample_value).unwrap_or(SampleValue::Empty);
        Ok(DataSample::new(value, quality_of(status)))
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.session.read().disconnect();
            self.connected = false;
        }
    }
}

impl Drop for OpcUaSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn parse_node_id(id: &LwNodeId) -> Result<opcua::types::NodeId> {
    id.as_str()
        .parse::<opcua::types::NodeId>()
        .map_err(|_| IngestError::read(id.as_str(), "unparseable node id"))
}

/// Map a failed service call to the pipeline's error tiers
///
/// Transport statuses lose the session; anything else only costs the
/// node being browsed or read.
fn classify_failure(endpoint: &str, subject: &str, what: &str, status: StatusCode) -> IngestError {
    if is_transport_status(status) {
        IngestError::SessionLost {
            endpoint: endpoint.to_string(),
            message: format!("{} of '{}' failed: {}", what, subject, status),
        }
    } else if is_timeout_status(status) {
        IngestError::Timeout(format!("{} of '{}' timed out: {}", what, subject, status))
    } else {
        IngestError::read(subject, format!("{} failed: {}", what, status))
    }
}

fn quality_of(status: StatusCode) -> Quality {
    if status.is_good() {
        Quality::Good
    } else if status.is_uncertain() {
        Quality::Uncertain
    } else {
        Quality::Bad
    }
}

fn is_timeout_status(status: StatusCode) -> bool {
    [StatusCode::BadTimeout, StatusCode::BadRequestTimeout].contains(&status.status())
}

fn is_transport_status(status: StatusCode) -> bool {
    [
        StatusCode::BadConnectionClosed,
        StatusCode::BadNotConnected,
        StatusCode::BadServerNotConnected,
        StatusCode::BadSessionClosed,
        StatusCode::BadSessionIdInvalid,
        StatusCode::BadCommunicationError,
        StatusCode::BadSecureChannelClosed,
    ]
    .contains(&status.status())
}

fn sample_value(variant: Variant) -> SampleValue {
    match variant {
        Variant::Empty => SampleValue::Empty,
        Variant::Boolean(v) => SampleValue::Bool(v),
        Variant::SByte(v) => SampleValue::Int(v.into()),
        Variant::Int16(v) => SampleValue::Int(v.into()),
        Variant::Int32(v) => SampleValue::Int(v.into()),
        Variant::Int64(v) => SampleValue::Int(v),
        Variant::Byte(v) => SampleValue::UInt(v.into()),
        Variant::UInt16(v) => SampleValue::UInt(v.into()),
        Variant::UInt32(v) => SampleValue::UInt(v.into()),
        Variant::UInt64(v) => SampleValue::UInt(v),
        Variant::Float(v) => SampleValue::Float(v.into()),
        Variant::Double(v) => SampleValue::Float(v),
        Variant::String(s) => SampleValue::Text(s.as_ref().to_string()),
        other => SampleValue::Text(format!("{:?}", other)),
    }
}
