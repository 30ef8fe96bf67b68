//! Simulated automation server
//!
//! This module provides an in-memory address space that can be used to run
//! the pipeline without a plant server. It is what the `sim://` endpoint
//! scheme connects to, and what the test suite drives.
//!
//! # Features
//!
//! - **Arbitrary hierarchy**: objects, variables and other node classes
//! - **Value patterns**: constant, counter and sine values per variable
//! - **Failure injection**: per-variable read failures, dropped transport,
//!   refused connections
//! - **Shared handle**: clones of a [`SimulatedServer`] see the same address
//!   space, so a test can mutate it while a poll loop is running
//!
//! # Example
//!
//! ```ignore
//! use linewatch::client::{SimulatedServer, ValuePattern};
//! use linewatch::types::SampleValue;
//!
//! let server = SimulatedServer::new();
//! let plant = server.add_object(None, "Matics");
//! let line = server.add_object(Some(&plant), "Serac4");
//! let machine = server.add_object(Some(&line), "Palletizer");
//! server.add_variable(&machine, "Speed", ValuePattern::Constant(SampleValue::Float(1.5)));
//!
//! let session = server.connect("sim://plant")?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::node::{NodeClass, NodeHandle, NodeId, NodeInfo};
use super::session::{Connector, ServerSession};
use crate::error::{IngestError, Result};
use crate::types::{DataSample, Quality, SampleValue};

/// Endpoint scheme served by the simulator
pub const SIM_SCHEME: &str = "sim://";

/// How a simulated variable produces values
#[derive(Debug, Clone, PartialEq)]
pub enum ValuePattern {
    /// Fixed value
    Constant(SampleValue),
    /// Integer that advances by `step` on every read
    Counter { start: i64, step: i64 },
    /// Sine wave over wall-clock time since the server was created
    Sine {
        amplitude: f64,
        period_secs: f64,
        offset: f64,
    },
}

#[derive(Debug)]
struct SimNode {
    class: NodeClass,
    info: NodeInfo,
    children: Vec<NodeId>,
    pattern: Option<ValuePattern>,
    quality: Quality,
    failure: Option<String>,
    reads: u64,
}

impl SimNode {
    fn handle(&self) -> NodeHandle {
        NodeHandle::new(self.class, self.info.clone())
    }

    fn sample(&mut self, elapsed_secs: f64) -> SampleValue {
        let reads = self.reads;
        self.reads += 1;
        match &self.pattern {
            Some(ValuePattern::Constant(v)) => v.clone(),
            Some(ValuePattern::Counter { start, step }) => {
                SampleValue::Int(start.saturating_add(step.saturating_mul(reads as i64)))
            }
            Some(ValuePattern::Sine {
                amplitude,
                period_secs,
                offset,
            }) => {
                let phase = if *period_secs > 0.0 {
                    2.0 * std::f64::consts::PI * elapsed_secs / period_secs
                } else {
                    0.0
                };
                SampleValue::Float(offset + amplitude * phase.sin())
            }
            None => SampleValue::Empty,
        }
    }
}

#[derive(Debug)]
struct AddressSpace {
    nodes: HashMap<NodeId, SimNode>,
    root: Vec<NodeId>,
    next_id: u64,
    transport_up: bool,
    accepting: bool,
    /// Endpoints that accept connections; `None` accepts any `sim://` URL
    endpoints: Option<Vec<String>>,
    connects: u64,
    started: Instant,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            root: Vec::new(),
            next_id: 1,
            transport_up: true,
            accepting: true,
            endpoints: None,
            connects: 0,
            started: Instant::now(),
        }
    }
}

impl AddressSpace {
    fn insert(
        &mut self,
        parent: Option<&NodeId>,
        name: &str,
        class: NodeClass,
        pattern: Option<ValuePattern>,
    ) -> NodeId {
        let id = NodeId::new(format!("ns=2;i={}", self.next_id));
        self.next_id += 1;

        let node = SimNode {
            class,
            info: NodeInfo {
                id: id.clone(),
                display_name: name.to_string(),
                parent: parent.cloned(),
            },
            children: Vec::new(),
            pattern,
            quality: Quality::Good,
            failure: None,
            reads: 0,
        };
        self.nodes.insert(id.clone(), node);

        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent) => parent.children.push(id.clone()),
            None => self.root.push(id.clone()),
        }
        id
    }

    fn remove(&mut self, id: &NodeId) {
        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        for child in node.children {
            self.remove(&child);
        }
        match node.info.parent.as_ref().and_then(|p| self.nodes.get_mut(p)) {
            Some(parent) => parent.children.retain(|c| c != id),
            None => self.root.retain(|c| c != id),
        }
    }

    fn handles(&self, ids: &[NodeId]) -> Vec<NodeHandle> {
        ids.iter()
            .filter_map(|id| self.nodes.get(id))
            .map(SimNode::handle)
            .collect()
    }
}

/// Handle to a simulated address space
///
/// Cloning is cheap; all clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedServer {
    inner: Arc<Mutex<AddressSpace>>,
}

impl SimulatedServer {
    /// Create an empty server
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a server with a plausible machine under `root_path/line/machine`
    ///
    /// The machine exposes a few live variables, one internal `_` variable
    /// and a nested diagnostics object.
    pub fn demo(root_path: &[String], line: &str, machine: &str) -> Self {
        let server = Self::new();
        let mut parent: Option<NodeId> = None;
        for name in root_path.iter().map(String::as_str).chain([line, machine]) {
            parent = Some(server.add_object(parent.as_ref(), name));
        }
        let Some(machine) = parent else {
            return server;
        };

        server.add_variable(
            &machine,
            "Speed",
            ValuePattern::Sine {
                amplitude: 12.0,
                period_secs: 60.0,
                offset: 40.0,
            },
        );
        server.add_variable(&machine, "PalletCount", ValuePattern::Counter { start: 0, step: 1 });
        server.add_variable(
            &machine,
            "State",
            ValuePattern::Constant(SampleValue::Text("RUNNING".to_string())),
        );
        server.add_variable(&machine, "AlarmActive", ValuePattern::Constant(SampleValue::Bool(false)));
        server.add_variable(&machine, "_Statistics", ValuePattern::Constant(SampleValue::UInt(0)));
        server.add_object(Some(&machine), "Diagnostics");
        server
    }

    fn lock(&self) -> MutexGuard<'_, AddressSpace> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an object node; `None` places it under the Objects folder
    pub fn add_object(&self, parent: Option<&NodeId>, name: &str) -> NodeId {
        self.lock().insert(parent, name, NodeClass::Object, None)
    }

    /// Add a variable node
    pub fn add_variable(&self, parent: &NodeId, name: &str, pattern: ValuePattern) -> NodeId {
        self.lock()
            .insert(Some(parent), name, NodeClass::Variable, Some(pattern))
    }

    /// Add a node that is neither object nor variable (e.g. a method)
    pub fn add_other(&self, parent: &NodeId, name: &str) -> NodeId {
        self.lock().insert(Some(parent), name, NodeClass::Other, None)
    }

    /// Remove a node and its subtree
    pub fn remove_node(&self, id: &NodeId) {
        self.lock().remove(id);
    }

    /// Set the quality reported with a variable's value
    pub fn set_quality(&self, id: &NodeId, quality: Quality) {
        if let Some(node) = self.lock().nodes.get_mut(id) {
            node.quality = quality;
        }
    }

    /// Make every read of a variable fail with `message`
    pub fn fail_reads(&self, id: &NodeId, message: &str) {
        if let Some(node) = self.lock().nodes.get_mut(id) {
            node.failure = Some(message.to_string());
        }
    }

    /// Let a failing variable read normally again
    pub fn clear_failure(&self, id: &NodeId) {
        if let Some(node) = self.lock().nodes.get_mut(id) {
            node.failure = None;
        }
    }

    /// Simulate a transport loss; every open session fails from now on
    pub fn drop_transport(&self) {
        self.lock().transport_up = false;
    }

    /// Bring the transport back
    pub fn restore_transport(&self) {
        self.lock().transport_up = true;
    }

    /// Refuse or accept new connections
    pub fn set_accepting(&self, accepting: bool) {
        self.lock().accepting = accepting;
    }

    /// Only accept connections on these endpoints
    pub fn accept_only(&self, endpoints: &[&str]) {
        self.lock().endpoints = Some(endpoints.iter().map(|e| e.to_string()).collect());
    }

    /// Number of successful connects so far
    pub fn connect_count(&self) -> u64 {
        self.lock().connects
    }

    /// Number of successful reads of a variable
    pub fn read_count(&self, id: &NodeId) -> u64 {
        self.lock().nodes.get(id).map(|n| n.reads).unwrap_or(0)
    }

    /// Find a node by display-name path from the Objects folder
    pub fn find(&self, path: &[&str]) -> Option<NodeId> {
        let space = self.lock();
        let mut level = space.root.clone();
        let mut found = None;
        for name in path {
            let id = level
                .iter()
                .find(|id| space.nodes.get(*id).is_some_and(|n| n.info.display_name == *name))?
                .clone();
            level = space.nodes.get(&id).map(|n| n.children.clone()).unwrap_or_default();
            found = Some(id);
        }
        found
    }

    /// Open a session without going through [`Connector`]
    pub fn session(&self, endpoint: &str) -> Result<SimSession> {
        let mut space = self.lock();
        if !endpoint.starts_with(SIM_SCHEME) {
            return Err(IngestError::Connection(format!(
                "Simulated server only serves {} endpoints, got {}",
                SIM_SCHEME, endpoint
            )));
        }
        let listed = space
            .endpoints
            .as_ref()
            .map_or(true, |eps| eps.iter().any(|e| e == endpoint));
        if !space.accepting || !space.transport_up || !listed {
            return Err(IngestError::Connection(format!(
                "Connection refused by {}",
                endpoint
            )));
        }
        space.connects += 1;
        drop(space);

        Ok(SimSession {
            server: self.clone(),
            endpoint: endpoint.to_string(),
            connected: true,
        })
    }
}

impl Connector for SimulatedServer {
    fn connect(&self, endpoint: &str) -> Result<Box<dyn ServerSession>> {
        Ok(Box::new(self.session(endpoint)?))
    }
}

/// A session against a [`SimulatedServer`]
#[derive(Debug)]
pub struct SimSession {
    server: SimulatedServer,
    endpoint: String,
    connected: bool,
}

impl SimSession {
    fn live(&self) -> Result<MutexGuard<'_, AddressSpace>> {
        if !self.connected {
            return Err(IngestError::SessionLost {
                endpoint: self.endpoint.clone(),
                message: "session closed".to_string(),
            });
        }
        let space = self.server.lock();
        if !space.transport_up {
            return Err(IngestError::SessionLost {
                endpoint: self.endpoint.clone(),
                message: "transport closed by peer".to_string(),
            });
        }
        Ok(space)
    }
}

impl ServerSession for SimSession {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn is_connected(&self) -> bool {
        self.connected && self.server.lock().transport_up
    }

    fn root_children(&mut self) -> Result<Vec<NodeHandle>> {
        let space = self.live()?;
        Ok(space.handles(&space.root))
    }

    fn children(&mut self, node: &NodeHandle) -> Result<Vec<NodeHandle>> {
        let space = self.live()?;
        let sim = space
            .nodes
            .get(node.id())
            .ok_or_else(|| IngestError::read(node.display_name(), "BadNodeIdUnknown"))?;
        Ok(space.handles(&sim.children))
    }

    fn read_value(&mut self, variable: &NodeInfo) -> Result<DataSample> {
        let mut space = self.live()?;
        let elapsed = space.started.elapsed().as_secs_f64();
        let sim = space
            .nodes
            .get_mut(&variable.id)
            .ok_or_else(|| IngestError::read(&variable.display_name, "BadNodeIdUnknown"))?;

        if sim.class != NodeClass::Variable {
            return Err(IngestError::read(
                &variable.display_name,
                "BadAttributeIdInvalid",
            ));
        }
        if let Some(message) = &sim.failure {
            return Err(IngestError::read(&variable.display_name, message.clone()));
        }

        let value = sim.sample(elapsed);
        Ok(DataSample::new(value, sim.quality))
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}
