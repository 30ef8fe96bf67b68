//! Address space node handles
//!
//! A [`NodeHandle`] is a transient reference to a node in the server's address
//! space. The node class is carried in the variant, so only
//! [`NodeHandle::Variable`] exposes the capability to be read.

use std::fmt;

/// Opaque identity of a node in the address space
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node class as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    Object,
    Variable,
    Other,
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeClass::Object => write!(f, "Object"),
            NodeClass::Variable => write!(f, "Variable"),
            NodeClass::Other => write!(f, "Other"),
        }
    }
}

/// Attributes shared by every node class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub display_name: String,
    /// Node this one was browsed from; `None` for children of the root
    pub parent: Option<NodeId>,
}

/// A node in the address space, tagged by class
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeHandle {
    Object(NodeInfo),
    Variable(NodeInfo),
    Other(NodeInfo),
}

impl NodeHandle {
    /// Build a handle of the given class
    pub fn new(class: NodeClass, info: NodeInfo) -> Self {
        match class {
            NodeClass::Object => NodeHandle::Object(info),
            NodeClass::Variable => NodeHandle::Variable(info),
            NodeClass::Other => NodeHandle::Other(info),
        }
    }

    pub fn info(&self) -> &NodeInfo {
        match self {
            NodeHandle::Object(info) | NodeHandle::Variable(info) | NodeHandle::Other(info) => {
                info
            }
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.info().id
    }

    pub fn display_name(&self) -> &str {
        &self.info().display_name
    }

    pub fn node_class(&self) -> NodeClass {
        match self {
            NodeHandle::Object(_) => NodeClass::Object,
            NodeHandle::Variable(_) => NodeClass::Variable,
            NodeHandle::Other(_) => NodeClass::Other,
        }
    }

    /// The readable view of this node, if it is a variable
    pub fn as_variable(&self) -> Option<&NodeInfo> {
        match self {
            NodeHandle::Variable(info) => Some(info),
            _ => None,
        }
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] ({})", self.display_name(), self.node_class(), self.id())
    }
}
