//! Browse-path resolution
//!
//! Walks the address space one level per display name, starting at the
//! children of the Objects folder. Matching is exact and case-sensitive; when
//! two siblings share a name, the first one in server enumeration order wins.

use crate::client::{NodeHandle, ServerSession};
use crate::error::{IngestError, Result};

/// Resolves a display-name path to a node
#[derive(Debug, Clone)]
pub struct NodeResolver {
    path: Vec<String>,
}

impl NodeResolver {
    pub fn new(path: Vec<String>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Resolve the path against a live session
    ///
    /// Fails with [`IngestError::Resolution`] naming the first level whose
    /// parent has no child with that display name.
    pub fn resolve(&self, session: &mut dyn ServerSession) -> Result<NodeHandle> {
        let Some((first, rest)) = self.path.split_first() else {
            return Err(IngestError::Config("Browse path is empty".into()));
        };

        let mut current = find_child(session.root_children()?, first).ok_or_else(|| {
            IngestError::Resolution {
                level: 1,
                name: first.clone(),
                parent: "Objects".to_string(),
            }
        })?;
        tracing::trace!("Resolved level 1: {}", current);

        for (idx, name) in rest.iter().enumerate() {
            let children = session.children(&current)?;
            current = find_child(children, name).ok_or_else(|| IngestError::Resolution {
                level: idx + 2,
                name: name.clone(),
                parent: current.display_name().to_string(),
            })?;
            tracing::trace!("Resolved level {}: {}", idx + 2, current);
        }

        Ok(current)
    }
}

fn find_child(children: Vec<NodeHandle>, name: &str) -> Option<NodeHandle> {
    children.into_iter().find(|c| c.display_name() == name)
}
