//! Variable sampling
//!
//! A sweep enumerates the machine's children afresh, so variables added or
//! removed on the server are picked up on the next cycle without
//! reconnecting. Reads happen lazily as the [`Sweep`] iterator is consumed.
//!
//! Skipped without reading:
//!
//! - nodes that are not variables
//! - variables whose display name starts with [`RESERVED_PREFIX`]

use chrono::{DateTime, Utc};

use crate::client::{NodeHandle, NodeInfo, ServerSession};
use crate::error::{IngestError, Result};
use crate::types::Reading;

/// Display-name prefix marking internal/diagnostic variables
pub const RESERVED_PREFIX: char = '_';

/// Whether a child node takes part in a sweep
pub fn is_sampled(node: &NodeHandle) -> bool {
    node.as_variable().is_some() && !is_reserved(node.display_name())
}

/// Whether a display name marks an internal variable
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Produces readings for one machine
#[derive(Debug, Clone)]
pub struct Sampler {
    line: String,
    machine: String,
    last_stamp: Option<DateTime<Utc>>,
}

impl Sampler {
    pub fn new(line: impl Into<String>, machine: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            machine: machine.into(),
            last_stamp: None,
        }
    }

    /// Start a sweep over the children of `machine`
    ///
    /// Enumeration happens here; an error means no variable of this sweep
    /// could be reached.
    pub fn sweep<'a>(
        &'a mut self,
        session: &'a mut dyn ServerSession,
        machine: &NodeHandle,
    ) -> Result<Sweep<'a>> {
        let children = session.children(machine)?;
        Ok(Sweep {
            sampler: self,
            session,
            children: children.into_iter(),
            skipped: 0,
        })
    }

    /// Current time, never earlier than a previously issued stamp
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn read(&mut self, session: &mut dyn ServerSession, variable: &NodeInfo) -> Result<Reading> {
        let sample = session.read_value(variable).map_err(|e| {
            if e.is_session_fatal() || matches!(e.root(), IngestError::Read { .. }) {
                e
            } else {
                IngestError::read(&variable.display_name, e.to_string())
            }
        })?;

        Ok(Reading {
            timestamp: self.stamp(),
            line: self.line.clone(),
            machine: self.machine.clone(),
            variable: variable.display_name.clone(),
            value: sample.value.to_string(),
            quality: sample.quality,
        })
    }
}

/// One lazy pass over a machine's variables
///
/// Yields one item per qualifying variable: the reading, or the error that
/// prevented it.
pub struct Sweep<'a> {
    sampler: &'a mut Sampler,
    session: &'a mut dyn ServerSession,
    children: std::vec::IntoIter<NodeHandle>,
    skipped: usize,
}

impl Sweep<'_> {
    /// Children passed over so far (non-variables and reserved names)
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Sweep<'_> {
    type Item = Result<Reading>;

    fn next(&mut self) -> Option<Self::Item> {
        for child in self.children.by_ref() {
            if !is_sampled(&child) {
                tracing::trace!("Skipping {}", child);
                self.skipped += 1;
                continue;
            }
            let Some(variable) = child.as_variable() else {
                continue;
            };
            return Some(self.sampler.read(&mut *self.session, variable));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{NodeId, SimulatedServer, ValuePattern};
    use crate::types::{Quality, SampleValue};
    use proptest::prelude::*;

    struct Fixture {
        server: SimulatedServer,
        machine: NodeHandle,
        machine_id: NodeId,
    }

    fn fixture() -> Fixture {
        let server = SimulatedServer::new();
        let machine_id = server.add_object(None, "Palletizer");
        let machine = NodeHandle::Object(NodeInfo {
            id: machine_id.clone(),
            display_name: "Palletizer".into(),
            parent: None,
        });
        Fixture {
            server,
            machine,
            machine_id,
        }
    }

    fn constant(v: i64) -> ValuePattern {
        ValuePattern::Constant(SampleValue::Int(v))
    }

    #[test]
    fn test_skips_objects_and_reserved_names() {
        let fx = fixture();
        fx.server.add_variable(&fx.machine_id, "Speed", constant(1));
        fx.server.add_variable(&fx.machine_id, "_Hidden", constant(2));
        fx.server.add_object(Some(&fx.machine_id), "Diagnostics");
        fx.server.add_other(&fx.machine_id, "Reset");

        let mut session = fx.server.session("sim://x").unwrap();
        let mut sampler = Sampler::new("Serac4", "Palletizer");
        let mut sweep = sampler.sweep(&mut session, &fx.machine).unwrap();
        let readings: Vec<_> = sweep.by_ref().collect::<Result<_>>().unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].variable, "Speed");
        assert_eq!(readings[0].value, "1");
        assert_eq!(readings[0].line, "Serac4");
        assert_eq!(sweep.skipped(), 3);
    }

    #[test]
    fn test_one_failure_does_not_stop_sweep() {
        let fx = fixture();
        fx.server.add_variable(&fx.machine_id, "A", constant(1));
        let b = fx.server.add_variable(&fx.machine_id, "B", constant(2));
        fx.server.add_variable(&fx.machine_id, "C", constant(3));
        fx.server.fail_reads(&b, "BadDecodingError");

        let mut session = fx.server.session("sim://x").unwrap();
        let mut sampler = Sampler::new("L", "M");
        let results: Vec<_> = sampler.sweep(&mut session, &fx.machine).unwrap().collect();

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
        let err = results[1].as_ref().unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_quality_is_carried() {
        let fx = fixture();
        let b = fx.server.add_variable(&fx.machine_id, "B", constant(2));
        fx.server.set_quality(&b, Quality::Uncertain);

        let mut session = fx.server.session("sim://x").unwrap();
        let mut sampler = Sampler::new("L", "M");
        let reading = sampler
            .sweep(&mut session, &fx.machine)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(reading.quality, Quality::Uncertain);
    }

    #[test]
    fn test_each_sweep_reenumerates() {
        let fx = fixture();
        let a = fx.server.add_variable(&fx.machine_id, "A", constant(1));
        let mut session = fx.server.session("sim://x").unwrap();
        let mut sampler = Sampler::new("L", "M");

        assert_eq!(sampler.sweep(&mut session, &fx.machine).unwrap().count(), 1);

        fx.server.add_variable(&fx.machine_id, "B", constant(2));
        fx.server.remove_node(&a);
        let names: Vec<String> = sampler
            .sweep(&mut session, &fx.machine)
            .unwrap()
            .map(|r| r.unwrap().variable)
            .collect();
        assert_eq!(names, vec!["B".to_string()]);
    }

    #[test]
    fn test_stamps_never_go_backwards() {
        let fx = fixture();
        fx.server.add_variable(&fx.machine_id, "A", constant(1));
        let mut session = fx.server.session("sim://x").unwrap();
        let mut sampler = Sampler::new("L", "M");
        sampler.last_stamp = Some(Utc::now() + chrono::Duration::hours(1));
        let future = sampler.last_stamp;

        let reading = sampler
            .sweep(&mut session, &fx.machine)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(Some(reading.timestamp), future);
    }

    #[test]
    fn test_lost_transport_is_session_fatal() {
        let fx = fixture();
        fx.server.add_variable(&fx.machine_id, "A", constant(1));
        let mut session = fx.server.session("sim://x").unwrap();
        let mut sampler = Sampler::new("L", "M");
        let mut sweep = sampler.sweep(&mut session, &fx.machine).unwrap();

        fx.server.drop_transport();
        let err = sweep.next().unwrap().unwrap_err();
        assert!(err.is_session_fatal());
    }

    proptest! {
        #[test]
        fn prop_reserved_names_never_sampled(name in "[_A-Za-z][A-Za-z0-9_]{0,12}") {
            let node = NodeHandle::Variable(NodeInfo {
                id: NodeId::new("ns=2;i=1"),
                display_name: name.clone(),
                parent: None,
            });
            prop_assert_eq!(is_sampled(&node), !name.starts_with('_'));

            let object = NodeHandle::Object(NodeInfo {
                id: NodeId::new("ns=2;i=2"),
                display_name: name,
                parent: None,
            });
            prop_assert!(!is_sampled(&object));
        }
    }
}
