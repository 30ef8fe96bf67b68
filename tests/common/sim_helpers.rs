//! Simulated plant construction helpers

use linewatch::client::{NodeId, SimulatedServer, ValuePattern};
use linewatch::config::AppConfig;
use linewatch::ingest::{ConnectionManager, PollLoop, RunSummary, Shutdown};
use linewatch::{Result, SampleValue};

/// Build the object chain for `config`'s browse path, returning the machine
pub fn plant_for(config: &AppConfig) -> (SimulatedServer, NodeId) {
    let server = SimulatedServer::new();
    let mut parent: Option<NodeId> = None;
    for name in config.browse_path() {
        parent = Some(server.add_object(parent.as_ref(), &name));
    }
    let machine = parent.expect("browse path is never empty");
    (server, machine)
}

pub fn constant(value: i64) -> ValuePattern {
    ValuePattern::Constant(SampleValue::Int(value))
}

/// Open connections through the simulator and run the loop to completion
pub fn run_loop(config: &AppConfig, server: &SimulatedServer) -> Result<RunSummary> {
    run_loop_with(config, server, Shutdown::new())
}

pub fn run_loop_with(
    config: &AppConfig,
    server: &SimulatedServer,
    shutdown: Shutdown,
) -> Result<RunSummary> {
    let connections = ConnectionManager::open(config, server)?;
    PollLoop::new(config.clone(), connections, shutdown).run()
}
