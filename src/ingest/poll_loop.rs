//! The acquisition driver
//!
//! ```text
//! Bootstrapping -> Resolving -> Running -> Draining -> Stopped
//!       |              |           |
//!       +--------------+-----------+--> Stopped (fatal)
//! ```
//!
//! Per-variable read and write failures are counted and logged inside the
//! sweep. Anything else ends the run. Cancellation is checked between
//! readings and during the inter-sweep pause; the write in flight when it
//! arrives is always completed.

use std::fmt;
use std::time::{Duration, Instant};

use crate::client::NodeHandle;
use crate::config::AppConfig;
use crate::error::Result;
use crate::store::{SchemaBootstrapper, SeedIds, Sink};
use crate::types::IngestStats;

use super::connection::ConnectionManager;
use super::resolver::NodeResolver;
use super::sampler::Sampler;
use super::shutdown::Shutdown;

/// Lifecycle state of a [`PollLoop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Bootstrapping,
    Resolving,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollState::Bootstrapping => "Bootstrapping",
            PollState::Resolving => "Resolving",
            PollState::Running => "Running",
            PollState::Draining => "Draining",
            PollState::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// Outcome of a run that ended without a fatal error
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: IngestStats,
    /// Row ids of the seeded line and machine
    pub seed: SeedIds,
    /// Whether the run ended because cancellation was requested
    pub cancelled: bool,
    /// Every state entered, in order
    pub transitions: Vec<PollState>,
    pub elapsed: Duration,
}

/// Why a sweep ended
enum SweepEnd {
    Completed,
    Cancelled,
}

pub struct PollLoop {
    config: AppConfig,
    connections: ConnectionManager,
    shutdown: Shutdown,
    state: PollState,
    transitions: Vec<PollState>,
    stats: IngestStats,
}

impl PollLoop {
    pub fn new(config: AppConfig, connections: ConnectionManager, shutdown: Shutdown) -> Self {
        Self {
            config,
            connections,
            shutdown,
            state: PollState::Bootstrapping,
            transitions: vec![PollState::Bootstrapping],
            stats: IngestStats::default(),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Drive the loop until cancellation, `max_sweeps` or a fatal error
    ///
    /// Connections are closed on every exit path.
    pub fn run(mut self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!(
            "Poll loop starting for {}/{} every {:?}",
            self.config.target.line,
            self.config.target.machine,
            self.config.poll.interval()
        );

        let outcome = self.drive();
        self.transition(PollState::Stopped);
        self.connections.close();

        match outcome {
            Ok((seed, cancelled)) => {
                tracing::info!("Poll loop stopped: {}", self.stats);
                Ok(RunSummary {
                    stats: self.stats,
                    seed,
                    cancelled,
                    transitions: std::mem::take(&mut self.transitions),
                    elapsed: started.elapsed(),
                })
            }
            Err(e) => {
                tracing::error!("Poll loop failed: {}", e);
                tracing::info!("Counters at failure: {}", self.stats);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: PollState) {
        tracing::debug!("{} -> {}", self.state, next);
        self.state = next;
        self.transitions.push(next);
    }

    fn drive(&mut self) -> Result<(SeedIds, bool)> {
        let seed = self.bootstrap()?;

        self.transition(PollState::Resolving);
        let machine = self.resolve()?;

        if !self.shutdown.is_triggered() {
            self.transition(PollState::Running);
            self.run_sweeps(&machine)?;
        }

        self.transition(PollState::Draining);
        let cancelled = self.shutdown.is_triggered();
        Ok((seed, cancelled))
    }

    fn bootstrap(&mut self) -> Result<SeedIds> {
        let target = &self.config.target;
        let seed = SchemaBootstrapper::new(&target.line, &target.machine)
            .run(self.connections.store()?)?;
        tracing::info!(
            "Schema ready (line id {}, machine id {})",
            seed.line_id,
            seed.machine_id
        );
        Ok(seed)
    }

    fn resolve(&mut self) -> Result<NodeHandle> {
        let resolver = NodeResolver::new(self.config.browse_path());
        let (session, _) = self.connections.split()?;
        let machine = resolver.resolve(session).inspect_err(|e| {
            if e.is_session_fatal() {
                self.connections.mark_session_lost();
            }
        })?;
        tracing::info!("Resolved {} to {}", resolver.path().join("/"), machine.id());
        Ok(machine)
    }

    fn run_sweeps(&mut self, machine: &NodeHandle) -> Result<()> {
        let target = &self.config.target;
        let mut sampler = Sampler::new(&target.line, &target.machine);
        let interval = self.config.poll.interval();
        let stats_every = self.config.poll.stats_every_sweeps;
        let max_sweeps = self.config.poll.max_sweeps;

        let reached = |sweeps: u64| max_sweeps.is_some_and(|max| sweeps >= max);

        while !reached(self.stats.sweeps) {
            // A dead session surfaces here rather than mid-sweep
            self.connections.health_check()?;

            let end = self.sweep(&mut sampler, machine).inspect_err(|e| {
                if e.is_session_fatal() {
                    self.connections.mark_session_lost();
                }
            })?;
            if let SweepEnd::Cancelled = end {
                return Ok(());
            }

            self.stats.sweeps += 1;
            if stats_every > 0 && self.stats.sweeps % stats_every == 0 {
                tracing::info!("{}", self.stats);
            }
            if reached(self.stats.sweeps) {
                break;
            }
            if self.shutdown.wait(interval) {
                return Ok(());
            }
        }

        tracing::info!("Reached {} sweeps", self.stats.sweeps);
        Ok(())
    }

    /// One pass over the machine's variables
    ///
    /// Returns an error only for failures that are not scoped to a single
    /// variable.
    fn sweep(&mut self, sampler: &mut Sampler, machine: &NodeHandle) -> Result<SweepEnd> {
        let (session, store) = self.connections.split()?;
        let sink = Sink::new(store);

        let sweep = match sampler.sweep(session, machine) {
            Ok(sweep) => sweep,
            Err(e) if e.is_recoverable() => {
                tracing::warn!("Sweep skipped: {}", e);
                self.stats.read_errors += 1;
                return Ok(SweepEnd::Completed);
            }
            Err(e) => return Err(e),
        };

        for item in sweep {
            match item {
                Ok(reading) => match sink.write(&reading) {
                    Ok(_) => {
                        tracing::debug!(
                            "{} = {} ({})",
                            reading.variable,
                            reading.value,
                            reading.quality
                        );
                        self.stats.readings += 1;
                    }
                    Err(e) if e.is_recoverable() => {
                        tracing::warn!("{}", e);
                        self.stats.write_errors += 1;
                    }
                    Err(e) => return Err(e),
                },
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("{}", e);
                    self.stats.read_errors += 1;
                }
                Err(e) => return Err(e),
            }

            if self.shutdown.is_triggered() {
                tracing::info!("Cancellation requested mid-sweep");
                return Ok(SweepEnd::Cancelled);
            }
        }

        Ok(SweepEnd::Completed)
    }
}
