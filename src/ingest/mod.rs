//! Acquisition and ingestion
//!
//! # Components
//!
//! - [`ConnectionManager`] - Owns the protocol session and the store connection
//! - [`NodeResolver`] - Walks a display-name path to the machine node
//! - [`Sampler`] - Lazily reads every qualifying variable of the machine
//! - [`PollLoop`] - Bootstraps, resolves, then sweeps on a fixed interval
//! - [`Shutdown`] - Cooperative cancellation shared with the signal handler

pub mod connection;
pub mod poll_loop;
pub mod resolver;
pub mod sampler;
pub mod shutdown;

pub use connection::{connect_first, ConnectionManager};
pub use poll_loop::{PollLoop, PollState, RunSummary};
pub use resolver::NodeResolver;
pub use sampler::{is_sampled, Sampler, Sweep, RESERVED_PREFIX};
pub use shutdown::Shutdown;
