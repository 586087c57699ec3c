//! # qnetsim
//!
//! A discrete-event simulator for open networks of G/G/c/K queueing
//! stations with probabilistic routing.
//!
//! ## Model
//!
//! - **Stations**: `c` parallel servers, room for `K` clients (or unbounded),
//!   uniformly distributed inter-arrival and service times. Clients arriving
//!   at a full station are lost.
//! - **Routing**: a client finishing service moves to another station with a
//!   configured probability, or leaves the network with the remainder.
//! - **Time**: a single global clock jumps from event to event. The next
//!   event is the earliest armed timer across all stations.
//! - **Budget**: every random decision consumes one variate; the run stops
//!   when the budget is spent or nothing is left to happen.
//!
//! The main output is, for every station, the share of time it spent with
//! each number of clients, plus its loss count.
//!
//! ## Features
//!
//! - `parallel` - Run independent replications in parallel using rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use qnetsim::{NetworkConfig, Simulation};
//!
//! let mut config = NetworkConfig::example();
//! config.simulation.max_variates = 10_000;
//! config.simulation.seed = Some(42);
//!
//! let mut sim = Simulation::from_config(&config).unwrap();
//! sim.run();
//!
//! let report = sim.report();
//! for station in &report.stations {
//!     println!("{}: {} losses", station.kendall, station.losses);
//! }
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use qnetsim::config::NetworkConfig;
//!
//! let config = NetworkConfig::from_file("configs.yaml")?;
//! let mut sim = qnetsim::Simulation::from_config(&config)?;
//! ```

pub mod types;
pub mod error;
pub mod event;
pub mod variate;
pub mod station;
pub mod routing;
pub mod scheduler;
pub mod network;
pub mod simulation;
pub mod config;
pub mod stats;
pub mod replication;

// Re-export commonly used types
pub use types::{Capacity, Interval, SimTime, StationId};
pub use error::{TopologyError, VariatesExhausted};
pub use event::{Event, EventKind};
pub use variate::{ScriptedVariates, SeededVariates, VariateSource};
pub use station::{Admission, Origin, Station, StationSpec};
pub use routing::{Route, RoutingTable};
pub use scheduler::{EventSource, Scheduler, SchedulerStats};
pub use network::Network;
pub use simulation::{Simulation, Step, Termination};
pub use config::{ConfigError, NetworkConfig, NetworkConfigBuilder, StationConfig};
pub use stats::{SimulationReport, StationReport, Timer};
pub use replication::{ReplicationRunner, ReplicationSummary};

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `level`. Does nothing if a subscriber
/// is already installed.
///
/// # Example
///
/// ```rust,ignore
/// qnetsim::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .try_init();
}
