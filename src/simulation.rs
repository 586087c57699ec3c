//! Simulation driver.
//!
//! The `Simulation` owns the stations, the variate source and the global
//! clock. Each step asks the scheduler for the globally earliest event,
//! credits the elapsed time to every station's current occupancy level, and
//! applies the event:
//!
//! - an **arrival** goes to its station as an exogenous client;
//! - a **departure** completes a service, draws a routing variate and, if a
//!   target is chosen, hands the client to that station at the same instant.
//!
//! The run stops when the variate budget is spent or when no timer is armed
//! anywhere in the network.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ConfigResult, NetworkConfig};
use crate::event::{Event, EventKind};
use crate::network::Network;
use crate::routing::RoutingTable;
use crate::scheduler::{Scheduler, SchedulerStats};
use crate::station::{Origin, Station};
use crate::stats::{ReportMetadata, SimulationReport, StationReport};
use crate::types::{SimTime, StationId};
use crate::variate::{SeededVariates, VariateSource};

/// Why a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The variate budget was spent.
    VariatesExhausted,
    /// No station had an armed timer.
    Quiescent,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::VariatesExhausted => write!(f, "variate budget exhausted"),
            Termination::Quiescent => write!(f, "no pending events"),
        }
    }
}

/// Outcome of a single [`Simulation::step`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// An event was applied.
    Dispatched(Event),
    /// The run is over; further steps return the same reason.
    Finished(Termination),
}

/// A queueing network simulation.
///
/// # Example
///
/// ```
/// use qnetsim::network::Network;
/// use qnetsim::routing::Route;
/// use qnetsim::simulation::{Simulation, Termination};
/// use qnetsim::station::StationSpec;
/// use qnetsim::types::{Capacity, Interval};
/// use qnetsim::variate::SeededVariates;
///
/// let network = Network::new(
///     vec![
///         StationSpec::new(1, Capacity::Bounded(3), Interval::new(2.0, 4.0))
///             .with_arrivals(Interval::new(1.0, 3.0)),
///         StationSpec::new(2, Capacity::Unbounded, Interval::new(1.0, 2.0)),
///     ],
///     vec![Route::new(0, 1, 0.5)],
/// )
/// .unwrap();
///
/// let mut sim = Simulation::new(network, SeededVariates::new(1_000, 7));
/// assert_eq!(sim.run(), Termination::VariatesExhausted);
///
/// let report = sim.report();
/// assert_eq!(report.variates_used, 1_000);
/// ```
pub struct Simulation<V: VariateSource = SeededVariates> {
    network: Network,
    stations: Vec<Station>,
    scheduler: Scheduler,
    variates: V,
    clock: SimTime,
    termination: Option<Termination>,
    routed: u64,
}

impl Simulation<SeededVariates> {
    /// Validates `config` and builds a simulation from it.
    ///
    /// Uses the configured seed, or a fresh one from OS entropy.
    pub fn from_config(config: &NetworkConfig) -> ConfigResult<Self> {
        let network = config.build()?;
        let budget = config.simulation.max_variates;
        let variates = match config.simulation.seed {
            Some(seed) => SeededVariates::new(budget, seed),
            None => SeededVariates::from_entropy(budget),
        };
        Ok(Self::new(network, variates))
    }
}

impl<V: VariateSource> Simulation<V> {
    /// Creates a simulation at time zero with every station empty.
    pub fn new(network: Network, variates: V) -> Self {
        let stations = network.instantiate();
        Self {
            network,
            stations,
            scheduler: Scheduler::new(),
            variates,
            clock: 0.0,
            termination: None,
            routed: 0,
        }
    }

    /// Current value of the global clock.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn routing(&self) -> &RoutingTable {
        self.network.routing()
    }

    pub fn variates(&self) -> &V {
        &self.variates
    }

    /// Events dispatched so far, by kind.
    pub fn events(&self) -> &SchedulerStats {
        self.scheduler.stats()
    }

    /// Clients handed from one station to another so far.
    pub fn routed(&self) -> u64 {
        self.routed
    }

    /// Why the run stopped, once it has.
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn is_finished(&self) -> bool {
        self.termination.is_some()
    }

    /// The event the next step would apply, if any.
    pub fn peek(&self) -> Option<Event> {
        if self.termination.is_some() || self.variates.is_exhausted() {
            return None;
        }
        self.scheduler.peek(&self.stations)
    }

    /// Applies the next event.
    pub fn step(&mut self) -> Step {
        if let Some(reason) = self.termination {
            return Step::Finished(reason);
        }
        if self.variates.is_exhausted() {
            return self.finish(Termination::VariatesExhausted);
        }
        let Some(event) = self.scheduler.pop(&self.stations) else {
            return self.finish(Termination::Quiescent);
        };

        self.advance_to(event.time);
        match event.kind {
            EventKind::Arrival => {
                self.stations[event.station].arrive(event.time, Origin::Exogenous, &mut self.variates);
            }
            EventKind::Departure => self.complete_service(event.station, event.time),
        }

        tracing::trace!(
            time = event.time,
            station = event.station,
            kind = %event.kind,
            used = self.variates.used(),
            "event dispatched"
        );
        Step::Dispatched(event)
    }

    /// Runs until the budget is spent or the network goes quiet.
    pub fn run(&mut self) -> Termination {
        tracing::info!(
            stations = self.stations.len(),
            budget = self.variates.budget(),
            seed = ?self.variates.seed(),
            "simulation started"
        );
        loop {
            if let Step::Finished(reason) = self.step() {
                return reason;
            }
        }
    }

    /// Snapshots the statistics collected so far.
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            metadata: ReportMetadata {
                name: String::new(),
                seed: self.variates.seed(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                wall_time_ms: None,
            },
            total_time: self.clock,
            variates_used: self.variates.used(),
            variate_budget: self.variates.budget(),
            events: self.scheduler.stats().clone(),
            termination: self.termination,
            stations: self
                .stations
                .iter()
                .map(|station| StationReport::from_station(station, self.clock))
                .collect(),
        }
    }

    /// Moves the clock to `time`, crediting the elapsed interval to every
    /// station's current occupancy level.
    fn advance_to(&mut self, time: SimTime) {
        let elapsed = time - self.clock;
        for station in &mut self.stations {
            station.accumulate(elapsed);
        }
        self.clock = time;
    }

    fn complete_service(&mut self, id: StationId, time: SimTime) {
        self.stations[id].depart(time, &mut self.variates);

        // Without a routing variate the client leaves the network.
        let target = match self.variates.next() {
            Ok(v) => self.network.routing().route(id, v),
            Err(_) => None,
        };
        self.stations[id].record_destination(target);

        if let Some(target) = target {
            self.routed += 1;
            self.stations[target].arrive(time, Origin::Routed, &mut self.variates);
        }
    }

    fn finish(&mut self, reason: Termination) -> Step {
        self.termination = Some(reason);
        tracing::info!(
            time = self.clock,
            used = self.variates.used(),
            events = self.scheduler.stats().total(),
            losses = self.stations.iter().map(Station::losses).sum::<u64>(),
            %reason,
            "simulation finished"
        );
        Step::Finished(reason)
    }
}
