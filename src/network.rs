//! Validated network topology.
//!
//! A `Network` is everything a simulation needs before it starts: station
//! parameters, the routing table and the run-wide defaults. It can only be
//! built from parameters that pass validation, so a simulation never runs on
//! a malformed topology.

use crate::error::TopologyError;
use crate::routing::{Route, RoutingTable};
use crate::station::{Station, StationSpec};
use crate::types::{SimTime, StationId};

/// Default time of the first exogenous arrival.
pub const DEFAULT_FIRST_ARRIVAL: SimTime = 2.0;

/// Default number of timestamps kept per station event log.
pub const DEFAULT_TRACE_LIMIT: usize = 1000;

/// Stations and routing, validated and ready to simulate.
#[derive(Clone, Debug)]
pub struct Network {
    specs: Vec<StationSpec>,
    routes: Vec<Route>,
    routing: RoutingTable,
    first_arrival: SimTime,
    trace_limit: usize,
}

impl Network {
    /// Validates `specs` and `routes` and builds the routing table.
    ///
    /// Station ids are positions in `specs`.
    pub fn new(specs: Vec<StationSpec>, routes: Vec<Route>) -> Result<Self, TopologyError> {
        if specs.is_empty() {
            return Err(TopologyError::NoStations);
        }
        for (id, spec) in specs.iter().enumerate() {
            spec.validate(id)?;
        }
        let routing = RoutingTable::new(specs.len(), &routes)?;

        Ok(Self {
            specs,
            routes,
            routing,
            first_arrival: DEFAULT_FIRST_ARRIVAL,
            trace_limit: DEFAULT_TRACE_LIMIT,
        })
    }

    /// Sets the default time of the first exogenous arrival.
    pub fn with_first_arrival(mut self, time: SimTime) -> Result<Self, TopologyError> {
        if !time.is_finite() || time < 0.0 {
            return Err(TopologyError::InvalidFirstArrival { time });
        }
        self.first_arrival = time;
        Ok(self)
    }

    /// Sets how many timestamps each station keeps per event log.
    pub fn with_trace_limit(mut self, limit: usize) -> Self {
        self.trace_limit = limit;
        self
    }

    pub fn station_count(&self) -> usize {
        self.specs.len()
    }

    pub fn specs(&self) -> &[StationSpec] {
        &self.specs
    }

    pub fn spec(&self, id: StationId) -> Option<&StationSpec> {
        self.specs.get(id)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn first_arrival(&self) -> SimTime {
        self.first_arrival
    }

    pub fn trace_limit(&self) -> usize {
        self.trace_limit
    }

    /// Creates fresh stations in their initial state.
    pub fn instantiate(&self) -> Vec<Station> {
        self.specs
            .iter()
            .enumerate()
            .map(|(id, spec)| Station::new(id, spec.clone(), self.first_arrival, self.trace_limit))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Capacity, Interval};

    fn specs() -> Vec<StationSpec> {
        vec![
            StationSpec::new(1, Capacity::Bounded(3), Interval::new(1.0, 2.0))
                .with_arrivals(Interval::new(1.0, 2.0)),
            StationSpec::new(2, Capacity::Unbounded, Interval::new(1.0, 2.0)),
        ]
    }

    #[test]
    fn test_network_creation() {
        let network = Network::new(specs(), vec![Route::new(0, 1, 0.7)]).unwrap();
        assert_eq!(network.station_count(), 2);
        assert_eq!(network.first_arrival(), DEFAULT_FIRST_ARRIVAL);
        assert_eq!(network.routing().route(0, 0.5), Some(1));

        let stations = network.instantiate();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].next_arrival_time(), DEFAULT_FIRST_ARRIVAL);
        assert!(stations[1].next_arrival_time().is_infinite());
    }

    #[test]
    fn test_first_arrival() {
        let network = Network::new(specs(), Vec::new())
            .unwrap()
            .with_first_arrival(0.0)
            .unwrap();
        assert_eq!(network.instantiate()[0].next_arrival_time(), 0.0);

        let network = Network::new(specs(), Vec::new()).unwrap();
        let err = network.with_first_arrival(-1.0).unwrap_err();
        assert_eq!(err, TopologyError::InvalidFirstArrival { time: -1.0 });
        assert!(!err.to_string().contains("interval"));
    }

    #[test]
    fn test_invalid_networks() {
        assert_eq!(
            Network::new(Vec::new(), Vec::new()).unwrap_err(),
            TopologyError::NoStations
        );

        let mut bad = specs();
        bad[1].servers = 0;
        assert_eq!(
            Network::new(bad, Vec::new()).unwrap_err(),
            TopologyError::NoServers { station: 1 }
        );

        let overflow = vec![Route::new(0, 1, 0.7), Route::new(0, 0, 0.4)];
        assert!(matches!(
            Network::new(specs(), overflow),
            Err(TopologyError::ProbabilityOverflow { origin: 0, .. })
        ));
    }
}
