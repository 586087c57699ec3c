//! Probabilistic routing between stations.
//!
//! When a client finishes service, the routing table picks where it goes
//! next: another station, or out of the network. Each source station has a
//! list of `(target, cumulative threshold)` hops built once, in ascending
//! target order, and closed by an exit sentinel at threshold 1. A variate
//! `v` selects the first hop whose threshold exceeds it.
//!
//! # Example
//!
//! ```
//! use qnetsim::routing::{Route, RoutingTable};
//!
//! let table = RoutingTable::new(3, &[
//!     Route::new(0, 1, 0.5),
//!     Route::new(0, 2, 0.3),
//! ]).unwrap();
//!
//! assert_eq!(table.route(0, 0.10), Some(1));
//! assert_eq!(table.route(0, 0.60), Some(2));
//! assert_eq!(table.route(0, 0.95), None); // leaves the network
//! assert_eq!(table.route(2, 0.00), None); // no outgoing edges
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, PROBABILITY_EPSILON};
use crate::types::StationId;

/// A routing edge: a client leaving `source` goes to `target` with
/// `probability`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub source: StationId,
    pub target: StationId,
    pub probability: f64,
}

impl Route {
    pub fn new(source: StationId, target: StationId, probability: f64) -> Self {
        Self {
            source,
            target,
            probability,
        }
    }
}

/// One precomputed choice. `target == None` is the exit sentinel.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Hop {
    target: Option<StationId>,
    probability: f64,
    threshold: f64,
}

/// Per-source cumulative routing thresholds.
#[derive(Clone, Debug)]
pub struct RoutingTable {
    hops: Vec<Vec<Hop>>,
}

impl RoutingTable {
    /// Builds the table for a network of `stations` stations.
    ///
    /// Fails if a route names an unknown station, has a probability outside
    /// `[0, 1]`, is declared twice, or if a source's probabilities add up to
    /// more than 1. Whatever probability is left over means leaving the
    /// network.
    pub fn new(stations: usize, routes: &[Route]) -> Result<Self, TopologyError> {
        let mut outgoing: Vec<Vec<(StationId, f64)>> = vec![Vec::new(); stations];

        for route in routes {
            if route.source >= stations || route.target >= stations {
                return Err(TopologyError::UnknownStation {
                    origin: route.source,
                    target: route.target,
                    stations,
                });
            }
            if !(0.0..=1.0).contains(&route.probability) {
                return Err(TopologyError::InvalidProbability {
                    origin: route.source,
                    target: route.target,
                    probability: route.probability,
                });
            }
            let edges = &mut outgoing[route.source];
            if edges.iter().any(|(target, _)| *target == route.target) {
                return Err(TopologyError::DuplicateRoute {
                    origin: route.source,
                    target: route.target,
                });
            }
            edges.push((route.target, route.probability));
        }

        let mut hops = Vec::with_capacity(stations);
        for (source, mut edges) in outgoing.into_iter().enumerate() {
            edges.sort_by_key(|(target, _)| *target);

            let total: f64 = edges.iter().map(|(_, p)| p).sum();
            if total > 1.0 + PROBABILITY_EPSILON {
                return Err(TopologyError::ProbabilityOverflow {
                    origin: source,
                    total,
                });
            }

            let mut cumulative = 0.0;
            let mut list: Vec<Hop> = edges
                .into_iter()
                .filter(|(_, p)| *p > 0.0)
                .map(|(target, probability)| {
                    cumulative = (cumulative + probability).min(1.0);
                    Hop {
                        target: Some(target),
                        probability,
                        threshold: cumulative,
                    }
                })
                .collect();
            list.push(Hop {
                target: None,
                probability: 1.0 - cumulative,
                threshold: 1.0,
            });
            hops.push(list);
        }

        Ok(Self { hops })
    }

    /// A table where every client leaves the network after one service.
    pub fn exits_only(stations: usize) -> Self {
        Self {
            hops: vec![
                vec![Hop {
                    target: None,
                    probability: 1.0,
                    threshold: 1.0,
                }];
                stations
            ],
        }
    }

    /// Number of stations covered.
    pub fn station_count(&self) -> usize {
        self.hops.len()
    }

    /// Picks the destination of a client leaving `source`, given a variate
    /// `v` in `[0, 1)`. `None` means the client leaves the network.
    pub fn route(&self, source: StationId, v: f64) -> Option<StationId> {
        self.hops
            .get(source)?
            .iter()
            .find(|hop| v < hop.threshold)
            .and_then(|hop| hop.target)
    }

    /// Probability that a client leaving `source` exits the network.
    pub fn exit_probability(&self, source: StationId) -> f64 {
        self.hops
            .get(source)
            .and_then(|list| list.last())
            .map_or(1.0, |sentinel| sentinel.probability.max(0.0))
    }

    /// `(target, probability)` pairs for `source`, in routing order.
    pub fn targets(&self, source: StationId) -> Vec<(StationId, f64)> {
        self.hops
            .get(source)
            .map(|list| {
                list.iter()
                    .filter_map(|hop| hop.target.map(|target| (target, hop.probability)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
