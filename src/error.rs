//! Error types shared across the simulator.
//!
//! Only malformed topologies are errors. Losses, budget exhaustion and
//! quiescence are ordinary outcomes of a run and are reported as such.

use thiserror::Error;

use crate::types::StationId;

/// Tolerance used when checking that outgoing probabilities sum to at most 1.
pub const PROBABILITY_EPSILON: f64 = 1e-9;

/// A network topology that cannot be simulated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("network has no stations")]
    NoStations,

    #[error("station {station}: servers must be positive")]
    NoServers { station: StationId },

    #[error("invalid interval [{min}, {max}]: {reason}")]
    InvalidInterval {
        min: f64,
        max: f64,
        reason: &'static str,
    },

    #[error("first arrival at {time}: must be a finite, non-negative time")]
    InvalidFirstArrival { time: f64 },

    #[error("station {station}: {source}")]
    Station {
        station: StationId,
        #[source]
        source: Box<TopologyError>,
    },

    #[error("route {origin} -> {target}: unknown station (network has {stations})")]
    UnknownStation {
        origin: StationId,
        target: StationId,
        stations: usize,
    },

    #[error("route {origin} -> {target}: probability {probability} outside [0, 1]")]
    InvalidProbability {
        origin: StationId,
        target: StationId,
        probability: f64,
    },

    #[error("route {origin} -> {target} declared more than once")]
    DuplicateRoute { origin: StationId, target: StationId },

    #[error("station {origin}: outgoing probabilities sum to {total:.6}, more than 1")]
    ProbabilityOverflow { origin: StationId, total: f64 },
}

impl TopologyError {
    /// Attaches the offending station to a nested error.
    pub fn at_station(self, station: StationId) -> Self {
        TopologyError::Station {
            station,
            source: Box::new(self),
        }
    }
}

/// The variate budget has been consumed.
///
/// This is the normal stopping signal of a run, not a failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("variate budget of {budget} exhausted")]
pub struct VariatesExhausted {
    pub budget: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = TopologyError::ProbabilityOverflow {
            origin: 2,
            total: 1.25,
        };
        assert_eq!(
            e.to_string(),
            "station 2: outgoing probabilities sum to 1.250000, more than 1"
        );

        let e = TopologyError::InvalidInterval {
            min: 3.0,
            max: 1.0,
            reason: "min must not exceed max",
        }
        .at_station(1);
        assert!(e.to_string().starts_with("station 1: invalid interval"));
    }

    #[test]
    fn test_exhausted_display() {
        let e = VariatesExhausted { budget: 10 };
        assert_eq!(e.to_string(), "variate budget of 10 exhausted");
    }
}
