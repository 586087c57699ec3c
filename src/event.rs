//! Event definitions for the simulator.
//!
//! An event is a station timer that has come due: either the station's next
//! exogenous arrival or the completion of a service. Routed arrivals are not
//! events of their own; they happen inside the departure that causes them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::types::{SimTime, StationId};

/// What kind of timer fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A client enters the station from outside the network.
    Arrival,
    /// A client finishes service and leaves the station.
    Departure,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Arrival => write!(f, "arrival"),
            EventKind::Departure => write!(f, "departure"),
        }
    }
}

/// A dispatched event.
///
/// Events order by time, then kind (arrivals first), then station id, which
/// is the scheduler's tie-break.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Event {
    /// When the event occurs
    pub time: SimTime,
    /// The station owning the timer
    pub station: StationId,
    /// Arrival or departure
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event.
    pub fn new(time: SimTime, station: StationId, kind: EventKind) -> Self {
        Self {
            time,
            station,
            kind,
        }
    }

    /// Creates an arrival event.
    pub fn arrival(time: SimTime, station: StationId) -> Self {
        Self::new(time, station, EventKind::Arrival)
    }

    /// Creates a departure event.
    pub fn departure(time: SimTime, station: StationId) -> Self {
        Self::new(time, station, EventKind::Departure)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.kind.cmp(&other.kind))
            .then(self.station.cmp(&other.station))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at station {} (t={:.4})", self.kind, self.station, self.time)
    }
}
