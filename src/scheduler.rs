//! Global event ordering.
//!
//! There is no event queue. Every station already knows its next exogenous
//! arrival and its earliest service completion, so the next global event is
//! simply the minimum over all stations' armed timers. Scanning the stations
//! keeps the scheduler stateless with respect to the model: a timer that a
//! station re-arms or disarms is seen on the next scan without any
//! cancellation bookkeeping.
//!
//! # Ordering
//!
//! Candidates are compared by time, then kind (arrival before departure),
//! then station id. Identical inputs therefore always produce the same
//! dispatch order.

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind};
use crate::station::Station;
use crate::types::SimTime;

/// Anything that can offer its earliest pending event.
pub trait EventSource {
    /// The earliest armed timer, or `None` when every timer is at infinity.
    fn next_event(&self) -> Option<Event>;
}

impl EventSource for Station {
    fn next_event(&self) -> Option<Event> {
        Station::next_event(self)
    }
}

/// Dispatch counters kept by the scheduler.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Exogenous arrivals dispatched
    pub arrivals: u64,
    /// Departures dispatched
    pub departures: u64,
}

impl SchedulerStats {
    /// Total events dispatched.
    pub fn total(&self) -> u64 {
        self.arrivals + self.departures
    }
}

/// Selects the globally earliest event across a set of stations.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    stats: SchedulerStats,
    last_time: SimTime,
}

impl Scheduler {
    /// Creates a scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the earliest event without dispatching it.
    ///
    /// Returns `None` at quiescence.
    pub fn peek<S: EventSource>(&self, sources: &[S]) -> Option<Event> {
        sources.iter().filter_map(EventSource::next_event).min()
    }

    /// Returns the earliest event and records it as dispatched.
    pub fn pop<S: EventSource>(&mut self, sources: &[S]) -> Option<Event> {
        let event = self.peek(sources)?;
        debug_assert!(
            event.time >= self.last_time,
            "event at t={} dispatched after t={}",
            event.time,
            self.last_time
        );
        self.last_time = event.time;
        match event.kind {
            EventKind::Arrival => self.stats.arrivals += 1,
            EventKind::Departure => self.stats.departures += 1,
        }
        Some(event)
    }

    /// Time of the last dispatched event.
    pub fn last_time(&self) -> SimTime {
        self.last_time
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }
}
