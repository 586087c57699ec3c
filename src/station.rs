//! Queueing stations.
//!
//! A station is a G/G/c/K node: uniformly distributed inter-arrival and
//! service times, `c` parallel servers and room for `K` clients in total.
//! Each station is a local state machine driven by the simulation: it owns
//! its timers, its occupancy and the time it has spent at each occupancy
//! level, and it consumes variates only when a timer has to be armed.
//!
//! Busy servers each hold their own completion time. The station's departure
//! candidate is the earliest of them, and an idle server never departs.

use serde::{Deserialize, Serialize};

use crate::error::TopologyError;
use crate::event::Event;
use crate::types::{Capacity, Interval, SimTime, StationId};
use crate::variate::VariateSource;

/// Static parameters of a station.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationSpec {
    /// Number of parallel servers
    pub servers: usize,
    /// Maximum number of clients held, waiting and in service
    pub capacity: Capacity,
    /// Inter-arrival range for exogenous clients; `None` means the station
    /// only receives routed clients
    pub arrival: Option<Interval>,
    /// Service time range
    pub service: Interval,
    /// Time of the first exogenous arrival, overriding the network default
    pub first_arrival: Option<SimTime>,
}

impl StationSpec {
    /// Creates a spec for a station fed only by routed clients.
    pub fn new(servers: usize, capacity: Capacity, service: Interval) -> Self {
        Self {
            servers,
            capacity,
            arrival: None,
            service,
            first_arrival: None,
        }
    }

    /// Adds an exogenous arrival process.
    pub fn with_arrivals(mut self, arrival: Interval) -> Self {
        self.arrival = Some(arrival);
        self
    }

    /// Sets the time of the first exogenous arrival.
    pub fn with_first_arrival(mut self, time: SimTime) -> Self {
        self.first_arrival = Some(time);
        self
    }

    /// Checks the parameters of station `id`.
    pub fn validate(&self, id: StationId) -> Result<(), TopologyError> {
        if self.servers == 0 {
            return Err(TopologyError::NoServers { station: id });
        }
        self.service.validate().map_err(|e| e.at_station(id))?;
        if let Some(arrival) = &self.arrival {
            arrival.validate().map_err(|e| e.at_station(id))?;
            if arrival.max <= 0.0 {
                return Err(TopologyError::InvalidInterval {
                    min: arrival.min,
                    max: arrival.max,
                    reason: "arrival interval must have a positive upper bound",
                }
                .at_station(id));
            }
        }
        if let Some(first) = self.first_arrival {
            if !first.is_finite() || first < 0.0 {
                return Err(TopologyError::InvalidFirstArrival { time: first }.at_station(id));
            }
        }
        Ok(())
    }

    /// Kendall notation, e.g. `G/G/2/5`, or `G/G/1` when unbounded.
    pub fn kendall(&self) -> String {
        match self.capacity {
            Capacity::Bounded(limit) => format!("G/G/{}/{}", self.servers, limit),
            Capacity::Unbounded => format!("G/G/{}", self.servers),
        }
    }
}

/// Where a client entering a station comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// From outside the network; reschedules the station's arrival timer.
    Exogenous,
    /// Forwarded by another station (or the same one).
    Routed,
}

/// Outcome of an arrival.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The client joined the station, in service or waiting.
    Admitted,
    /// The station was full and the client was discarded.
    Lost,
}

/// A queueing station and its run-time state.
#[derive(Clone, Debug)]
pub struct Station {
    id: StationId,
    spec: StationSpec,
    occupancy: usize,
    next_arrival: SimTime,
    /// Completion times of the clients currently in service.
    in_service: Vec<SimTime>,
    /// Accumulated time at each occupancy level.
    state_times: Vec<SimTime>,
    losses: u64,
    arrival_attempts: u64,
    departures: u64,
    forwarded: u64,
    exited: u64,
    trace_limit: usize,
    arrival_log: Vec<SimTime>,
    departure_log: Vec<SimTime>,
}

impl Station {
    /// Creates an empty station.
    ///
    /// If the station has an arrival process its first exogenous arrival is
    /// set to `spec.first_arrival`, falling back to `default_first_arrival`.
    /// At most `trace_limit` timestamps are kept in each event log.
    pub fn new(
        id: StationId,
        spec: StationSpec,
        default_first_arrival: SimTime,
        trace_limit: usize,
    ) -> Self {
        let next_arrival = match spec.arrival {
            Some(_) => spec.first_arrival.unwrap_or(default_first_arrival),
            None => SimTime::INFINITY,
        };

        Self {
            id,
            in_service: Vec::with_capacity(spec.servers),
            spec,
            occupancy: 0,
            next_arrival,
            state_times: vec![0.0],
            losses: 0,
            arrival_attempts: 0,
            departures: 0,
            forwarded: 0,
            exited: 0,
            trace_limit,
            arrival_log: Vec::new(),
            departure_log: Vec::new(),
        }
    }

    pub fn id(&self) -> StationId {
        self.id
    }

    pub fn spec(&self) -> &StationSpec {
        &self.spec
    }

    pub fn servers(&self) -> usize {
        self.spec.servers
    }

    pub fn capacity(&self) -> Capacity {
        self.spec.capacity
    }

    /// Clients currently present, waiting or in service.
    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    /// Clients currently being served.
    pub fn in_service(&self) -> usize {
        self.in_service.len()
    }

    /// Clients waiting for a server.
    pub fn waiting(&self) -> usize {
        self.occupancy - self.in_service.len()
    }

    /// Clients rejected because the station was full.
    pub fn losses(&self) -> u64 {
        self.losses
    }

    /// Arrivals seen, exogenous and routed, admitted or lost.
    pub fn arrival_attempts(&self) -> u64 {
        self.arrival_attempts
    }

    /// Arrivals that were admitted.
    pub fn admitted(&self) -> u64 {
        self.arrival_attempts - self.losses
    }

    /// Completed services.
    pub fn departures(&self) -> u64 {
        self.departures
    }

    /// Departing clients sent on to another station.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Departing clients that left the network.
    pub fn exited(&self) -> u64 {
        self.exited
    }

    pub fn arrival_log(&self) -> &[SimTime] {
        &self.arrival_log
    }

    pub fn departure_log(&self) -> &[SimTime] {
        &self.departure_log
    }

    /// Time spent at each occupancy level, indexed by level.
    pub fn state_times(&self) -> &[SimTime] {
        &self.state_times
    }

    /// Total time accounted for across all levels.
    pub fn accounted_time(&self) -> SimTime {
        self.state_times.iter().sum()
    }

    /// Time-weighted mean number of clients present over `total` time.
    pub fn mean_occupancy(&self, total: SimTime) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        self.state_times
            .iter()
            .enumerate()
            .map(|(level, time)| level as f64 * time)
            .sum::<f64>()
            / total
    }

    /// Scheduled exogenous arrival, or infinity.
    pub fn next_arrival_time(&self) -> SimTime {
        self.next_arrival
    }

    /// Earliest pending service completion, or infinity when no server is busy.
    pub fn next_departure_time(&self) -> SimTime {
        self.in_service
            .iter()
            .copied()
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(SimTime::INFINITY)
    }

    /// This station's earliest candidate event, if any timer is armed.
    pub fn next_event(&self) -> Option<Event> {
        let arrival = self
            .next_arrival
            .is_finite()
            .then(|| Event::arrival(self.next_arrival, self.id));
        let departure = Some(self.next_departure_time())
            .filter(|t| t.is_finite())
            .map(|t| Event::departure(t, self.id));

        match (arrival, departure) {
            (Some(a), Some(d)) => Some(a.min(d)),
            (a, d) => a.or(d),
        }
    }

    /// Credits `elapsed` time to the current occupancy level. The table only
    /// grows to the levels actually reached, whatever the capacity.
    pub fn accumulate(&mut self, elapsed: SimTime) {
        if self.occupancy >= self.state_times.len() {
            self.state_times.resize(self.occupancy + 1, 0.0);
        }
        self.state_times[self.occupancy] += elapsed;
    }

    /// Applies an arrival at `time`.
    ///
    /// An exogenous arrival first schedules the next one, whether or not the
    /// client is admitted. An admitted client goes straight into service when
    /// a server is idle.
    pub fn arrive<V>(&mut self, time: SimTime, origin: Origin, variates: &mut V) -> Admission
    where
        V: VariateSource + ?Sized,
    {
        if origin == Origin::Exogenous {
            self.next_arrival = match self.spec.arrival {
                Some(interval) => match variates.uniform(interval) {
                    Ok(gap) => time + gap,
                    Err(_) => SimTime::INFINITY,
                },
                None => SimTime::INFINITY,
            };
        }

        self.arrival_attempts += 1;
        if self.spec.capacity.is_full(self.occupancy) {
            self.losses += 1;
            tracing::debug!(station = self.id, time, losses = self.losses, "client lost");
            return Admission::Lost;
        }

        self.occupancy += 1;
        if self.arrival_log.len() < self.trace_limit {
            self.arrival_log.push(time);
        }
        if self.in_service.len() < self.spec.servers {
            self.start_service(time, variates);
        }
        Admission::Admitted
    }

    /// Completes the earliest pending service at `time`.
    ///
    /// The freed server takes the next waiting client, if any. Returns
    /// `false` when no server was busy.
    pub fn depart<V>(&mut self, time: SimTime, variates: &mut V) -> bool
    where
        V: VariateSource + ?Sized,
    {
        let earliest = self
            .in_service
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(index, _)| index);
        let Some(index) = earliest else {
            return false;
        };

        self.in_service.swap_remove(index);
        self.occupancy -= 1;
        self.departures += 1;
        if self.departure_log.len() < self.trace_limit {
            self.departure_log.push(time);
        }

        if self.waiting() > 0 {
            self.start_service(time, variates);
        }
        true
    }

    /// Records where a departing client went.
    pub fn record_destination(&mut self, target: Option<StationId>) {
        match target {
            Some(_) => self.forwarded += 1,
            None => self.exited += 1,
        }
    }

    fn start_service<V>(&mut self, time: SimTime, variates: &mut V)
    where
        V: VariateSource + ?Sized,
    {
        match variates.uniform(self.spec.service) {
            Ok(duration) => self.in_service.push(time + duration),
            Err(_) => {
                tracing::trace!(station = self.id, time, "no variate left to start service");
            }
        }
    }
}
