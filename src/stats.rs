//! Run statistics and export.
//!
//! A [`SimulationReport`] is a snapshot of a finished (or paused) run: the
//! time-weighted occupancy distribution of every station, its losses and
//! traffic counters, and bounded arrival/departure traces. Reports export to
//! JSON, CSV and a human-readable summary.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::scheduler::SchedulerStats;
use crate::simulation::Termination;
use crate::station::Station;
use crate::types::{Interval, SimTime, StationId};

/// Share of the run spent at one occupancy level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OccupancyShare {
    /// Number of clients present
    pub length: usize,
    /// Total time spent at this length
    pub time: SimTime,
    /// `time / total_time`, or 0 when no time has elapsed
    pub probability: f64,
}

/// Statistics for a single station.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationReport {
    pub id: StationId,

    /// Kendall notation, e.g. `G/G/2/5`
    pub kendall: String,

    pub servers: usize,

    /// `None` when unbounded
    pub capacity: Option<usize>,

    /// Exogenous inter-arrival range, if the station has one
    pub arrival: Option<Interval>,

    pub service: Interval,

    /// Occupancy distribution, one row per level
    pub distribution: Vec<OccupancyShare>,

    /// Time-weighted mean number of clients present
    pub mean_occupancy: f64,

    /// Clients present when the run stopped
    pub final_occupancy: usize,

    /// Arrivals seen, exogenous and routed
    pub arrival_attempts: u64,

    /// Arrivals admitted
    pub admitted: u64,

    /// Arrivals rejected because the station was full
    pub losses: u64,

    /// Services completed
    pub departures: u64,

    /// Departures routed to another station
    pub forwarded: u64,

    /// Departures that left the network
    pub exited: u64,

    /// Admitted arrival timestamps, possibly truncated
    pub arrival_trace: Vec<SimTime>,

    /// Departure timestamps, possibly truncated
    pub departure_trace: Vec<SimTime>,
}

impl StationReport {
    /// Snapshots `station` after `total_time` units of simulated time.
    pub fn from_station(station: &Station, total_time: SimTime) -> Self {
        let spec = station.spec();
        let distribution = station
            .state_times()
            .iter()
            .enumerate()
            .map(|(length, &time)| OccupancyShare {
                length,
                time,
                probability: if total_time > 0.0 { time / total_time } else { 0.0 },
            })
            .collect();

        Self {
            id: station.id(),
            kendall: spec.kendall(),
            servers: spec.servers,
            capacity: spec.capacity.limit(),
            arrival: spec.arrival,
            service: spec.service,
            distribution,
            mean_occupancy: station.mean_occupancy(total_time),
            final_occupancy: station.occupancy(),
            arrival_attempts: station.arrival_attempts(),
            admitted: station.admitted(),
            losses: station.losses(),
            departures: station.departures(),
            forwarded: station.forwarded(),
            exited: station.exited(),
            arrival_trace: station.arrival_log().to_vec(),
            departure_trace: station.departure_log().to_vec(),
        }
    }

    /// Fraction of arrival attempts that were lost.
    pub fn loss_ratio(&self) -> f64 {
        if self.arrival_attempts == 0 {
            0.0
        } else {
            self.losses as f64 / self.arrival_attempts as f64
        }
    }

    /// Probability of finding `length` clients at the station.
    pub fn probability(&self, length: usize) -> f64 {
        self.distribution
            .get(length)
            .map_or(0.0, |share| share.probability)
    }
}

/// Metadata about the run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Run name/description
    pub name: String,

    /// Seed of the variate source, when known
    pub seed: Option<u64>,

    /// Crate version that produced the report
    pub version: String,

    /// Wall-clock duration of the run in milliseconds
    pub wall_time_ms: Option<f64>,
}

/// Aggregate statistics for a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub metadata: ReportMetadata,

    /// Final value of the global clock
    pub total_time: SimTime,

    pub variates_used: u64,

    pub variate_budget: u64,

    /// Events dispatched by the scheduler
    pub events: SchedulerStats,

    /// Why the run stopped; `None` if it has not finished
    pub termination: Option<Termination>,

    pub stations: Vec<StationReport>,
}

impl SimulationReport {
    /// Sets the run name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = name.into();
        self
    }

    /// Records the wall-clock duration of the run.
    pub fn with_wall_time(mut self, wall_time_ms: f64) -> Self {
        self.metadata.wall_time_ms = Some(wall_time_ms);
        self
    }

    /// Keeps at most `limit` entries in every station trace.
    pub fn truncate_traces(&mut self, limit: usize) {
        for station in &mut self.stations {
            station.arrival_trace.truncate(limit);
            station.departure_trace.truncate(limit);
        }
    }

    pub fn station(&self, id: StationId) -> Option<&StationReport> {
        self.stations.get(id)
    }

    /// Losses summed over all stations.
    pub fn total_losses(&self) -> u64 {
        self.stations.iter().map(|s| s.losses).sum()
    }

    /// Exports the report to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports the report to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Exports per-station summary statistics to CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("station,kendall,arrival_attempts,admitted,losses,departures,forwarded,exited,mean_occupancy\n");

        for s in &self.stations {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{:.6}\n",
                s.id,
                s.kendall,
                s.arrival_attempts,
                s.admitted,
                s.losses,
                s.departures,
                s.forwarded,
                s.exited,
                s.mean_occupancy,
            ));
        }

        csv
    }

    /// Exports the occupancy distributions to CSV, one row per station and level.
    pub fn distribution_to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("station,length,time,probability\n");

        for s in &self.stations {
            for share in &s.distribution {
                csv.push_str(&format!(
                    "{},{},{:.6},{:.6}\n",
                    s.id, share.length, share.time, share.probability
                ));
            }
        }

        csv
    }

    /// Exports per-station CSV to a file.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }

    /// Writes a human-readable summary to a writer.
    ///
    /// At most `trace` entries of each station's traces are printed.
    pub fn write_summary<W: Write>(&self, mut w: W, trace: usize) -> std::io::Result<()> {
        writeln!(w, "=== Simulation Results ===")?;
        writeln!(w)?;

        if !self.metadata.name.is_empty() {
            writeln!(w, "Name: {}", self.metadata.name)?;
        }
        if let Some(seed) = self.metadata.seed {
            writeln!(w, "Seed: {}", seed)?;
        }
        writeln!(w, "Total simulation time: {:.2}", self.total_time)?;
        writeln!(
            w,
            "Variates used: {} / {}",
            self.variates_used, self.variate_budget
        )?;
        writeln!(
            w,
            "Events: {} arrivals, {} departures",
            self.events.arrivals, self.events.departures
        )?;
        if let Some(termination) = self.termination {
            writeln!(w, "Stopped: {}", termination)?;
        }
        if let Some(ms) = self.metadata.wall_time_ms {
            writeln!(w, "Wall time: {:.2} ms", ms)?;
        }
        writeln!(w)?;

        for s in &self.stations {
            writeln!(w, "--- Station {} ({}) ---", s.id, s.kendall)?;
            if let Some(arrival) = s.arrival {
                writeln!(w, "Arrivals:   {}", arrival)?;
            }
            writeln!(w, "Service:    {}", s.service)?;
            writeln!(w, "{:>8}  {:>14}  {:>11}", "Length", "Time", "Probability")?;
            for share in &s.distribution {
                writeln!(
                    w,
                    "{:>8}  {:>14.2}  {:>10.2}%",
                    share.length,
                    share.time,
                    share.probability * 100.0
                )?;
            }
            writeln!(w, "Mean occupancy: {:.4}", s.mean_occupancy)?;
            writeln!(
                w,
                "Arrivals: {} ({} admitted), departures: {} ({} forwarded, {} exited)",
                s.arrival_attempts, s.admitted, s.departures, s.forwarded, s.exited
            )?;
            writeln!(w, "Losses: {}", s.losses)?;
            if trace > 0 {
                writeln!(w, "Arrival trace: {}", format_trace(&s.arrival_trace, trace))?;
                writeln!(w, "Departure trace: {}", format_trace(&s.departure_trace, trace))?;
            }
            writeln!(w)?;
        }

        writeln!(w, "Total losses: {}", self.total_losses())?;
        Ok(())
    }

    /// Returns the summary as a string, without traces.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_summary(&mut buf, 0);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn format_trace(trace: &[SimTime], limit: usize) -> String {
    let shown: Vec<String> = trace.iter().take(limit).map(|t| format!("{:.2}", t)).collect();
    if trace.len() > limit {
        format!("{} ... ({} more)", shown.join(", "), trace.len() - limit)
    } else {
        shown.join(", ")
    }
}

/// A simple timer for measuring wall-clock time.
#[derive(Debug)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Starts a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}
