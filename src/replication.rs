//! Independent replications of a network run.
//!
//! A `ReplicationRunner` builds the network once and runs it `n` times, each
//! run with its own variate source seeded `base_seed + i`. Runs share no
//! state, so they execute in parallel with rayon when the `parallel` feature
//! is enabled and sequentially otherwise. Reports always come back in
//! replication order.
//!
//! # Feature Flag
//!
//! Parallel execution requires the `parallel` feature:
//! ```toml
//! [dependencies]
//! qnetsim = { version = "0.1", features = ["parallel"] }
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::config::{ConfigResult, NetworkConfig};
use crate::network::Network;
use crate::simulation::Simulation;
use crate::stats::{SimulationReport, Timer};
use crate::types::SimTime;
use crate::variate::SeededVariates;

/// Runs several seeded simulations of the same network.
#[derive(Clone, Debug)]
pub struct ReplicationRunner {
    config: NetworkConfig,
    replications: usize,
    base_seed: u64,
    /// Number of worker threads (0 = auto)
    threads: usize,
}

impl ReplicationRunner {
    /// Creates a runner for a single replication.
    ///
    /// The base seed is the configured seed, or a fresh one from OS entropy.
    pub fn new(config: NetworkConfig) -> Self {
        let base_seed = config.simulation.seed.unwrap_or_else(rand::random);
        Self {
            config,
            replications: 1,
            base_seed,
            threads: 0,
        }
    }

    /// Sets the number of replications.
    pub fn replications(mut self, n: usize) -> Self {
        self.replications = n;
        self
    }

    /// Sets the seed of the first replication.
    pub fn base_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    /// Sets the number of worker threads. Ignored without the `parallel`
    /// feature.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn replication_count(&self) -> usize {
        self.replications
    }

    /// Seed used by replication `index`.
    pub fn seed_for(&self, index: usize) -> u64 {
        self.base_seed.wrapping_add(index as u64)
    }

    /// Validates the configuration and runs every replication.
    pub fn run(&self) -> ConfigResult<Vec<SimulationReport>> {
        let network = self.config.build()?;
        tracing::info!(
            replications = self.replications,
            base_seed = self.base_seed,
            threads = self.threads,
            "running replications"
        );
        Ok(self.run_all(&network))
    }

    #[cfg(not(feature = "parallel"))]
    fn run_all(&self, network: &Network) -> Vec<SimulationReport> {
        (0..self.replications)
            .map(|index| self.run_one(network, index))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn run_all(&self, network: &Network) -> Vec<SimulationReport> {
        let indices: Vec<usize> = (0..self.replications).collect();
        let work = || {
            indices
                .par_iter()
                .map(|&index| self.run_one(network, index))
                .collect()
        };

        if self.threads == 0 {
            return work();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(e) => {
                tracing::warn!(error = %e, "could not build thread pool, using the global one");
                work()
            }
        }
    }

    fn run_one(&self, network: &Network, index: usize) -> SimulationReport {
        let seed = self.seed_for(index);
        let timer = Timer::start();
        let variates = SeededVariates::new(self.config.simulation.max_variates, seed);
        let mut simulation = Simulation::new(network.clone(), variates);
        let termination = simulation.run();
        tracing::debug!(index, seed, %termination, "replication finished");

        simulation
            .report()
            .with_name(format!("replication {}", index))
            .with_wall_time(timer.elapsed_ms())
    }
}

/// Statistics aggregated over replications.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicationSummary {
    pub replications: usize,

    pub mean_total_time: SimTime,
    pub min_total_time: SimTime,
    pub max_total_time: SimTime,

    /// Mean losses, indexed by station
    pub mean_losses: Vec<f64>,

    /// Mean occupancy probability, indexed by station then length
    pub mean_distribution: Vec<Vec<f64>>,
}

impl ReplicationSummary {
    /// Aggregates `reports`. Returns `None` when there is nothing to
    /// aggregate.
    ///
    /// Stations are matched by position. A length missing from a report
    /// (an unbounded station that never grew that far) counts as zero.
    pub fn from_reports(reports: &[SimulationReport]) -> Option<Self> {
        let first = reports.first()?;
        let n = reports.len() as f64;
        let stations = first.stations.len();

        let times = reports.iter().map(|r| r.total_time);
        let min_total_time = times.clone().fold(SimTime::INFINITY, SimTime::min);
        let max_total_time = times.clone().fold(SimTime::NEG_INFINITY, SimTime::max);
        let mean_total_time = times.sum::<SimTime>() / n;

        let mut mean_losses = vec![0.0; stations];
        let mut mean_distribution: Vec<Vec<f64>> = vec![Vec::new(); stations];
        for report in reports {
            for (id, station) in report.stations.iter().enumerate().take(stations) {
                mean_losses[id] += station.losses as f64 / n;

                let row = &mut mean_distribution[id];
                if row.len() < station.distribution.len() {
                    row.resize(station.distribution.len(), 0.0);
                }
                for share in &station.distribution {
                    row[share.length] += share.probability / n;
                }
            }
        }

        Some(Self {
            replications: reports.len(),
            mean_total_time,
            min_total_time,
            max_total_time,
            mean_losses,
            mean_distribution,
        })
    }

    /// Exports the summary to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "=== Replication Summary ({} runs) ===", self.replications)?;
        writeln!(
            w,
            "Total time: mean {:.2}, min {:.2}, max {:.2}",
            self.mean_total_time, self.min_total_time, self.max_total_time
        )?;
        for (id, row) in self.mean_distribution.iter().enumerate() {
            writeln!(w)?;
            writeln!(w, "--- Station {} ---", id)?;
            writeln!(w, "{:>8}  {:>11}", "Length", "Probability")?;
            for (length, probability) in row.iter().enumerate() {
                writeln!(w, "{:>8}  {:>10.2}%", length, probability * 100.0)?;
            }
            writeln!(w, "Mean losses: {:.2}", self.mean_losses[id])?;
        }
        Ok(())
    }
}
