//! Configuration system for network simulations.
//!
//! Networks are described declaratively in YAML or JSON and turned into a
//! validated [`Network`] with [`NetworkConfig::build`].
//!
//! # Configuration File Structure
//!
//! ```yaml
//! simulation:
//!   max_variates: 100000
//!   first_arrival: 2.0
//!   seed: 42
//!
//! stations:
//!   - servers: 2
//!     capacity: 5
//!     arrival: { min: 1.5, max: 2.0 }
//!     service: { min: 2.0, max: 5.0 }
//!   - servers: 1
//!     capacity: 3
//!     service: { min: 3.5, max: 5.0 }
//!
//! routes:
//!   - source: 0
//!     target: 1
//!     probability: 0.5
//! ```
//!
//! The flat layout written by earlier versions of the tool is accepted too:
//! `max_randoms` and `init_arrival_time` at the top level, `queues` with
//! `min_/max_arrival_time` and `min_/max_departure_time` keys, and `network`
//! for the routes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::TopologyError;
use crate::network::{Network, DEFAULT_FIRST_ARRIVAL, DEFAULT_TRACE_LIMIT};
use crate::routing::Route;
use crate::station::StationSpec;
use crate::types::{Capacity, Interval, SimTime, StationId};

/// Default file written by [`NetworkConfig::write_example`] callers.
pub const DEFAULT_CONFIG_FILE: &str = "configs.yaml";

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("Refusing to overwrite existing file: {}", .0.display())]
    AlreadyExists(PathBuf),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Inclusive `[min, max]` range as written in config files.
pub type IntervalConfig = Interval;

/// Global simulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Number of variates the run may consume
    #[serde(default = "default_max_variates", alias = "max_randoms")]
    pub max_variates: u64,

    /// Time of the first exogenous arrival at every station with arrivals
    #[serde(default = "default_first_arrival", alias = "init_arrival_time")]
    pub first_arrival: SimTime,

    /// Seed of the variate generator; drawn from OS entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Timestamps kept per station event log
    #[serde(default = "default_trace_limit")]
    pub trace_limit: usize,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_variates() -> u64 {
    100_000
}

fn default_first_arrival() -> SimTime {
    DEFAULT_FIRST_ARRIVAL
}

fn default_trace_limit() -> usize {
    DEFAULT_TRACE_LIMIT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            max_variates: default_max_variates(),
            first_arrival: default_first_arrival(),
            seed: None,
            trace_limit: default_trace_limit(),
            log_level: default_log_level(),
        }
    }
}

/// Configuration for a single station.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStation")]
pub struct StationConfig {
    /// Number of parallel servers
    pub servers: usize,

    /// Maximum clients held; unbounded when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,

    /// Exogenous inter-arrival range; the station only receives routed
    /// clients when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival: Option<IntervalConfig>,

    /// Service time range
    pub service: IntervalConfig,

    /// Overrides the global first arrival time for this station
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_arrival: Option<SimTime>,
}

impl StationConfig {
    /// Creates a station fed only by routed clients.
    pub fn new(servers: usize, capacity: Option<usize>, service: IntervalConfig) -> Self {
        Self {
            servers,
            capacity,
            arrival: None,
            service,
            first_arrival: None,
        }
    }

    pub fn with_arrivals(mut self, arrival: IntervalConfig) -> Self {
        self.arrival = Some(arrival);
        self
    }

    pub fn spec(&self) -> StationSpec {
        StationSpec {
            servers: self.servers,
            capacity: Capacity::from(self.capacity),
            arrival: self.arrival,
            service: self.service,
            first_arrival: self.first_arrival,
        }
    }
}

/// Station layout as read from a file: either the nested form or the flat
/// `min_/max_` keys.
#[derive(Deserialize)]
struct RawStation {
    servers: usize,
    #[serde(default)]
    capacity: Option<usize>,
    #[serde(default)]
    arrival: Option<IntervalConfig>,
    #[serde(default)]
    service: Option<IntervalConfig>,
    #[serde(default)]
    first_arrival: Option<SimTime>,
    #[serde(default)]
    min_arrival_time: Option<SimTime>,
    #[serde(default)]
    max_arrival_time: Option<SimTime>,
    #[serde(default)]
    min_departure_time: Option<SimTime>,
    #[serde(default)]
    max_departure_time: Option<SimTime>,
}

impl TryFrom<RawStation> for StationConfig {
    type Error = String;

    fn try_from(raw: RawStation) -> Result<Self, Self::Error> {
        let service = match (raw.service, raw.min_departure_time, raw.max_departure_time) {
            (Some(service), _, _) => service,
            (None, Some(min), Some(max)) => Interval::new(min, max),
            _ => return Err("station needs `service` or `min_departure_time`/`max_departure_time`".to_string()),
        };

        // A flat range of [0, 0] means "no exogenous arrivals".
        let arrival = match (raw.arrival, raw.min_arrival_time, raw.max_arrival_time) {
            (Some(arrival), _, _) => Some(arrival),
            (None, min, Some(max)) if max > 0.0 => Some(Interval::new(min.unwrap_or(0.0), max)),
            (None, _, _) => None,
        };

        Ok(Self {
            servers: raw.servers,
            capacity: raw.capacity,
            arrival,
            service,
            first_arrival: raw.first_arrival,
        })
    }
}

/// Configuration for a routing edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub source: StationId,
    pub target: StationId,
    pub probability: f64,
}

impl From<RouteConfig> for Route {
    fn from(route: RouteConfig) -> Self {
        Route::new(route.source, route.target, route.probability)
    }
}

/// Complete network configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawConfig")]
pub struct NetworkConfig {
    /// Global simulation parameters
    pub simulation: SimulationParams,

    /// Station definitions; a station's id is its position
    pub stations: Vec<StationConfig>,

    /// Routing edges
    pub routes: Vec<RouteConfig>,
}

/// Top-level layout as read from a file, accepting the flat legacy keys.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    simulation: Option<SimulationParams>,
    #[serde(default)]
    max_randoms: Option<u64>,
    #[serde(default)]
    init_arrival_time: Option<SimTime>,
    #[serde(default, alias = "queues")]
    stations: Vec<StationConfig>,
    #[serde(default, alias = "network")]
    routes: Vec<RouteConfig>,
}

impl From<RawConfig> for NetworkConfig {
    fn from(raw: RawConfig) -> Self {
        let mut simulation = raw.simulation.unwrap_or_default();
        if let Some(max) = raw.max_randoms {
            simulation.max_variates = max;
        }
        if let Some(first) = raw.init_arrival_time {
            simulation.first_arrival = first;
        }
        Self {
            simulation,
            stations: raw.stations,
            routes: raw.routes,
        }
    }
}

impl NetworkConfig {
    /// Creates a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The three-station network used as the default example.
    ///
    /// Station 0 receives exogenous clients and feeds stations 1 and 2;
    /// station 1 feeds station 2.
    pub fn example() -> Self {
        NetworkConfigBuilder::new()
            .add_station(StationConfig::new(2, Some(5), Interval::new(2.0, 5.0)).with_arrivals(Interval::new(1.5, 2.0)))
            .add_station(StationConfig::new(1, Some(3), Interval::new(3.5, 5.0)))
            .add_station(StationConfig::new(1, Some(2), Interval::new(2.0, 4.0)))
            .add_route(0, 1, 0.5)
            .add_route(0, 2, 0.3)
            .add_route(1, 2, 0.6)
            .into_config()
    }

    /// Writes [`NetworkConfig::example`] to `path`, refusing to overwrite.
    pub fn write_example<P: AsRef<Path>>(path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        let example = Self::example();
        match extension(path).as_str() {
            "json" => example.to_json_file(path),
            _ => example.to_yaml_file(path),
        }
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: NetworkConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: NetworkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match extension(path).as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            ext => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.assemble().map(|_| ())
    }

    /// Validates the configuration and turns it into a [`Network`], logging
    /// settings that are legal but probably unintended.
    pub fn build(&self) -> ConfigResult<Network> {
        let network = self.assemble()?;
        self.warn_suspicious();
        Ok(network)
    }

    fn assemble(&self) -> ConfigResult<Network> {
        let params = &self.simulation;
        if params.max_variates == 0 {
            return Err(ConfigError::Validation(
                "max_variates must be positive".to_string(),
            ));
        }
        if !params.first_arrival.is_finite() || params.first_arrival < 0.0 {
            return Err(ConfigError::Validation(format!(
                "first_arrival must be a finite, non-negative time, got {}",
                params.first_arrival
            )));
        }

        let specs = self.stations.iter().map(StationConfig::spec).collect();
        let routes = self.routes.iter().copied().map(Route::from).collect();
        let network = Network::new(specs, routes)?
            .with_first_arrival(params.first_arrival)?
            .with_trace_limit(params.trace_limit);
        Ok(network)
    }

    /// Logs legal but probably unintended settings.
    fn warn_suspicious(&self) {
        if self.stations.iter().all(|s| s.arrival.is_none()) {
            tracing::warn!("no station has exogenous arrivals; the network will stay empty");
        }
        for (id, station) in self.stations.iter().enumerate() {
            let fed = station.arrival.is_some()
                || self.routes.iter().any(|r| r.target == id && r.probability > 0.0);
            if !fed {
                tracing::warn!(station = id, "station receives no clients");
            }
            if let Some(capacity) = station.capacity {
                if capacity < station.servers {
                    tracing::warn!(
                        station = id,
                        capacity,
                        servers = station.servers,
                        "capacity below server count; some servers can never be busy"
                    );
                }
            }
        }
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Builder for creating NetworkConfig programmatically.
#[derive(Default)]
pub struct NetworkConfigBuilder {
    config: NetworkConfig,
}

impl NetworkConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the variate budget.
    pub fn max_variates(mut self, budget: u64) -> Self {
        self.config.simulation.max_variates = budget;
        self
    }

    /// Sets the global first arrival time.
    pub fn first_arrival(mut self, time: SimTime) -> Self {
        self.config.simulation.first_arrival = time;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.simulation.seed = Some(seed);
        self
    }

    pub fn trace_limit(mut self, limit: usize) -> Self {
        self.config.simulation.trace_limit = limit;
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.simulation.log_level = level.into();
        self
    }

    /// Appends a station; its id is the number of stations added before it.
    pub fn add_station(mut self, station: StationConfig) -> Self {
        self.config.stations.push(station);
        self
    }

    /// Adds a routing edge.
    pub fn add_route(mut self, source: StationId, target: StationId, probability: f64) -> Self {
        self.config.routes.push(RouteConfig {
            source,
            target,
            probability,
        });
        self
    }

    /// Returns the configuration without validating it.
    pub fn into_config(self) -> NetworkConfig {
        self.config
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<NetworkConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
