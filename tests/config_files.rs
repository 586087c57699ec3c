//! Configuration files on disk: loading, saving and example generation.

use std::fs;

use qnetsim::config::{ConfigError, NetworkConfig, DEFAULT_CONFIG_FILE};
use qnetsim::simulation::{Simulation, Termination};
use qnetsim::TopologyError;
use tempfile::tempdir;

#[test]
fn test_write_example_and_run_it() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);

    NetworkConfig::write_example(&path).unwrap();
    let mut config = NetworkConfig::from_file(&path).unwrap();
    assert_eq!(config, NetworkConfig::example());

    config.simulation.max_variates = 1_000;
    config.simulation.seed = Some(3);
    let mut sim = Simulation::from_config(&config).unwrap();
    assert_eq!(sim.run(), Termination::VariatesExhausted);
}

#[test]
fn test_write_example_refuses_to_overwrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("configs.yaml");
    fs::write(&path, "keep me").unwrap();

    match NetworkConfig::write_example(&path) {
        Err(ConfigError::AlreadyExists(existing)) => assert_eq!(existing, path),
        other => panic!("Expected AlreadyExists, got {:?}", other),
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
}

#[test]
fn test_json_example() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("network.json");

    NetworkConfig::write_example(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.trim_start().starts_with('{'));
    assert_eq!(NetworkConfig::from_file(&path).unwrap(), NetworkConfig::example());
}

#[test]
fn test_save_and_reload() {
    let dir = tempdir().unwrap();
    let mut config = NetworkConfig::example();
    config.simulation.seed = Some(11);
    config.simulation.trace_limit = 50;

    let yaml = dir.path().join("saved.yml");
    config.to_yaml_file(&yaml).unwrap();
    assert_eq!(NetworkConfig::from_file(&yaml).unwrap(), config);

    let json = dir.path().join("saved.JSON");
    config.to_json_file(&json).unwrap();
    assert_eq!(NetworkConfig::from_file(&json).unwrap(), config);
}

#[test]
fn test_legacy_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.yaml");
    fs::write(
        &path,
        r#"
max_randoms: 500
init_arrival_time: 2.0
queues:
  - servers: 2
    capacity: 5
    min_arrival_time: 1.5
    max_arrival_time: 2.0
    min_departure_time: 2.0
    max_departure_time: 5.0
  - servers: 1
    capacity: 3
    min_departure_time: 3.5
    max_departure_time: 5.0
network:
  - source: 0
    target: 1
    probability: 0.5
"#,
    )
    .unwrap();

    let config = NetworkConfig::from_file(&path).unwrap();
    assert_eq!(config.simulation.max_variates, 500);
    assert_eq!(config.station_count(), 2);
    assert!(config.stations[1].arrival.is_none());
}

#[test]
fn test_invalid_files() {
    let dir = tempdir().unwrap();

    let missing = dir.path().join("missing.yaml");
    assert!(matches!(NetworkConfig::from_file(&missing), Err(ConfigError::Io(_))));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "{ not json").unwrap();
    assert!(matches!(NetworkConfig::from_file(&garbage), Err(ConfigError::Json(_))));

    let overflow = dir.path().join("overflow.yaml");
    fs::write(
        &overflow,
        r#"
stations:
  - servers: 1
    arrival: { min: 1.0, max: 2.0 }
    service: { min: 1.0, max: 2.0 }
  - servers: 1
    service: { min: 1.0, max: 2.0 }
routes:
  - { source: 0, target: 1, probability: 0.7 }
  - { source: 0, target: 0, probability: 0.7 }
"#,
    )
    .unwrap();
    assert!(matches!(
        NetworkConfig::from_file(&overflow),
        Err(ConfigError::Topology(TopologyError::ProbabilityOverflow { origin: 0, .. }))
    ));

    let reversed = dir.path().join("reversed.yaml");
    fs::write(
        &reversed,
        r#"
stations:
  - servers: 1
    arrival: { min: 1.0, max: 2.0 }
    service: { min: 3.0, max: 2.0 }
"#,
    )
    .unwrap();
    assert!(matches!(
        NetworkConfig::from_file(&reversed),
        Err(ConfigError::Topology(TopologyError::Station { station: 0, .. }))
    ));
}
