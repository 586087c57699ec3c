//! Invariants checked after every dispatched event, over several seeds and
//! topologies.

use qnetsim::network::Network;
use qnetsim::routing::Route;
use qnetsim::simulation::{Simulation, Step};
use qnetsim::station::{Station, StationSpec};
use qnetsim::types::{Capacity, Interval};
use qnetsim::variate::{SeededVariates, VariateSource};
use qnetsim::NetworkConfig;

const SEEDS: [u64; 4] = [1, 7, 42, 1234];

fn example_network() -> Network {
    NetworkConfig::example().build().unwrap()
}

/// Multi-server stations, a feedback loop and an unbounded station.
fn feedback_network() -> Network {
    Network::new(
        vec![
            StationSpec::new(3, Capacity::Bounded(4), Interval::new(1.0, 6.0))
                .with_arrivals(Interval::new(0.5, 1.5)),
            StationSpec::new(2, Capacity::Unbounded, Interval::new(0.5, 2.0))
                .with_arrivals(Interval::new(3.0, 6.0))
                .with_first_arrival(0.0),
            StationSpec::new(1, Capacity::Bounded(1), Interval::new(0.1, 0.3)),
        ],
        vec![
            Route::new(0, 1, 0.4),
            Route::new(0, 2, 0.4),
            Route::new(1, 0, 0.3),
            Route::new(2, 2, 0.5),
        ],
    )
    .unwrap()
}

/// Runs `network` to completion, calling `check` after every event.
fn check_every_step(network: Network, budget: u64, check: impl Fn(&Simulation)) {
    for seed in SEEDS {
        let mut sim = Simulation::new(network.clone(), SeededVariates::new(budget, seed));
        while let Step::Dispatched(_) = sim.step() {
            check(&sim);
        }
        check(&sim);
    }
}

fn assert_time_partition(sim: &Simulation) {
    for station in sim.stations() {
        let accounted = station.accounted_time();
        let tolerance = 1e-9 * sim.clock().max(1.0);
        assert!(
            (accounted - sim.clock()).abs() <= tolerance,
            "station {} accounts {} of {}",
            station.id(),
            accounted,
            sim.clock()
        );
    }
}

fn assert_station_consistent(station: &Station) {
    if let Some(limit) = station.capacity().limit() {
        assert!(station.occupancy() <= limit, "station {} over capacity", station.id());
    }
    assert!(station.in_service() <= station.servers());
    assert_eq!(station.in_service() + station.waiting(), station.occupancy());
    assert_eq!(station.admitted() + station.losses(), station.arrival_attempts());
    assert_eq!(
        station.admitted() - station.departures(),
        station.occupancy() as u64
    );
    assert_eq!(station.forwarded() + station.exited(), station.departures());
}

#[test]
fn test_time_partition() {
    check_every_step(example_network(), 5_000, assert_time_partition);
    check_every_step(feedback_network(), 5_000, assert_time_partition);
}

#[test]
fn test_station_bookkeeping() {
    let check = |sim: &Simulation| sim.stations().iter().for_each(assert_station_consistent);
    check_every_step(example_network(), 5_000, check);
    check_every_step(feedback_network(), 5_000, check);
}

#[test]
fn test_clients_wait_only_when_servers_are_busy() {
    // Once the budget is gone a service may fail to start, so only check
    // while variates remain.
    let check = |sim: &Simulation| {
        if sim.variates().is_exhausted() {
            return;
        }
        for station in sim.stations() {
            if station.waiting() > 0 {
                assert_eq!(station.in_service(), station.servers());
            }
        }
    };
    check_every_step(feedback_network(), 5_000, check);
}

#[test]
fn test_no_phantom_departures() {
    let check = |sim: &Simulation| {
        for station in sim.stations() {
            let departure = station.next_departure_time();
            if station.occupancy() == 0 {
                assert!(departure.is_infinite());
            }
            if departure.is_finite() {
                assert!(station.in_service() > 0);
                assert!(departure >= sim.clock());
            }
        }
    };
    check_every_step(feedback_network(), 5_000, check);
}

#[test]
fn test_budget_never_exceeded() {
    for budget in [1, 2, 3, 17, 1_000] {
        for seed in SEEDS {
            let mut sim = Simulation::new(feedback_network(), SeededVariates::new(budget, seed));
            while let Step::Dispatched(_) = sim.step() {
                assert!(sim.variates().used() <= budget);
            }
            assert_eq!(sim.variates().used(), budget);
        }
    }
}

#[test]
fn test_losses_leave_occupancy_unchanged() {
    // Single-slot station flooded by arrivals.
    let network = Network::new(
        vec![StationSpec::new(1, Capacity::Bounded(1), Interval::new(5.0, 10.0))
            .with_arrivals(Interval::new(0.1, 0.5))],
        Vec::new(),
    )
    .unwrap();

    for seed in SEEDS {
        let mut sim = Simulation::new(network.clone(), SeededVariates::new(2_000, seed));
        let mut losses = 0;
        let mut occupancy = 0;
        while let Step::Dispatched(_) = sim.step() {
            let station = sim.station(0).unwrap();
            if station.losses() > losses {
                assert_eq!(station.losses(), losses + 1, "one loss per event");
                assert_eq!(station.occupancy(), occupancy);
            }
            losses = station.losses();
            occupancy = station.occupancy();
        }
        assert!(losses > 0);
    }
}

#[test]
fn test_clock_never_moves_backwards() {
    for seed in SEEDS {
        let mut sim = Simulation::new(feedback_network(), SeededVariates::new(5_000, seed));
        let mut last = sim.clock();
        while let Step::Dispatched(event) = sim.step() {
            assert!(event.time >= last);
            assert_eq!(sim.clock(), event.time);
            last = event.time;
        }
    }
}
