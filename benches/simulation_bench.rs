//! Performance benchmarks for the queueing network simulator.
//!
//! Run with: `cargo bench`
//! Or for specific bench: `cargo bench --bench simulation_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use qnetsim::network::Network;
use qnetsim::replication::ReplicationRunner;
use qnetsim::routing::{Route, RoutingTable};
use qnetsim::scheduler::Scheduler;
use qnetsim::station::StationSpec;
use qnetsim::types::{Capacity, Interval};
use qnetsim::variate::SeededVariates;
use qnetsim::{NetworkConfig, Simulation};

// ============================================================================
// Benchmark Networks
// ============================================================================

/// A line of `n` stations, each forwarding 90% of its clients to the next.
fn tandem_line(n: usize) -> Network {
    let specs = (0..n)
        .map(|id| {
            let spec = StationSpec::new(2, Capacity::Bounded(10), Interval::new(1.0, 3.0));
            if id == 0 {
                spec.with_arrivals(Interval::new(0.5, 1.5))
            } else {
                spec
            }
        })
        .collect();
    let routes = (1..n).map(|id| Route::new(id - 1, id, 0.9)).collect();
    Network::new(specs, routes).unwrap()
}

// ============================================================================
// Driver Benchmarks
// ============================================================================

fn bench_example_network(c: &mut Criterion) {
    let mut group = c.benchmark_group("example_network");
    let network = NetworkConfig::example().build().unwrap();

    for budget in [1_000u64, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*budget));
        group.bench_with_input(BenchmarkId::new("variates", budget), budget, |b, &budget| {
            b.iter(|| {
                let mut sim = Simulation::new(network.clone(), SeededVariates::new(budget, 42));
                black_box(sim.run());
            });
        });
    }

    group.finish();
}

fn bench_station_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("station_count");

    for stations in [1, 10, 100].iter() {
        let network = tandem_line(*stations);
        group.throughput(Throughput::Elements(10_000));
        group.bench_with_input(BenchmarkId::new("stations", stations), stations, |b, _| {
            b.iter(|| {
                let mut sim = Simulation::new(network.clone(), SeededVariates::new(10_000, 7));
                black_box(sim.run());
            });
        });
    }

    group.finish();
}

// ============================================================================
// Component Benchmarks
// ============================================================================

fn bench_scheduler_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_scan");

    for stations in [10, 100, 1000].iter() {
        let network = tandem_line(*stations);
        let instances = network.instantiate();
        let scheduler = Scheduler::new();

        group.throughput(Throughput::Elements(*stations as u64));
        group.bench_with_input(BenchmarkId::new("stations", stations), stations, |b, _| {
            b.iter(|| black_box(scheduler.peek(&instances)));
        });
    }

    group.finish();
}

fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing");

    for fan_out in [2, 16, 128].iter() {
        let routes: Vec<Route> = (1..=*fan_out)
            .map(|target| Route::new(0, target, 1.0 / (*fan_out as f64 + 1.0)))
            .collect();
        let table = RoutingTable::new(fan_out + 1, &routes).unwrap();

        group.bench_with_input(BenchmarkId::new("fan_out", fan_out), fan_out, |b, _| {
            let mut v = 0.0;
            b.iter(|| {
                v = (v + 0.618_033_988_7) % 1.0;
                black_box(table.route(0, v))
            });
        });
    }

    group.finish();
}

// ============================================================================
// Replication Benchmarks
// ============================================================================

fn bench_replications(c: &mut Criterion) {
    let mut group = c.benchmark_group("replications");
    let mut config = NetworkConfig::example();
    config.simulation.max_variates = 10_000;

    for replications in [1, 4, 16].iter() {
        group.throughput(Throughput::Elements(*replications as u64));
        group.bench_with_input(
            BenchmarkId::new("runs", replications),
            replications,
            |b, &replications| {
                b.iter(|| {
                    let reports = ReplicationRunner::new(config.clone())
                        .base_seed(1)
                        .replications(replications)
                        .run()
                        .unwrap();
                    black_box(reports);
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Criterion Groups
// ============================================================================

criterion_group!(
    benches,
    bench_example_network,
    bench_station_count,
    bench_scheduler_scan,
    bench_routing,
    bench_replications,
);

criterion_main!(benches);
