//! Queueing network simulator CLI
//!
//! Runs a network described in a YAML or JSON file and prints per-station
//! occupancy distributions and losses.
//!
//! # Example
//!
//! ```bash
//! # Write the example network to configs.yaml
//! qnetsim -g
//!
//! # Run it with a fixed seed
//! qnetsim -c configs.yaml --seed 42
//!
//! # 20 replications, JSON output
//! qnetsim -c configs.yaml --replications 20 --format json
//! ```

use clap::{CommandFactory, Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use qnetsim::config::{ConfigResult, NetworkConfig, DEFAULT_CONFIG_FILE};
use qnetsim::replication::{ReplicationRunner, ReplicationSummary};
use qnetsim::stats::{SimulationReport, Timer};
use qnetsim::Simulation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
    Csv,
}

/// Queueing network simulator
///
/// Simulates an open network of G/G/c/K stations with probabilistic routing.
/// Runs are reproducible when the same seed is used.
#[derive(Parser, Debug)]
#[command(name = "qnetsim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Network configuration file (.yaml, .yml or .json)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Write the example configuration and exit unless --config is given
    #[arg(
        short = 'g',
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = DEFAULT_CONFIG_FILE
    )]
    generate_config: Option<PathBuf>,

    /// Random seed, overriding the configuration. When omitted and the file
    /// sets none, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Variate budget, overriding the configuration
    #[arg(long)]
    max_variates: Option<u64>,

    /// Number of independent replications
    #[arg(long, default_value = "1")]
    replications: usize,

    /// Worker threads for replications (0 = auto)
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Number of arrival/departure timestamps shown per station
    #[arg(long, value_name = "N", default_value = "0")]
    trace: usize,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.config.is_none() && args.generate_config.is_none() {
        let _ = Args::command().print_help();
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> ConfigResult<()> {
    if let Some(path) = &args.generate_config {
        NetworkConfig::write_example(path)?;
        eprintln!("Example configuration written to {}", path.display());
    }

    let Some(path) = &args.config else {
        return Ok(());
    };

    let mut config = NetworkConfig::from_file(path)?;
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(max) = args.max_variates {
        config.simulation.max_variates = max;
    }

    let level = if args.verbose {
        "debug"
    } else {
        config.simulation.log_level.as_str()
    };
    qnetsim::init_logging(level);

    tracing::info!(
        config = %path.display(),
        stations = config.station_count(),
        routes = config.route_count(),
        max_variates = config.simulation.max_variates,
        seed = ?config.simulation.seed,
        "loaded configuration"
    );

    if args.replications > 1 {
        run_replications(args, config)
    } else {
        run_single(args, &config)
    }
}

fn run_single(args: &Args, config: &NetworkConfig) -> ConfigResult<()> {
    let timer = Timer::start();
    let mut simulation = Simulation::from_config(config)?;
    simulation.run();

    let mut report = simulation
        .report()
        .with_name(path_name(args))
        .with_wall_time(timer.elapsed_ms());
    report.truncate_traces(args.trace);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.format {
        Format::Text => report.write_summary(&mut out, args.trace)?,
        Format::Json => writeln!(out, "{}", report.to_json()?)?,
        Format::Csv => write_csv(&mut out, &report)?,
    }
    Ok(())
}

fn run_replications(args: &Args, config: NetworkConfig) -> ConfigResult<()> {
    let timer = Timer::start();
    let reports = ReplicationRunner::new(config)
        .replications(args.replications)
        .threads(args.threads)
        .run()?;
    tracing::info!(
        replications = reports.len(),
        wall_time_ms = timer.elapsed_ms(),
        "replications finished"
    );

    let Some(summary) = ReplicationSummary::from_reports(&reports) else {
        return Ok(());
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.format {
        Format::Text => summary.write_summary(&mut out)?,
        Format::Json => writeln!(out, "{}", summary.to_json()?)?,
        Format::Csv => {
            writeln!(out, "station,length,mean_probability")?;
            for (id, row) in summary.mean_distribution.iter().enumerate() {
                for (length, probability) in row.iter().enumerate() {
                    writeln!(out, "{},{},{:.6}", id, length, probability)?;
                }
            }
        }
    }
    Ok(())
}

fn write_csv<W: Write>(out: &mut W, report: &SimulationReport) -> std::io::Result<()> {
    write!(out, "{}", report.to_csv())?;
    writeln!(out)?;
    write!(out, "{}", report.distribution_to_csv())
}

fn path_name(args: &Args) -> String {
    args.config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
