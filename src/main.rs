//! perf-harness - run a built-in benchmark target through the harness
//!
//! Prints one result line per measured iteration.

use anyhow::Result;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use perf_harness::benchmark::LoopCoordinator;
use perf_harness::config::{BenchmarkConfig, CliArgs};
use perf_harness::targets::create_benchmark;

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_names(verbose)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: tracing subscriber already installed");
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse_args();

    setup_logging(args.verbose, args.quiet);

    let config = BenchmarkConfig::from_cli(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let benchmark = create_benchmark(args.target, args.pool_size);
    let mut coordinator = LoopCoordinator::new(config, benchmark)?;

    let results = coordinator.run()?;

    if !args.quiet {
        let total_ms: u64 = results.iter().map(|r| r.total_time_ms).sum();
        let mean_ms = if results.is_empty() {
            0
        } else {
            total_ms / results.len() as u64
        };
        info!(
            "{} ({}): {} loops, mean total time {} ms",
            coordinator.benchmark_name(),
            args.target.as_str(),
            results.len(),
            mean_ms
        );
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
