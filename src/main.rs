//! pummel - Constant-rate HTTP load generator

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;

use pummel_core::{
    CoordinatorBuilder, DefaultScript, ProgressReporter, RunReport, ScenarioScript,
    ScriptBoundary, SerializedScript, StatsCollector,
};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let config = cli.run_config();

    // Script calls go through the serialization wrapper so a future runtime
    // that is not safe for concurrent reentry plugs in without changing the
    // wiring; the lock is released before any network I/O.
    let script: Arc<dyn ScriptBoundary> = match &cli.script {
        Some(path) => {
            let scenario = ScenarioScript::from_file(path)
                .with_context(|| format!("loading scenario {}", path.display()))?;
            Arc::new(SerializedScript::new(scenario))
        }
        None => {
            let Some(url) = cli.args.first() else {
                bail!("a target URL is required when no --script is given");
            };
            Arc::new(SerializedScript::new(DefaultScript::new(url)))
        }
    };

    let (coordinator, timing_rx) = CoordinatorBuilder::new()
        .config(config.clone())
        .script(script)
        .args(cli.args.clone())
        .build()?;

    println!(
        "starting {} worker(s) for {} requests per second",
        config.effective_workers(),
        config.rps
    );
    if cli.duration.is_none() {
        println!("press Ctrl+C to stop and print statistics");
    }

    let counters = coordinator.counters();
    let shutdown = coordinator.shutdown_signal();
    let collector = StatsCollector::new(timing_rx, Arc::clone(&counters));
    let collector_handle = tokio::spawn(collector.run());

    let reporter = ProgressReporter::new(Arc::clone(&counters), shutdown);
    let reporter_handle = tokio::spawn(reporter.run());

    let started = Instant::now();
    let run_result = coordinator.run_with_signal_handling().await;
    let elapsed = started.elapsed();

    let timings = collector_handle
        .await
        .context("timing collector task panicked")?;
    reporter_handle.abort();

    // Print what was measured even when the run aborted early.
    let report = RunReport::new(timings, counters.error(), elapsed);
    println!("{report}");

    run_result?;
    Ok(())
}
