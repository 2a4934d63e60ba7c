use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gleaner::collectors::{DockerLogCollector, GpuMetricCollector, SystemdLogCollector};
use gleaner::config::Config;
use gleaner::remote::SshRunner;
use gleaner::store::save_records;
use gleaner::Preprocessor;
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the telemetry pipeline
#[derive(Parser)]
#[command(
    name = "gleaner",
    about = "Collects service logs, container logs and GPU metrics from a remote \
             host over SSH and normalizes them into one combined event file"
)]
struct Cli {
    /// Configuration file path (TOML format)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Enable verbose logging output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Collect raw telemetry from the remote host into the ingested-data root
    Ingest,
    /// Normalize all raw files into the combined event file
    Preprocess,
    /// Ingest, then preprocess, in one invocation
    Run,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    match cli.command {
        CliCommand::Ingest => ingest(&config),
        CliCommand::Preprocess => preprocess(&config),
        CliCommand::Run => {
            ingest(&config)?;
            preprocess(&config)
        }
    }
}

/// Run every collector once against the configured host, saving each
/// non-empty batch. A transport failure aborts only its own source; the run
/// fails only when no source succeeded.
fn ingest(config: &Config) -> anyhow::Result<()> {
    info!("Starting ingestion from {}", config.remote.host);

    let runner = SshRunner::new(
        config.remote.host.as_str(),
        config.remote.user.as_str(),
        config.remote.key_path.clone(),
        Duration::from_secs(config.remote.command_timeout_secs),
    );
    let ingested_root = &config.data.ingested_root;
    let mut sources_failed = 0;

    let systemd = SystemdLogCollector::new(
        &runner,
        config.remote.host.as_str(),
        config.systemd.unit.as_str(),
        config.systemd.since_hours,
    );
    match systemd.collect() {
        Ok(harvest) if harvest.records.is_empty() => {
            warn!("No systemd records collected; nothing to save")
        }
        Ok(harvest) => {
            save_records(
                &harvest.records,
                &ingested_root.join("systemd"),
                "systemd_logs",
            )?;
        }
        Err(e) => {
            error!("systemd collection failed: {e}");
            sources_failed += 1;
        }
    }

    let docker = DockerLogCollector::new(
        &runner,
        config.remote.host.as_str(),
        config.docker.since_minutes,
        config.docker.containers.clone(),
        config.docker.concurrency,
    );
    match docker.collect() {
        Ok(harvest) => {
            for selector in &harvest.unmatched {
                warn!("Container selector '{selector}' matched nothing this run");
            }
            for container in &harvest.failed_containers {
                warn!("Skipped container {} ({})", container.name, container.id);
            }
            if harvest.records.is_empty() {
                warn!("No Docker records collected; nothing to save");
            } else {
                save_records(
                    &harvest.records,
                    &ingested_root.join("docker"),
                    "docker_logs",
                )?;
            }
        }
        Err(e) => {
            error!("Docker collection failed: {e}");
            sources_failed += 1;
        }
    }

    let gpu = GpuMetricCollector::new(&runner, config.remote.host.as_str());
    match gpu.collect() {
        Ok(harvest) if harvest.records.is_empty() => {
            warn!("No GPU records collected; nothing to save")
        }
        Ok(harvest) => {
            save_records(&harvest.records, &ingested_root.join("gpu"), "gpu_metrics")?;
        }
        Err(e) => {
            error!("GPU collection failed: {e}");
            sources_failed += 1;
        }
    }

    if sources_failed == 3 {
        bail!("all collection sources failed for {}", config.remote.host);
    }
    info!("Ingestion completed ({sources_failed} source(s) failed)");
    Ok(())
}

fn preprocess(config: &Config) -> anyhow::Result<()> {
    let preprocessor = Preprocessor::new(
        config.data.ingested_root.clone(),
        config.data.processed_root.clone(),
    );
    let summary = preprocessor.run().context("preprocessing pass failed")?;
    info!(
        "Wrote {} events to {} ({} records skipped)",
        summary.events_written,
        summary.output_path.display(),
        summary.records_skipped
    );
    Ok(())
}
