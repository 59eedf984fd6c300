// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::print_stderr)]

use std::io::ErrorKind;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{info, warn};

use dd_container_stats::cli::Args;
use dd_container_stats::config::CollectorConfig;
use dd_container_stats::{
    CollectionLoop, DockerStats, Error, Record, RecordWriter, Sampler, StopReason, analyze, render,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // RUST_LOG takes precedence, fallback to info; stdout is reserved for the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.apply(
        CollectorConfig::load(args.config.as_deref()).context("loading configuration")?,
    );
    config.validate()?;

    info!(
        container = %args.container,
        output = %config.output.display(),
        interval_secs = config.interval_secs,
        version = env!("CARGO_PKG_VERSION"),
        "starting dd-container-stats"
    );

    if !args.report_only {
        collect(&args.container, &config).await?;
    }
    report(&args, &config)
}

async fn collect(container: &str, config: &CollectorConfig) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("received SIGINT, stopping after the current tick"),
            _ = sigterm.recv() => info!("received SIGTERM, stopping after the current tick"),
        }
        let _ = shutdown_tx.send(true);
    });

    let sampler = Sampler::new(DockerStats::new(&config.docker_binary));
    let writer = RecordWriter::new(&config.output);
    let summary = CollectionLoop::new(sampler, writer, config.interval())
        .run(container, shutdown_rx)
        .await
        .with_context(|| format!("collecting stats for container {container:?}"))?;

    match &summary.stop_reason {
        StopReason::QueryFailed { reason } if summary.never_resolved() => {
            bail!("cannot read stats for container {container:?}: {reason}");
        }
        StopReason::QueryFailed { reason } => {
            warn!(container, %reason, "container stopped answering, collection ended");
        }
        StopReason::Interrupted => {}
    }
    Ok(())
}

fn report(args: &Args, config: &CollectorConfig) -> Result<()> {
    if !args.analyze && !args.graphs {
        return Ok(());
    }

    let record = match Record::load(&config.output) {
        Ok(record) => record,
        Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => Record::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("reading {}", config.output.display()));
        }
    };
    if let Some(found) = record.container_id()
        && found != args.container
    {
        return Err(Error::ContainerMismatch {
            expected: found.to_string(),
            found: args.container.clone(),
        }
        .into());
    }

    if args.analyze {
        match analyze(&record) {
            Ok(stats) => print!("{stats}"),
            Err(Error::EmptyRecord) => warn!("record is empty, nothing to analyze"),
            Err(e) => return Err(e.into()),
        }
    }

    if args.graphs {
        match render(&record, &args.chart_metrics(), &config.graphs_dir) {
            Ok(paths) => info!(
                charts = paths.len(),
                dir = %config.graphs_dir.display(),
                "charts written"
            ),
            Err(Error::EmptyRecord) => warn!("record is empty, no charts rendered"),
            Err(e) => return Err(e).context("rendering charts"),
        }
    }
    Ok(())
}
