// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;

use clap::Parser;

use crate::config::CollectorConfig;
use crate::sample::Metric;

/// Sample a container's resource usage into a CSV record
#[derive(Parser, Debug, Clone)]
#[command(name = "dd-container-stats", version)]
#[command(about = "Poll docker stats for one container and record the time series")]
pub struct Args {
    /// Container name or ID to monitor
    pub container: String,

    /// Record file to append to [default: container_stats.csv]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seconds between samples [default: 5]
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Print the maximum of each metric once collection stops
    #[arg(long)]
    pub analyze: bool,

    /// Render one SVG chart per metric once collection stops
    #[arg(long)]
    pub graphs: bool,

    /// Directory for rendered charts [default: graphs]
    #[arg(long)]
    pub graphs_dir: Option<PathBuf>,

    /// Comma-separated metrics to chart (cpu_usage, memory_usage, memory_percent,
    /// disk_read, disk_write); all of them when omitted
    #[arg(long, value_delimiter = ',', value_parser = parse_metric)]
    pub metrics: Vec<Metric>,

    /// Path to the docker CLI [default: docker]
    #[arg(long)]
    pub docker_binary: Option<PathBuf>,

    /// YAML config file; also read from DD_CONTAINER_STATS_CONFIG
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip collection and only analyze/chart an existing record
    #[arg(long)]
    pub report_only: bool,
}

impl Args {
    /// Layer explicitly passed flags over `config`.
    pub fn apply(&self, mut config: CollectorConfig) -> CollectorConfig {
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(interval) = self.interval {
            config.interval_secs = interval;
        }
        if let Some(dir) = &self.graphs_dir {
            config.graphs_dir = dir.clone();
        }
        if let Some(binary) = &self.docker_binary {
            config.docker_binary = binary.clone();
        }
        config
    }

    pub fn chart_metrics(&self) -> Vec<Metric> {
        if self.metrics.is_empty() {
            Metric::ALL.to_vec()
        } else {
            self.metrics.clone()
        }
    }
}

fn parse_metric(value: &str) -> Result<Metric, String> {
    Metric::from_slug(value.trim()).ok_or_else(|| {
        let known: Vec<&str> = Metric::ALL.iter().map(|m| m.slug()).collect();
        format!("unknown metric {value:?}, expected one of {}", known.join(", "))
    })
}
