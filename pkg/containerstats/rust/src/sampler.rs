// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Single-shot stats queries and their conversion into [`Sample`]s.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{Error, MetricError, Result};
use crate::sample::Sample;
use crate::units::{self, ParsedMetric, Shape};

/// Go template asking docker for one JSON object per container.
const STATS_FORMAT: &str = "{{json .}}";

/// A single-shot stats query: container identifier in, raw text out.
pub trait StatsQuery {
    /// Returns the query's standard output, or [`Error::QueryFailed`] when the
    /// call exits non-zero or prints nothing.
    fn query(&self, container_id: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Runs `docker stats <id> --no-stream`.
#[derive(Debug, Clone)]
pub struct DockerStats {
    binary: PathBuf,
}

impl DockerStats {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for DockerStats {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl StatsQuery for DockerStats {
    async fn query(&self, container_id: &str) -> Result<String> {
        let failed = |reason: String| Error::QueryFailed {
            container: container_id.to_string(),
            reason,
        };

        let output = Command::new(&self.binary)
            .args(["stats", container_id, "--no-stream", "--format", STATS_FORMAT])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| failed(format!("failed to run {}: {e}", self.binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(failed(if stderr.is_empty() {
                format!("{} exited with {}", self.binary.display(), output.status)
            } else {
                stderr
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(failed("query produced no output".to_string()));
        }
        Ok(stdout)
    }
}

/// Fields of `docker stats --format '{{json .}}'` this crate consumes. Fields
/// are matched by name so column order and extra keys do not matter.
#[derive(Debug, Deserialize)]
struct StatsLine {
    #[serde(rename = "CPUPerc")]
    cpu_perc: String,
    #[serde(rename = "MemUsage")]
    mem_usage: String,
    #[serde(rename = "MemPerc")]
    mem_perc: String,
    #[serde(rename = "BlockIO")]
    block_io: String,
}

pub struct Sampler<Q> {
    query: Q,
}

impl<Q: StatsQuery> Sampler<Q> {
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    /// Take one sample of `container_id`.
    pub async fn sample(&self, container_id: &str) -> Result<Sample> {
        if container_id.is_empty() || container_id.starts_with('-') {
            return Err(Error::QueryFailed {
                container: container_id.to_string(),
                reason: "invalid container identifier".to_string(),
            });
        }
        let output = self.query.query(container_id).await?;
        parse_stats_output(container_id, &output, Utc::now())
    }
}

/// Convert the raw output of one stats query into a [`Sample`].
pub fn parse_stats_output(
    container_id: &str,
    output: &str,
    timestamp: DateTime<Utc>,
) -> Result<Sample> {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
    let line = lines.next().ok_or(Error::MalformedMetric {
        field: "output",
        source: MetricError::EmptyMetric,
    })?;
    let extra = lines.count();
    if extra > 0 {
        warn!(
            container = container_id,
            extra_lines = extra,
            "stats query returned more than one line, using the first"
        );
    }

    let stats: StatsLine = serde_json::from_str(line).map_err(|e| Error::MalformedMetric {
        field: "output",
        source: MetricError::malformed(line, e.to_string()),
    })?;

    let cpu_percent = field("CPUPerc", percent(&stats.cpu_perc))?;
    let (memory_used_bytes, memory_limit_bytes) = field("MemUsage", pair(&stats.mem_usage))?;
    let memory_percent = field("MemPerc", percent(&stats.mem_perc))?;
    let (disk_read_bytes, disk_write_bytes) = field("BlockIO", parse_block_io(&stats.block_io))?;

    debug!(
        container = container_id,
        cpu_percent,
        memory_used_bytes,
        memory_limit_bytes,
        disk_read_bytes,
        disk_write_bytes,
        "sampled container"
    );

    Ok(Sample {
        timestamp,
        container_id: container_id.to_string(),
        cpu_percent,
        memory_used_bytes,
        memory_percent,
        disk_read_bytes,
        disk_write_bytes,
    })
}

fn percent(token: &str) -> std::result::Result<f64, MetricError> {
    match units::parse(token, Shape::Percentage)? {
        ParsedMetric::Percent(value) => Ok(value),
        other => Err(unexpected_shape(token, other)),
    }
}

fn pair(token: &str) -> std::result::Result<(f64, f64), MetricError> {
    match units::parse(token, Shape::Pair)? {
        ParsedMetric::Pair(left, right) => Ok((left, right)),
        other => Err(unexpected_shape(token, other)),
    }
}

/// Block I/O is normally `read / write`; a lone value is taken as reads.
fn parse_block_io(token: &str) -> std::result::Result<(f64, f64), MetricError> {
    if token.contains('/') {
        return pair(token);
    }
    match units::parse(token, Shape::Size)? {
        ParsedMetric::Bytes(read) => Ok((read, 0.0)),
        other => Err(unexpected_shape(token, other)),
    }
}

fn unexpected_shape(token: &str, parsed: ParsedMetric) -> MetricError {
    MetricError::malformed(token, format!("unexpected value shape {parsed:?}"))
}

fn field<T>(name: &'static str, parsed: std::result::Result<T, MetricError>) -> Result<T> {
    parsed.map_err(|source| Error::MalformedMetric {
        field: name,
        source,
    })
}
