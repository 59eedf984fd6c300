// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::errors::{Error, Result};
use crate::record::Record;
use crate::sample::Metric;

/// Per-metric maxima over a whole record.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub container_id: String,
    pub sample_count: usize,
    pub maxima: BTreeMap<Metric, f64>,
}

impl SummaryStats {
    pub fn max(&self, metric: Metric) -> Option<f64> {
        self.maxima.get(&metric).copied()
    }
}

/// Single pass over `record`, keeping the largest value of each metric.
pub fn analyze(record: &Record) -> Result<SummaryStats> {
    let (first, rest) = record.samples().split_first().ok_or(Error::EmptyRecord)?;

    let mut maxima: BTreeMap<Metric, f64> =
        Metric::ALL.into_iter().map(|m| (m, first.value(m))).collect();
    for sample in rest {
        for (metric, max) in maxima.iter_mut() {
            *max = max.max(sample.value(*metric));
        }
    }

    debug!(
        container = %first.container_id,
        samples = record.len(),
        "analyzed record"
    );
    Ok(SummaryStats {
        container_id: first.container_id.clone(),
        sample_count: record.len(),
        maxima,
    })
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Container {} ({} samples)",
            self.container_id, self.sample_count
        )?;
        for (metric, max) in &self.maxima {
            writeln!(f, "  Max {:<15} {}", format!("{metric}:"), metric.format_value(*max))?;
        }
        Ok(())
    }
}
