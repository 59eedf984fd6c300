// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! One SVG line chart per metric, x = sample time, y = normalized value.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use plotters::prelude::*;
use tracing::info;

use crate::errors::{Error, Result};
use crate::record::Record;
use crate::sample::Metric;

const CHART_SIZE: (u32, u32) = (900, 300);

/// Render `metrics` from `record` into `out_dir/<slug>.svg`, creating the
/// directory if needed. Returns the written paths in request order.
pub fn render(record: &Record, metrics: &[Metric], out_dir: &Path) -> Result<Vec<PathBuf>> {
    if record.is_empty() {
        return Err(Error::EmptyRecord);
    }
    fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(metrics.len());
    for &metric in metrics {
        let path = out_dir.join(format!("{}.svg", metric.slug()));
        let svg = draw(record, metric).map_err(|e| render_error(&path, e))?;
        fs::write(&path, svg)?;
        info!(metric = metric.slug(), path = %path.display(), "wrote chart");
        written.push(path);
    }
    Ok(written)
}

fn render_error(path: &Path, reason: impl Display) -> Error {
    Error::Render {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn draw(record: &Record, metric: Metric) -> std::result::Result<String, String> {
    let points: Vec<(i64, f64)> = record
        .samples()
        .iter()
        .map(|s| (s.timestamp.timestamp_millis(), s.value(metric)))
        .collect();

    let (x_min, mut x_max) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => return Err("no samples".to_string()),
    };
    if x_max <= x_min {
        x_max = x_min + 1_000;
    }
    let y_max = points.iter().map(|p| p.1).fold(0.0, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let container = record.container_id().unwrap_or_default();
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;
        let mut chart = ChartBuilder::on(&root)
            .caption(format!("{container} - {metric}"), ("sans-serif", 22))
            .margin(12)
            .x_label_area_size(30)
            .y_label_area_size(80)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max)
            .map_err(|e| e.to_string())?;
        chart
            .configure_mesh()
            .x_labels(8)
            .x_label_formatter(&time_label)
            .y_label_formatter(&|v: &f64| metric.format_value(*v))
            .x_desc("Time (UTC)")
            .y_desc(metric.column_name())
            .draw()
            .map_err(|e| e.to_string())?;
        chart
            .draw_series(LineSeries::new(points, &BLUE))
            .map_err(|e| e.to_string())?;
        root.present().map_err(|e| e.to_string())?;
    }
    Ok(svg)
}

fn time_label(millis: &i64) -> String {
    DateTime::from_timestamp_millis(*millis)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}
