// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::units::format_bytes;

/// One normalized snapshot of a container's resource usage.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub container_id: String,
    pub cpu_percent: f64,
    pub memory_used_bytes: f64,
    pub memory_percent: f64,
    pub disk_read_bytes: f64,
    pub disk_write_bytes: f64,
}

impl Sample {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::CpuUsage => self.cpu_percent,
            Metric::MemoryUsage => self.memory_used_bytes,
            Metric::MemoryPercent => self.memory_percent,
            Metric::DiskRead => self.disk_read_bytes,
            Metric::DiskWrite => self.disk_write_bytes,
        }
    }
}

/// Numeric columns of a record, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    CpuUsage,
    MemoryUsage,
    MemoryPercent,
    DiskRead,
    DiskWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Percent,
    Bytes,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::CpuUsage,
        Metric::MemoryUsage,
        Metric::MemoryPercent,
        Metric::DiskRead,
        Metric::DiskWrite,
    ];

    /// Header name used in the persisted record.
    pub fn column_name(self) -> &'static str {
        match self {
            Metric::CpuUsage => "CPU Usage",
            Metric::MemoryUsage => "Memory Usage",
            Metric::MemoryPercent => "Memory Percent",
            Metric::DiskRead => "Disk Read",
            Metric::DiskWrite => "Disk Write",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Metric::CpuUsage => "cpu_usage",
            Metric::MemoryUsage => "memory_usage",
            Metric::MemoryPercent => "memory_percent",
            Metric::DiskRead => "disk_read",
            Metric::DiskWrite => "disk_write",
        }
    }

    pub fn unit(self) -> MetricUnit {
        match self {
            Metric::CpuUsage | Metric::MemoryPercent => MetricUnit::Percent,
            Metric::MemoryUsage | Metric::DiskRead | Metric::DiskWrite => MetricUnit::Bytes,
        }
    }

    pub fn from_slug(slug: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.slug() == slug)
    }

    /// Human-readable rendering of a value of this metric.
    pub fn format_value(self, value: f64) -> String {
        match self.unit() {
            MetricUnit::Percent => format!("{value:.2}%"),
            MetricUnit::Bytes => format_bytes(value),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}
