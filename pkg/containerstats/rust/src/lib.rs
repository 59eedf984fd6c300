// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

// Correctness
#![deny(clippy::string_slice)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

pub mod analyzer;
pub mod cli;
pub mod collector;
pub mod config;
pub mod errors;
pub mod record;
pub mod sample;
pub mod sampler;
pub mod state;
pub mod units;
pub mod visualizer;

pub use analyzer::{SummaryStats, analyze};
pub use collector::{CollectionLoop, CollectionSummary, StopReason};
pub use errors::{Error, MetricError, Result};
pub use record::{Record, RecordWriter, SampleSink};
pub use sample::{Metric, Sample};
pub use sampler::{DockerStats, Sampler, StatsQuery};
pub use visualizer::render;
