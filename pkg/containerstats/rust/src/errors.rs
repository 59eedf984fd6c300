// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a single raw metric token into a number.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    #[error("empty metric token")]
    EmptyMetric,
    #[error("unknown unit {unit:?} in {token:?}")]
    UnknownUnit { token: String, unit: String },
    #[error("malformed metric {token:?}: {reason}")]
    MalformedMetric { token: String, reason: String },
}

impl MetricError {
    pub(crate) fn malformed(token: &str, reason: impl Into<String>) -> Self {
        MetricError::MalformedMetric {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// The stats query succeeded but one of its fields could not be parsed.
    #[error("could not parse {field}: {source}")]
    MalformedMetric {
        field: &'static str,
        #[source]
        source: MetricError,
    },

    /// The stats query itself failed; retrying against the same identifier is pointless.
    #[error("stats query failed for container {container:?}: {reason}")]
    QueryFailed { container: String, reason: String },

    #[error("record contains no samples")]
    EmptyRecord,

    #[error("corrupt record {path}, line {line}: {reason}")]
    CorruptRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("record belongs to container {expected:?}, refusing sample for {found:?}")]
    ContainerMismatch { expected: String, found: String },

    #[error("chart rendering failed for {path}: {reason}")]
    Render { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Permanent errors stop the collection loop; everything else is tick-scoped.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Error::QueryFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
