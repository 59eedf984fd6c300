// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Normalization of the human-readable values printed by `docker stats`.
//!
//! Docker mixes unit families depending on the column: memory usage is printed
//! with binary suffixes (`512MiB / 2GiB`) while block I/O uses decimal ones
//! (`12.3kB / 4.5MB`). Suffixes are matched case-sensitively so that `kB`
//! (1000) and `KiB` (1024) never get confused.

use nom::IResult;
use nom::character::complete::{alpha0, digit0, digit1, space0};
use nom::error::{Error as NomError, ErrorKind};
use nom::number::complete::double;

use crate::errors::MetricError;

/// Size suffixes ordered from smallest to largest.
const SIZE_UNITS: &[(&str, f64)] = &[
    ("B", 1.0),
    ("kB", 1_000.0),
    ("KiB", 1_024.0),
    ("MB", 1_000_000.0),
    ("MiB", 1_048_576.0),
    ("GB", 1_000_000_000.0),
    ("GiB", 1_073_741_824.0),
    ("TB", 1_000_000_000_000.0),
    ("TiB", 1_099_511_627_776.0),
];

const BINARY_SUFFIXES: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];

/// The shape a raw token is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `45.6%`
    Percentage,
    /// `1.23MiB`
    Size,
    /// `12.3kB / 4.5MB`
    Pair,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedMetric {
    Percent(f64),
    Bytes(f64),
    Pair(f64, f64),
}

/// Parse `token` according to `shape`, returning bytes for sizes and a plain
/// number for percentages.
pub fn parse(token: &str, shape: Shape) -> Result<ParsedMetric, MetricError> {
    match shape {
        Shape::Percentage => parse_percentage(token).map(ParsedMetric::Percent),
        Shape::Size => parse_size(token).map(ParsedMetric::Bytes),
        Shape::Pair => parse_pair(token).map(|(a, b)| ParsedMetric::Pair(a, b)),
    }
}

/// `45.6%` -> `45.6`. The trailing `%` is optional.
pub fn parse_percentage(token: &str) -> Result<f64, MetricError> {
    let trimmed = non_empty(token)?;
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    if number.is_empty() {
        return Err(MetricError::malformed(token, "no number before '%'"));
    }

    let (rest, value) =
        number_only(number).map_err(|_| MetricError::malformed(token, "expected a number"))?;
    if !rest.is_empty() {
        return Err(MetricError::malformed(
            token,
            format!("unexpected trailing input {rest:?}"),
        ));
    }
    checked(token, value)
}

/// `1.5MiB` -> `1572864.0`.
pub fn parse_size(token: &str) -> Result<f64, MetricError> {
    let trimmed = non_empty(token)?;
    let (rest, (value, unit)) = number_with_unit(trimmed)
        .map_err(|_| MetricError::malformed(token, "expected a number"))?;
    if !rest.is_empty() {
        return Err(MetricError::malformed(
            token,
            format!("unexpected trailing input {rest:?}"),
        ));
    }
    if unit.is_empty() {
        return Err(MetricError::malformed(token, "missing unit suffix"));
    }
    let multiplier = unit_multiplier(unit).ok_or_else(|| MetricError::UnknownUnit {
        token: token.to_string(),
        unit: unit.to_string(),
    })?;
    checked(token, value * multiplier)
}

/// `512MiB / 2GiB` -> `(536870912.0, 2147483648.0)`. Each side is resolved
/// independently and may use a different unit family.
pub fn parse_pair(token: &str) -> Result<(f64, f64), MetricError> {
    let trimmed = non_empty(token)?;
    let (left, right) = trimmed
        .split_once('/')
        .ok_or_else(|| MetricError::malformed(token, "expected \"used / limit\""))?;
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() {
        return Err(MetricError::malformed(token, "empty side in pair"));
    }
    Ok((parse_size(left)?, parse_size(right)?))
}

/// Multiplier for a size suffix, `None` if the suffix is not in the table.
pub fn unit_multiplier(unit: &str) -> Option<f64> {
    SIZE_UNITS
        .iter()
        .find(|(suffix, _)| *suffix == unit)
        .map(|(_, multiplier)| *multiplier)
}

/// Render a byte count with binary suffixes, e.g. `512.00MiB`.
pub fn format_bytes(bytes: f64) -> String {
    let mut value = bytes;
    let mut suffix = "B";
    for next in BINARY_SUFFIXES.iter().skip(1) {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        suffix = next;
    }
    if suffix == "B" {
        format!("{value:.0}B")
    } else {
        format!("{value:.2}{suffix}")
    }
}

fn non_empty(token: &str) -> Result<&str, MetricError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(MetricError::EmptyMetric);
    }
    Ok(trimmed)
}

fn checked(token: &str, value: f64) -> Result<f64, MetricError> {
    if !value.is_finite() {
        return Err(MetricError::malformed(token, "value is not finite"));
    }
    if value < 0.0 {
        return Err(MetricError::malformed(token, "value is negative"));
    }
    Ok(value)
}

fn number_only(input: &str) -> IResult<&str, f64> {
    double(input)
}

/// Plain `123` or `1.5`. Sizes never carry an exponent, so `2EB` reads as
/// 2 followed by the suffix `EB`.
fn decimal(input: &str) -> IResult<&str, f64> {
    let (rest, _) = digit1(input)?;
    let rest = match rest.strip_prefix('.') {
        Some(fraction) => digit0(fraction)?.0,
        None => rest,
    };
    let value = input
        .strip_suffix(rest)
        .and_then(|digits| digits.parse().ok())
        .ok_or(nom::Err::Error(NomError::new(input, ErrorKind::Float)))?;
    Ok((rest, value))
}

fn number_with_unit(input: &str) -> IResult<&str, (f64, &str)> {
    let (input, value) = decimal(input)?;
    let (input, _) = space0(input)?;
    let (input, unit) = alpha0(input)?;
    Ok((input, (value, unit)))
}
