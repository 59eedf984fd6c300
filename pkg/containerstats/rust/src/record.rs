// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! The persisted time series: an append-only CSV file with one row per sample.
//!
//! Rows are written and synced one at a time so a crash loses at most the
//! sample being written. Readers ignore a trailing line without a newline,
//! which is what a torn write looks like.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::sample::Sample;

pub const HEADER: &str =
    "Timestamp,Container ID,CPU Usage,Memory Usage,Memory Percent,Disk Read,Disk Write";

/// Destination for samples produced by the collection loop.
pub trait SampleSink {
    /// Append one sample. Once this returns the sample is durable.
    fn append(&mut self, sample: &Sample) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

impl<T: SampleSink + ?Sized> SampleSink for &mut T {
    fn append(&mut self, sample: &Sample) -> Result<()> {
        (**self).append(sample)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Ordered samples of a single container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    samples: Vec<Sample>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) -> Result<()> {
        if let Some(expected) = self.container_id()
            && expected != sample.container_id
        {
            return Err(Error::ContainerMismatch {
                expected: expected.to_string(),
                found: sample.container_id,
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn container_id(&self) -> Option<&str> {
        self.samples.first().map(|s| s.container_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Read a record file written by [`RecordWriter`].
    pub fn load(path: &Path) -> Result<Record> {
        let contents = std::fs::read_to_string(path)?;
        Record::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Record> {
        let complete = complete_lines(contents);
        if complete.len() < contents.len() {
            warn!(
                path = %path.display(),
                "ignoring incomplete trailing line in record"
            );
        }

        let corrupt = |line: usize, reason: String| Error::CorruptRecord {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut lines = complete.lines().enumerate();
        let mut record = Record::new();
        match lines.next() {
            None => return Ok(record),
            Some((_, header)) if header.trim_end() == HEADER => {}
            Some((_, header)) => {
                return Err(corrupt(1, format!("unexpected header {header:?}")));
            }
        }

        for (idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let sample = parse_row(line).map_err(|reason| corrupt(idx + 1, reason))?;
            record.push(sample)?;
        }
        Ok(record)
    }
}

impl SampleSink for Record {
    fn append(&mut self, sample: &Sample) -> Result<()> {
        self.push(sample.clone())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Appends samples to a CSV file. The file is only created on the first
/// append, so a session that never samples successfully leaves nothing behind.
pub struct RecordWriter {
    path: PathBuf,
    file: Option<File>,
    container_id: Option<String>,
}

impl RecordWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            container_id: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file for appending. An existing file must carry our header and
    /// the same container; an incomplete last line is cut off.
    fn open(&self, container_id: &str) -> Result<File> {
        let existing = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let complete = complete_lines(&existing);
        let needs_header = complete.trim().is_empty();
        if needs_header {
            // Only whitespace or a torn header write may be discarded.
            let partial = existing.trim();
            if !partial.is_empty() && !HEADER.starts_with(partial) {
                return Err(Error::CorruptRecord {
                    path: self.path.clone(),
                    line: 1,
                    reason: "existing file is not a stats record".to_string(),
                });
            }
        } else {
            let record = Record::parse(complete, &self.path)?;
            if let Some(found) = record.container_id()
                && found != container_id
            {
                return Err(Error::ContainerMismatch {
                    expected: found.to_string(),
                    found: container_id.to_string(),
                });
            }
        }

        let keep = if needs_header { 0 } else { complete.len() };
        if keep < existing.len() {
            warn!(
                path = %self.path.display(),
                dropped_bytes = existing.len() - keep,
                "truncating incomplete trailing data before appending"
            );
            OpenOptions::new()
                .write(true)
                .open(&self.path)?
                .set_len(keep as u64)?;
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if needs_header {
            writeln!(file, "{HEADER}")?;
            file.sync_data()?;
        }

        info!(path = %self.path.display(), "opened record");
        Ok(file)
    }
}

impl SampleSink for RecordWriter {
    fn append(&mut self, sample: &Sample) -> Result<()> {
        if let Some(expected) = &self.container_id
            && *expected != sample.container_id
        {
            return Err(Error::ContainerMismatch {
                expected: expected.clone(),
                found: sample.container_id.clone(),
            });
        }

        let file = match self.file.take() {
            Some(file) => file,
            None => {
                let file = self.open(&sample.container_id)?;
                self.container_id = Some(sample.container_id.clone());
                file
            }
        };
        let file = self.file.insert(file);

        file.write_all(format_row(sample).as_bytes())?;
        file.flush()?;
        file.sync_data()?;
        debug!(path = %self.path.display(), "appended sample");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
            file.sync_data()?;
        }
        Ok(())
    }
}

/// One CSV row, newline included. Floats use the shortest representation that
/// parses back to the same value.
pub fn format_row(sample: &Sample) -> String {
    format!(
        "{},{},{},{},{},{},{}\n",
        sample.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        sample.container_id,
        sample.cpu_percent,
        sample.memory_used_bytes,
        sample.memory_percent,
        sample.disk_read_bytes,
        sample.disk_write_bytes,
    )
}

fn parse_row(line: &str) -> std::result::Result<Sample, String> {
    let fields: Vec<&str> = line.trim_end().split(',').collect();
    let [timestamp, container_id, cpu, memory, memory_pct, read, write] = fields.as_slice() else {
        return Err(format!("expected 7 fields, found {}", fields.len()));
    };

    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| format!("bad timestamp {timestamp:?}: {e}"))?
        .with_timezone(&Utc);
    if container_id.is_empty() {
        return Err("empty container id".to_string());
    }

    Ok(Sample {
        timestamp,
        container_id: container_id.to_string(),
        cpu_percent: parse_number(cpu)?,
        memory_used_bytes: parse_number(memory)?,
        memory_percent: parse_number(memory_pct)?,
        disk_read_bytes: parse_number(read)?,
        disk_write_bytes: parse_number(write)?,
    })
}

fn parse_number(field: &str) -> std::result::Result<f64, String> {
    let value: f64 = field
        .parse()
        .map_err(|e| format!("bad number {field:?}: {e}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("value {field:?} is not a non-negative finite number"));
    }
    Ok(value)
}

/// Prefix of `contents` ending at the last newline.
fn complete_lines(contents: &str) -> &str {
    match contents.rfind('\n') {
        Some(end) => contents.get(..=end).unwrap_or_default(),
        None => "",
    }
}
