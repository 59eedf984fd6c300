// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{Error, Result};

pub const CONFIG_ENV_VAR: &str = "DD_CONTAINER_STATS_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    pub interval_secs: u64,
    pub output: PathBuf,
    pub docker_binary: PathBuf,
    pub graphs_dir: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            output: PathBuf::from("container_stats.csv"),
            docker_binary: PathBuf::from("docker"),
            graphs_dir: PathBuf::from("graphs"),
        }
    }
}

impl CollectorConfig {
    /// Load from `explicit`, else from the path in `DD_CONTAINER_STATS_CONFIG`,
    /// else defaults. Only an explicit path is required to exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        load_from(explicit, from_env.as_deref())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::Config("interval must be at least 1 second".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(Error::Config("output path is empty".into()));
        }
        Ok(())
    }
}

fn load_from(explicit: Option<&Path>, from_env: Option<&Path>) -> Result<CollectorConfig> {
    let config = match (explicit, from_env) {
        (Some(path), _) => parse_config(path)?,
        (None, Some(path)) if !path.exists() => {
            warn!(
                path = %path.display(),
                "{CONFIG_ENV_VAR} points to a missing file, using defaults"
            );
            CollectorConfig::default()
        }
        (None, Some(path)) => parse_config(path)?,
        (None, None) => CollectorConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn parse_config(path: &Path) -> Result<CollectorConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
    if contents.trim().is_empty() {
        debug!(path = %path.display(), "empty config file, using defaults");
        return Ok(CollectorConfig::default());
    }
    serde_yaml::from_str(&contents)
        .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))
}
