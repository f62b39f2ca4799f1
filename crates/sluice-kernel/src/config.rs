//! Runner configuration.
//!
//! Loaded from `~/.config/sluice/runner.toml` (platform equivalent via
//! `directories`). A missing file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::link::DEFAULT_LINK_CAPACITY;

/// Tunables for [`PipelineRunner`](crate::scheduler::PipelineRunner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Records buffered per link before the sender blocks. 0 = rendezvous.
    #[serde(default = "default_link_capacity")]
    pub link_capacity: usize,

    /// Deadline for top-level runs in milliseconds. None = no deadline.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_link_capacity() -> usize {
    DEFAULT_LINK_CAPACITY
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            link_capacity: default_link_capacity(),
            timeout_ms: None,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Default config file path.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "sluice")
            .context("Could not determine config directory")?;

        Ok(dirs.config_dir().join("runner.toml"))
    }

    /// Set the link capacity.
    pub fn with_link_capacity(mut self, capacity: usize) -> Self {
        self.link_capacity = capacity;
        self
    }

    /// Set the top-level deadline, rounded up to whole milliseconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let millis = if Duration::from_millis(millis) < timeout {
            millis.saturating_add(1)
        } else {
            millis
        };
        self.timeout_ms = Some(millis.max(1));
        self
    }

    /// The top-level deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn timeout_rounds_up_to_whole_millis() {
        let config = RunnerConfig::default().with_timeout(Duration::from_micros(300));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1)));

        let config = RunnerConfig::default().with_timeout(Duration::from_micros(2_500));
        assert_eq!(config.timeout(), Some(Duration::from_millis(3)));

        let config = RunnerConfig::default().with_timeout(Duration::from_millis(250));
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));

        let config = RunnerConfig::default().with_timeout(Duration::MAX);
        assert_eq!(config.timeout(), Some(Duration::from_millis(u64::MAX)));
    }

    #[test]
    fn defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.link_capacity, DEFAULT_LINK_CAPACITY);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_ms = 1500").unwrap();

        let config = RunnerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.link_capacity, DEFAULT_LINK_CAPACITY);
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn rendezvous_capacity_parses() {
        let config: RunnerConfig = toml::from_str("link_capacity = 0").unwrap();
        assert_eq!(config.link_capacity, 0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "link_capacity = \"lots\"").unwrap();

        assert!(RunnerConfig::load_from(file.path()).is_err());
    }
}
