//! Project configuration file support for tapmon.
//!
//! Loads configuration from `tapmon.toml` in the working directory. Every
//! field has a default, so the file is optional and may be partial.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use tapmon_render::CacheLimits;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "tapmon.toml";

/// Project-level configuration loaded from `tapmon.toml`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProjectConfig {
    /// Directory the producer drops CSV files into
    pub samples_dir: PathBuf,
    /// HTTP listen port
    pub port: u16,
    /// Seconds between directory scans
    pub poll_interval_secs: u64,
    /// Seconds to wait after a failed scan before retrying
    pub error_backoff_secs: u64,
    /// Maximum sessions included in a snapshot (newest first)
    pub snapshot_max: usize,
    /// Seconds a single chart render may take before the request gives up
    pub render_timeout_secs: u64,
    /// Where display-name overrides are persisted
    pub names_file: PathBuf,
    /// Optional directory for artifacts to survive restarts
    pub artifacts_dir: Option<PathBuf>,
    /// Artifact cache bounds
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub evict_chunk: usize,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            samples_dir: PathBuf::from("samples"),
            port: 8000,
            poll_interval_secs: 2,
            error_backoff_secs: 5,
            snapshot_max: 20,
            render_timeout_secs: 5,
            names_file: PathBuf::from("names.json"),
            artifacts_dir: None,
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let limits = CacheLimits::default();
        Self {
            max_entries: limits.max_entries,
            evict_chunk: limits.evict_chunk,
        }
    }
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn cache_limits(&self) -> CacheLimits {
        CacheLimits {
            max_entries: self.cache.max_entries,
            evict_chunk: self.cache.evict_chunk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "port = 9100\n\n[cache]\nmax_entries = 50\n",
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.cache.evict_chunk, 20);
        assert_eq!(config.samples_dir, PathBuf::from("samples"));
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "prot = 9100\n").unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }
}
