//! Engine configuration
//!
//! Tunables for storage overflow handling and decomposition limits, stored
//! as TOML. A missing file yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Storage overflow tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Free slots at or below which overflow handling kicks in
    pub min_free_slots: u32,

    /// Manhattan radius searched for an existing container
    pub container_search_radius: u32,

    /// Build and place a container when none is found in range
    pub auto_place_container: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            min_free_slots: 3,
            container_search_radius: 16,
            auto_place_container: true,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Decomposition recursion bound; branches deeper than this are dropped
    /// with a diagnostic
    pub max_decomposition_depth: usize,

    /// Override for the completion journal location
    pub journal_path: Option<PathBuf>,

    pub storage: StorageConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            storage: StorageConfig::default(),
            max_decomposition_depth: 16,
            journal_path: None,
        }
    }

    /// Loads configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: EngineConfig = toml::from_str(&raw)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Writes configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, raw).with_context(|| format!("Failed to write config: {}", path.display()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_decomposition_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_decomposition_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The journal path to use: the configured override, the per-user data
    /// directory, or a local fallback
    pub fn journal_path(&self) -> PathBuf {
        if let Some(path) = &self.journal_path {
            return path.clone();
        }
        default_journal_path()
    }
}

/// Per-user default journal location
pub fn default_journal_path() -> PathBuf {
    ProjectDirs::from("", "", "quarry")
        .map(|dirs| dirs.data_dir().join("journal.jsonl"))
        .unwrap_or_else(|| PathBuf::from("quarry-journal.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sensible() {
        let config = EngineConfig::new();
        assert_eq!(config.storage.min_free_slots, 3);
        assert_eq!(config.storage.container_search_radius, 16);
        assert!(config.storage.auto_place_container);
        assert_eq!(config.max_decomposition_depth, 16);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::new());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = EngineConfig::new();
        config.storage.min_free_slots = 5;
        config.storage.auto_place_container = false;
        config.journal_path = Some(dir.path().join("journal.jsonl"));

        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[storage]\nmin_free_slots = 1\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.storage.min_free_slots, 1);
        assert_eq!(config.storage.container_search_radius, 16);
    }

    #[test]
    fn zero_depth_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_decomposition_depth = 0\n").unwrap();

        assert!(EngineConfig::load(&path).is_err());
    }

    #[test]
    fn journal_path_prefers_override() {
        let mut config = EngineConfig::new();
        config.journal_path = Some(PathBuf::from("/tmp/j.jsonl"));
        assert_eq!(config.journal_path(), PathBuf::from("/tmp/j.jsonl"));
    }
}
