//! Configuration infrastructure
//!
//! Contains configuration loading and management for the reconciliation
//! engine.
//!
//! Configuration is organized into tiers mirroring who owns each knob:
//! 1. Matcher tuning (heuristic weights, validated empirically)
//! 2. Selection/undo behavior
//! 3. Lineage edit policy
//! 4. Logging

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::application::lineage_editor::DEFAULT_RESTRICTED_TYPES;
use crate::domain::services::matcher::MatcherWeights;
use crate::domain::undo::DEFAULT_UNDO_DEPTH;

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Matcher scoring weights and acceptance threshold
    pub matcher: MatcherWeights,

    /// Selection persistence and undo behavior
    pub selection: SelectionConfig,

    /// Lineage edit policy
    pub lineage: LineageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Selection persistence and undo settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Maximum undo snapshots retained per session
    pub undo_depth: usize,

    /// Deadline for persistence calls; a timeout rolls back like a failure
    pub persist_timeout_ms: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            undo_depth: DEFAULT_UNDO_DEPTH,
            persist_timeout_ms: 5_000,
        }
    }
}

/// Lineage edit policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageConfig {
    /// Product types whose lineage may not be edited
    pub restricted_product_types: Vec<String>,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            restricted_product_types: DEFAULT_RESTRICTED_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Write logs to a rotating file in addition to the console
    pub file_logging: bool,

    /// Directory for log files; defaults next to the config file
    pub log_dir: Option<PathBuf>,

    /// Emit structured JSON instead of human-readable lines
    pub json_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: None,
            json_output: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherWeights::default(),
            selection: SelectionConfig::default(),
            lineage: LineageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default config file location under the platform config directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tag-reconciler")
            .join("config.json")
    }

    /// Loads configuration from a JSON file, falling back to defaults when
    /// the file does not exist yet.
    pub async fn load(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Writes the configuration back as pretty-printed JSON, creating the
    /// parent directory when needed.
    pub async fn save(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create config dir: {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .await
            .with_context(|| format!("failed to write config file: {}", path.display()))?;
        info!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.selection.undo_depth, DEFAULT_UNDO_DEPTH);
        assert!(config.selection.persist_timeout_ms > 0);
        assert!(config.matcher.accept_threshold > 0.0);
        assert!(!config.lineage.restricted_product_types.is_empty());
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.selection.undo_depth = 7;
        config.matcher.accept_threshold = 0.6;
        config.save(&path).await.unwrap();

        let loaded = AppConfig::load(&path).await.unwrap();
        assert_eq!(loaded.selection.undo_depth, 7);
        assert!((loaded.matcher.accept_threshold - 0.6).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load(&PathBuf::from("/nonexistent/config.json"))
            .await
            .unwrap();
        assert_eq!(config.selection.undo_depth, DEFAULT_UNDO_DEPTH);
    }

    #[test]
    fn partial_config_files_fill_missing_sections_with_defaults() {
        let partial = r#"{"selection": {"undo_depth": 3}}"#;
        let config: AppConfig = serde_json::from_str(partial).unwrap();
        assert_eq!(config.selection.undo_depth, 3);
        assert_eq!(config.selection.persist_timeout_ms, 5_000);
        assert!(!config.lineage.restricted_product_types.is_empty());
    }
}
