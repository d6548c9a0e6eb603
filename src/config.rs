//! Engine configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all) is a
//! valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::WeldError;

// ===== TRAINING =====

/// Hyperparameters and data-handling thresholds for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Targets with fewer usable rows are skipped, not trained
    pub min_training_samples: usize,
    pub cv_folds: usize,
    /// Held-out fraction used only for diagnostics
    pub test_size: f64,
    pub random_state: u64,
    /// Trees in the forest and stages in the boosting ensemble
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub boosting_max_depth: usize,
    /// 0 grows forest trees until their leaves are pure
    pub forest_max_depth: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_training_samples: 10,
            cv_folds: 5,
            test_size: 0.2,
            random_state: 42,
            n_estimators: 100,
            learning_rate: 0.1,
            boosting_max_depth: 3,
            forest_max_depth: 0,
        }
    }
}

impl TrainingConfig {
    pub fn forest_depth_limit(&self) -> Option<usize> {
        match self.forest_max_depth {
            0 => None,
            depth => Some(depth),
        }
    }

    /// Reject settings the split and model-selection steps cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.cv_folds < 2 {
            return Err(WeldError::Config(format!(
                "training.cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(WeldError::Config(format!(
                "training.test_size must be between 0 and 1, got {}",
                self.test_size
            )));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(WeldError::Config(format!(
                "training.learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

// ===== PATHS =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the persisted artifacts
    pub model_dir: PathBuf,
    /// SQLite database with the historical weld records
    pub database: PathBuf,
    /// Validation rules file; empty uses the embedded rules
    pub rules: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let root = data_root();
        Self {
            model_dir: root.join("models"),
            database: root.join("weld_parameters.db"),
            rules: PathBuf::new(),
        }
    }
}

impl PathsConfig {
    pub fn rules_override(&self) -> Option<&Path> {
        if self.rules.as_os_str().is_empty() {
            None
        } else {
            Some(&self.rules)
        }
    }
}

/// `<data dir>/weldmate`, or `./weldmate` when the platform has no data dir.
fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("weldmate")
}

// ===== ENGINE =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub training: TrainingConfig,
    pub paths: PathsConfig,
}

impl EngineConfig {
    /// Read and check a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config
            .training
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
