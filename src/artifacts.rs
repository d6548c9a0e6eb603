//! Persistence of fitted models, scalers, vocabularies and the feature schema.
//!
//! One JSON file per artifact in a flat directory:
//!
//! ```text
//! <model_dir>/
//!   feature_columns.json
//!   process_encoder.json  position_encoder.json  joint_type_encoder.json
//!   voltage_model.json    voltage_scaler.json
//!   ...
//! ```
//!
//! A missing file is `Ok(None)` ("not trained"), while a file that exists
//! but cannot be parsed is an error.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::dataset::{schema_names, CategoricalColumn, FeatureColumn, Target};
use crate::error::{Result, WeldError};
use crate::model::{LabelVocabulary, ModelFamily, Regressor, StandardScaler};
use crate::trainer::{ModelDiagnostics, TrainedTargetModel};

const SCHEMA_FILE: &str = "feature_columns.json";

/// On-disk form of a model: the fitted regressor plus the metadata recorded
/// when it was selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub target: Target,
    pub family: ModelFamily,
    pub confidence: f64,
    pub feature_columns: Vec<String>,
    pub cv_mean_r2: f64,
    pub cv_std_r2: f64,
    pub test_r2: f64,
    pub test_rmse: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub trained_at: DateTime<Utc>,
    pub model: Regressor,
}

impl ModelArtifact {
    fn from_trained(trained: &TrainedTargetModel) -> Self {
        let d = &trained.diagnostics;
        Self {
            target: trained.target,
            family: trained.family,
            confidence: trained.confidence,
            feature_columns: schema_names(&trained.schema),
            cv_mean_r2: d.cv_mean_r2,
            cv_std_r2: d.cv_std_r2,
            test_r2: d.test_r2,
            test_rmse: d.test_rmse,
            n_train: d.n_train,
            n_test: d.n_test,
            trained_at: d.trained_at,
            model: trained.model.clone(),
        }
    }

    fn into_trained(self, scaler: StandardScaler) -> Result<TrainedTargetModel> {
        let schema = parse_schema(&self.feature_columns)?;
        if self.model.family() != self.family {
            return Err(WeldError::Artifact(format!(
                "{} model declares family {} but holds {}",
                self.target,
                self.family,
                self.model.family()
            )));
        }
        if scaler.n_features() != schema.len() {
            return Err(WeldError::Artifact(format!(
                "{} scaler expects {} features, schema has {}",
                self.target,
                scaler.n_features(),
                schema.len()
            )));
        }
        self.model
            .check(schema.len())
            .map_err(|e| WeldError::Artifact(format!("{} model is corrupt: {}", self.target, e)))?;

        Ok(TrainedTargetModel {
            target: self.target,
            family: self.family,
            confidence: self.confidence,
            schema,
            scaler,
            model: self.model,
            diagnostics: ModelDiagnostics {
                cv_mean_r2: self.cv_mean_r2,
                cv_std_r2: self.cv_std_r2,
                test_r2: self.test_r2,
                test_rmse: self.test_rmse,
                n_train: self.n_train,
                n_test: self.n_test,
                trained_at: self.trained_at,
            },
        })
    }
}

/// Directory-backed store. The only place the engine touches the filesystem
/// for models.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ----- save -----

    /// Write the model and scaler blobs for one target, replacing any
    /// previous version.
    pub fn save(&self, trained: &TrainedTargetModel) -> Result<()> {
        self.write_json(
            &self.model_path(trained.target),
            &ModelArtifact::from_trained(trained),
        )?;
        self.write_json(&self.scaler_path(trained.target), &trained.scaler)?;
        info!("Saved {} model ({})", trained.target, trained.family);
        Ok(())
    }

    pub fn save_encoder(&self, vocabulary: &LabelVocabulary) -> Result<()> {
        self.write_json(&self.encoder_path(vocabulary.column), vocabulary)
    }

    pub fn save_schema(&self, schema: &[FeatureColumn]) -> Result<()> {
        self.write_json(&self.dir.join(SCHEMA_FILE), &schema_names(schema))
    }

    /// Delete the model and scaler for a target, if present.
    pub fn remove(&self, target: Target) -> Result<()> {
        for path in [self.model_path(target), self.scaler_path(target)] {
            match std::fs::remove_file(&path) {
                Ok(()) => info!("Removed stale artifact {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    // ----- load -----

    /// Model and scaler for a target. `None` unless both blobs exist.
    pub fn load(&self, target: Target) -> Result<Option<TrainedTargetModel>> {
        let artifact: Option<ModelArtifact> = self.read_json(&self.model_path(target))?;
        let scaler: Option<StandardScaler> = self.read_json(&self.scaler_path(target))?;

        match (artifact, scaler) {
            (Some(artifact), Some(scaler)) => {
                if artifact.target != target {
                    return Err(WeldError::Artifact(format!(
                        "{:?} holds a model for {}",
                        self.model_path(target),
                        artifact.target
                    )));
                }
                artifact.into_trained(scaler).map(Some)
            }
            (None, None) => {
                debug!("No artifacts for {}", target);
                Ok(None)
            }
            (Some(_), None) | (None, Some(_)) => {
                warn!("Incomplete artifacts for {}, treating as untrained", target);
                Ok(None)
            }
        }
    }

    pub fn load_encoder(&self, column: CategoricalColumn) -> Result<Option<LabelVocabulary>> {
        let vocabulary: Option<LabelVocabulary> = self.read_json(&self.encoder_path(column))?;
        match vocabulary {
            Some(v) if v.column != column => Err(WeldError::Artifact(format!(
                "{:?} holds the {} vocabulary",
                self.encoder_path(column),
                v.column
            ))),
            other => Ok(other),
        }
    }

    pub fn load_schema(&self) -> Result<Option<Vec<FeatureColumn>>> {
        let names: Option<Vec<String>> = self.read_json(&self.dir.join(SCHEMA_FILE))?;
        names.map(|n| parse_schema(&n)).transpose()
    }

    // ----- paths and I/O -----

    fn model_path(&self, target: Target) -> PathBuf {
        self.dir.join(format!("{}_model.json", target.as_str()))
    }

    fn scaler_path(&self, target: Target) -> PathBuf {
        self.dir.join(format!("{}_scaler.json", target.as_str()))
    }

    fn encoder_path(&self, column: CategoricalColumn) -> PathBuf {
        self.dir.join(format!("{}_encoder.json", column.as_str()))
    }

    /// Serialize to a temp file in the store directory, then rename over the
    /// destination.
    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        std::fs::create_dir_all(&self.dir)?;

        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.persist(path).map_err(|e| e.error)?;

        debug!("Wrote artifact {:?}", path);
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt artifact {:?}", path))
            .map_err(|e| WeldError::Artifact(format!("{:#}", e)))?;
        Ok(Some(value))
    }
}

fn parse_schema(names: &[String]) -> Result<Vec<FeatureColumn>> {
    names
        .iter()
        .map(|name| {
            FeatureColumn::from_name(name).ok_or_else(|| {
                WeldError::Artifact(format!("Unknown feature column '{}' in schema", name))
            })
        })
        .collect()
}
