//! Per-target model training and selection.
//!
//! For each target the trainer:
//! 1. Keeps rows whose features are complete and whose target is present
//! 2. Skips the target if fewer than `min_training_samples` rows remain
//! 3. Splits train/test with a fixed seed and fits the scaler on train only
//! 4. Cross-validates every candidate family on the train split
//! 5. Refits the best candidate on the whole train split
//! 6. Scores it once on the test split for diagnostics
//!
//! The test split never influences which family is selected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::artifacts::ArtifactStore;
use crate::config::TrainingConfig;
use crate::dataset::{FeatureColumn, Target, TrainingRow, TrainingSource, DEFAULT_SCHEMA};
use crate::error::{Result, WeldError};
use crate::features::FeatureEncoder;
use crate::model::matrix::select;
use crate::model::metrics::{r2_score, rmse};
use crate::model::selection::{best_candidate, cross_val_score, train_test_split};
use crate::model::{KFold, Matrix, ModelFamily, Regressor, StandardScaler};

/// Smallest row count the split and cross-validation steps can work with.
const MIN_FIT_ROWS: usize = 3;

// ===== TRAINED MODELS =====

/// Scores recorded when a model was selected. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    pub cv_mean_r2: f64,
    pub cv_std_r2: f64,
    pub test_r2: f64,
    pub test_rmse: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub trained_at: DateTime<Utc>,
}

/// Everything needed to reproduce predictions for one target.
///
/// Immutable once built; retraining replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedTargetModel {
    pub target: Target,
    pub family: ModelFamily,
    /// Static confidence of `family`, fixed at training time
    pub confidence: f64,
    /// Input columns in the order the scaler and model expect them
    pub schema: Vec<FeatureColumn>,
    pub scaler: StandardScaler,
    pub model: Regressor,
    pub diagnostics: ModelDiagnostics,
}

impl TrainedTargetModel {
    /// Scale an assembled feature vector and run the model on it.
    pub fn predict_features(&self, features: &[f64]) -> Result<f64> {
        let scaled = self.scaler.transform_row(features)?;
        Ok(self.model.predict_row(&scaled))
    }
}

// ===== REPORT =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetOutcome {
    Trained {
        family: ModelFamily,
        cv_mean_r2: f64,
        cv_std_r2: f64,
        test_r2: f64,
        test_rmse: f64,
        n_train: usize,
        n_test: usize,
    },
    /// Too few usable rows; the fallback covers this target
    Skipped { available: usize, required: usize },
    /// Fitting failed for this target only
    Failed { reason: String },
}

impl TargetOutcome {
    pub fn is_trained(&self) -> bool {
        matches!(self, TargetOutcome::Trained { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub rows_loaded: usize,
    /// Rows with a missing or non-finite feature value
    pub rows_dropped: usize,
    pub targets: BTreeMap<Target, TargetOutcome>,
}

impl TrainingReport {
    pub fn trained_targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .filter(|(_, outcome)| outcome.is_trained())
            .map(|(target, _)| *target)
            .collect()
    }
}

/// Output of an in-memory training pass, before anything is persisted.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub encoder: FeatureEncoder,
    pub schema: Vec<FeatureColumn>,
    pub models: BTreeMap<Target, TrainedTargetModel>,
    pub report: TrainingReport,
}

// ===== TRAINER =====

pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Read the training table, train every target and persist the results.
    ///
    /// An unreachable source is the only failure that aborts the run. Every
    /// earlier model is removed before the new schema and vocabularies are
    /// written, so targets that were not trained fall back to the rules.
    pub fn train_and_save(
        &self,
        source: &dyn TrainingSource,
        store: &ArtifactStore,
    ) -> Result<TrainingReport> {
        let rows = source.training_rows()?;
        let run = self.train(&rows)?;

        // No model may sit next to vocabularies it was not encoded with
        for target in Target::ALL {
            store.remove(target)?;
        }
        store.save_schema(&run.schema)?;
        for vocabulary in run.encoder.vocabularies() {
            store.save_encoder(vocabulary)?;
        }
        for model in run.models.values() {
            store.save(model)?;
        }

        info!(
            "Training complete: {}/{} targets trained",
            run.models.len(),
            Target::ALL.len()
        );
        Ok(run.report)
    }

    /// Train every target from in-memory rows.
    ///
    /// Fails with `WeldError::Config` before touching the rows if the
    /// training settings are unusable.
    pub fn train(&self, rows: &[TrainingRow]) -> Result<TrainingRun> {
        self.config.validate()?;

        let schema = DEFAULT_SCHEMA.to_vec();
        let encoder = FeatureEncoder::fit(rows.iter().map(|r| &r.case));

        let prepared: Vec<(Vec<f64>, &TrainingRow)> = rows
            .iter()
            .filter_map(|row| {
                encoder
                    .training_features(&row.case, &schema)
                    .map(|features| (features, row))
            })
            .collect();

        let mut report = TrainingReport {
            rows_loaded: rows.len(),
            rows_dropped: rows.len() - prepared.len(),
            targets: BTreeMap::new(),
        };
        info!("Loaded {} training rows", rows.len());
        if report.rows_dropped > 0 {
            warn!(
                "Dropped {} rows with incomplete features",
                report.rows_dropped
            );
        }

        let required = self.config.min_training_samples.max(MIN_FIT_ROWS);
        let mut models = BTreeMap::new();
        for target in Target::ALL {
            let (features, y): (Vec<Vec<f64>>, Vec<f64>) = prepared
                .iter()
                .filter_map(|(features, row)| row.target(target).map(|v| (features.clone(), v)))
                .unzip();

            if y.len() < required {
                warn!(
                    "Skipping {}: {} usable rows, need {}",
                    target,
                    y.len(),
                    required
                );
                report.targets.insert(
                    target,
                    TargetOutcome::Skipped {
                        available: y.len(),
                        required,
                    },
                );
                continue;
            }

            let outcome = Matrix::from_rows(&features)
                .and_then(|x| self.train_target(target, &schema, &x, &y));
            match outcome {
                Ok(model) => {
                    let d = &model.diagnostics;
                    report.targets.insert(
                        target,
                        TargetOutcome::Trained {
                            family: model.family,
                            cv_mean_r2: d.cv_mean_r2,
                            cv_std_r2: d.cv_std_r2,
                            test_r2: d.test_r2,
                            test_rmse: d.test_rmse,
                            n_train: d.n_train,
                            n_test: d.n_test,
                        },
                    );
                    models.insert(target, model);
                }
                Err(e) => {
                    warn!("Training {} failed: {}", target, e);
                    report.targets.insert(
                        target,
                        TargetOutcome::Failed {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }

        Ok(TrainingRun {
            encoder,
            schema,
            models,
            report,
        })
    }

    /// Split with the configured seed, then select and fit.
    pub fn train_target(
        &self,
        target: Target,
        schema: &[FeatureColumn],
        x: &Matrix,
        y: &[f64],
    ) -> Result<TrainedTargetModel> {
        let (train, test) =
            train_test_split(x.n_rows(), self.config.test_size, self.config.random_state)?;
        self.fit_split(target, schema, x, y, &train, &test)
    }

    /// Select a family by cross-validation on `train`, refit it on all of
    /// `train` and score it on `test`.
    pub fn fit_split(
        &self,
        target: Target,
        schema: &[FeatureColumn],
        x: &Matrix,
        y: &[f64],
        train: &[usize],
        test: &[usize],
    ) -> Result<TrainedTargetModel> {
        let (scaler, x_train) = StandardScaler::fit_transform(&x.select_rows(train))?;
        let y_train = select(y, train);
        let x_test = scaler.transform(&x.select_rows(test))?;
        let y_test = select(y, test);

        let folds = KFold::new(self.config.cv_folds.min(train.len())).split(train.len())?;

        let candidates: Vec<Regressor> = ModelFamily::CANDIDATES
            .iter()
            .map(|family| family.build(&self.config))
            .collect();
        let mut results = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let cv = cross_val_score(candidate, &x_train, &y_train, &folds)?;
            info!(
                "{} {}: CV R2 = {:.4} (+/- {:.4})",
                target,
                candidate.family(),
                cv.mean(),
                cv.std() * 2.0
            );
            results.push(cv);
        }

        let best = best_candidate(&results).ok_or_else(|| {
            WeldError::Training(format!("No candidate produced a usable CV score for {}", target))
        })?;

        let mut model = candidates[best].unfitted();
        model.fit(&x_train, &y_train)?;
        let predicted = model.predict(&x_test);
        let test_r2 = r2_score(&y_test, &predicted);
        let test_rmse = rmse(&y_test, &predicted);

        let family = model.family();
        info!(
            "{}: selected {} (test R2 = {:.4}, RMSE = {:.4})",
            target, family, test_r2, test_rmse
        );

        Ok(TrainedTargetModel {
            target,
            family,
            confidence: family.confidence(),
            schema: schema.to_vec(),
            scaler,
            model,
            diagnostics: ModelDiagnostics {
                cv_mean_r2: results[best].mean(),
                cv_std_r2: results[best].std(),
                test_r2,
                test_rmse,
                n_train: train.len(),
                n_test: test.len(),
                trained_at: Utc::now(),
            },
        })
    }
}
