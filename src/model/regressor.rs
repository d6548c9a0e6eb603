use serde::{Deserialize, Serialize};
use std::fmt;

use super::boosting::GradientBoostingRegressor;
use super::forest::RandomForestRegressor;
use super::matrix::Matrix;
use crate::config::TrainingConfig;
use crate::error::Result;

/// Confidence reported for settings produced by the rule-based fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.6;

/// Candidate learning algorithms, in selection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    RandomForest,
    GradientBoosting,
}

impl ModelFamily {
    /// Tried in this order; earlier families win ties.
    pub const CANDIDATES: [ModelFamily; 2] =
        [ModelFamily::RandomForest, ModelFamily::GradientBoosting];

    /// Static confidence attached to every prediction from this family.
    ///
    /// A fixed placeholder, not a prediction interval.
    pub fn confidence(self) -> f64 {
        match self {
            ModelFamily::RandomForest => 0.7,
            ModelFamily::GradientBoosting => 0.7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::GradientBoosting => "gradient_boosting",
        }
    }

    /// An unfitted regressor of this family with the configured hyperparameters.
    pub fn build(self, config: &TrainingConfig) -> Regressor {
        match self {
            ModelFamily::RandomForest => Regressor::RandomForest(
                RandomForestRegressor::new(config.n_estimators)
                    .with_max_depth(config.forest_depth_limit())
                    .with_random_state(config.random_state),
            ),
            ModelFamily::GradientBoosting => Regressor::GradientBoosting(
                GradientBoostingRegressor::new(config.n_estimators)
                    .with_learning_rate(config.learning_rate)
                    .with_max_depth(config.boosting_max_depth),
            ),
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A regressor of any candidate family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "params", rename_all = "snake_case")]
pub enum Regressor {
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
}

impl Regressor {
    pub fn family(&self) -> ModelFamily {
        match self {
            Regressor::RandomForest(_) => ModelFamily::RandomForest,
            Regressor::GradientBoosting(_) => ModelFamily::GradientBoosting,
        }
    }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<()> {
        match self {
            Regressor::RandomForest(m) => m.fit(x, y),
            Regressor::GradientBoosting(m) => m.fit(x, y),
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Regressor::RandomForest(m) => m.predict_row(row),
            Regressor::GradientBoosting(m) => m.predict_row(row),
        }
    }

    pub fn predict(&self, x: &Matrix) -> Vec<f64> {
        (0..x.n_rows()).map(|r| self.predict_row(x.row(r))).collect()
    }

    /// Copy of the hyperparameters with no fitted state.
    /// Verify a deserialized model can run on `n_features` inputs.
    pub fn check(&self, n_features: usize) -> std::result::Result<(), String> {
        match self {
            Regressor::RandomForest(m) => m.check(n_features),
            Regressor::GradientBoosting(m) => m.check(n_features),
        }
    }

    pub fn unfitted(&self) -> Regressor {
        match self {
            Regressor::RandomForest(m) => Regressor::RandomForest(m.unfitted()),
            Regressor::GradientBoosting(m) => Regressor::GradientBoosting(m.unfitted()),
        }
    }
}
