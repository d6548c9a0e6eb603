//! Inference over the loaded artifact set.
//!
//! A `Predictor` is built once from an [`ArtifactStore`] and does not change
//! until [`Predictor::reload`] is called. Targets without a usable model are
//! simply absent from a [`Prediction`]; filling them in is the caller's job
//! (see [`crate::advisor`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::dataset::{CaseDescriptor, FeatureColumn, Target};
use crate::error::Result;
use crate::features::{FeatureEncoder, UnknownLabel};
use crate::trainer::{TrainedTargetModel, TrainingRun};

/// Model output for one case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub values: BTreeMap<Target, f64>,
    /// Static per-family confidence in [0, 1], keyed like `values`
    pub confidence: BTreeMap<Target, f64>,
    /// Labels the vocabularies had never seen; their placeholder code was used
    pub unknown_labels: Vec<UnknownLabel>,
}

#[derive(Debug, Clone, Default)]
pub struct Predictor {
    encoder: FeatureEncoder,
    schema: Vec<FeatureColumn>,
    models: BTreeMap<Target, TrainedTargetModel>,
}

impl Predictor {
    /// A predictor with no models. Every prediction is empty.
    pub fn untrained() -> Self {
        Self::default()
    }

    /// Use the output of an in-memory training pass directly.
    pub fn from_run(run: TrainingRun) -> Self {
        Self {
            encoder: run.encoder,
            schema: run.schema,
            models: run.models,
        }
    }

    /// Load whatever the store holds.
    ///
    /// Missing pieces degrade to "not trained": no schema or a missing
    /// vocabulary means no targets, and a target whose model does not match
    /// the schema is left out. Corrupt files are errors.
    pub fn load(store: &ArtifactStore) -> Result<Self> {
        let Some(schema) = store.load_schema()? else {
            warn!("No feature schema in {:?}; no models loaded", store.dir());
            return Ok(Self::untrained());
        };

        let mut vocabularies = Vec::new();
        for column in &schema {
            if let FeatureColumn::Encoded(cat) = column {
                match store.load_encoder(*cat)? {
                    Some(vocabulary) => vocabularies.push(vocabulary),
                    None => {
                        warn!("Missing {} vocabulary; no models loaded", cat);
                        return Ok(Self::untrained());
                    }
                }
            }
        }

        let mut models = BTreeMap::new();
        for target in Target::ALL {
            let Some(model) = store.load(target)? else {
                continue;
            };
            if model.schema != schema || model.scaler.n_features() != schema.len() {
                warn!(
                    "{} model was trained on a different feature schema; ignoring it",
                    target
                );
                continue;
            }
            models.insert(target, model);
        }

        info!(
            "Loaded {} trained targets from {:?}",
            models.len(),
            store.dir()
        );
        Ok(Self {
            encoder: FeatureEncoder::from_vocabularies(vocabularies),
            schema,
            models,
        })
    }

    /// Replace the loaded models with the store's current contents.
    ///
    /// On error the previous models stay in place.
    pub fn reload(&mut self, store: &ArtifactStore) -> Result<()> {
        *self = Self::load(store)?;
        Ok(())
    }

    pub fn trained_targets(&self) -> Vec<Target> {
        self.models.keys().copied().collect()
    }

    pub fn model(&self, target: Target) -> Option<&TrainedTargetModel> {
        self.models.get(&target)
    }

    pub fn is_trained(&self) -> bool {
        !self.models.is_empty()
    }

    /// Encode, scale and run every loaded model on one case.
    pub fn predict(&self, case: &CaseDescriptor) -> Prediction {
        let mut prediction = Prediction::default();
        if self.models.is_empty() {
            return prediction;
        }

        let encoded = self.encoder.case_features(case, &self.schema);
        for unknown in &encoded.unknown_labels {
            warn!(
                "Unseen {} '{}'; using the placeholder code",
                unknown.column, unknown.label
            );
        }

        for (target, model) in &self.models {
            match model.predict_features(&encoded.values) {
                Ok(value) => {
                    debug!("{} = {:.3} ({})", target, value, model.family);
                    prediction.values.insert(*target, value);
                    prediction.confidence.insert(*target, model.confidence);
                }
                Err(e) => warn!("Skipping {} prediction: {}", target, e),
            }
        }
        prediction.unknown_labels = encoded.unknown_labels;
        prediction
    }
}
