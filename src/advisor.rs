//! Caller-side composition of prediction, fallback and validation.
//!
//! [`Predictor`] only reports targets it has models for. The advisor fills
//! the rest from the rule-based fallback and tags where each value came
//! from, then optionally validates the combined settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::dataset::{CaseDescriptor, Process, Target};
use crate::fallback;
use crate::features::UnknownLabel;
use crate::model::FALLBACK_CONFIDENCE;
use crate::predictor::Predictor;
use crate::validation::{MaterialInfo, ValidationResult, Validator, WeldParameters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedValue {
    pub value: f64,
    pub confidence: f64,
    pub source: ValueSource,
}

/// All four settings for a case, plus advisory output when requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub settings: BTreeMap<Target, RecommendedValue>,
    pub unknown_labels: Vec<UnknownLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl Recommendation {
    /// The recommended settings as a validation input.
    pub fn parameters(&self, case: &CaseDescriptor) -> WeldParameters {
        let value = |t: Target| self.settings.get(&t).map(|v| v.value);
        WeldParameters {
            voltage: value(Target::Voltage),
            amperage: value(Target::Amperage),
            wire_feed_speed: value(Target::WireFeedSpeed),
            travel_speed: value(Target::TravelSpeed),
            thickness: case.thickness,
            process: case.process.clone(),
        }
    }
}

pub struct Advisor {
    predictor: Predictor,
    validator: Validator,
}

impl Advisor {
    pub fn new(predictor: Predictor, validator: Validator) -> Self {
        Self {
            predictor,
            validator,
        }
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn predictor_mut(&mut self) -> &mut Predictor {
        &mut self.predictor
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Model predictions where available, fallback estimates elsewhere.
    ///
    /// The fallback needs a thickness; a case without one is estimated at
    /// 0 mm, which the fallback floors keep within equipment minimums.
    pub fn recommend(&self, case: &CaseDescriptor) -> Recommendation {
        let prediction = self.predictor.predict(case);
        let process = Process::from_code(case.process.as_deref().unwrap_or_default());
        let estimate = fallback::estimate(&process, case.thickness.unwrap_or(0.0));

        let mut settings = BTreeMap::new();
        for target in Target::ALL {
            let value = match prediction.values.get(&target) {
                Some(&value) => RecommendedValue {
                    value,
                    confidence: prediction
                        .confidence
                        .get(&target)
                        .copied()
                        .unwrap_or(FALLBACK_CONFIDENCE),
                    source: ValueSource::Model,
                },
                None => RecommendedValue {
                    value: estimate.get(target),
                    confidence: FALLBACK_CONFIDENCE,
                    source: ValueSource::Fallback,
                },
            };
            settings.insert(target, value);
        }

        let from_fallback = settings
            .values()
            .filter(|v| v.source == ValueSource::Fallback)
            .count();
        if from_fallback > 0 {
            info!(
                "{} of {} settings from the {} fallback",
                from_fallback,
                Target::ALL.len(),
                process
            );
        }

        Recommendation {
            settings,
            unknown_labels: prediction.unknown_labels,
            validation: None,
            suggestions: Vec::new(),
        }
    }

    /// [`Advisor::recommend`] followed by validation and suggestions.
    pub fn recommend_validated(
        &self,
        case: &CaseDescriptor,
        material: Option<&MaterialInfo>,
    ) -> Recommendation {
        let mut recommendation = self.recommend(case);
        let params = recommendation.parameters(case);
        let result = self.validator.validate(&params, material);
        recommendation.suggestions = self.validator.suggest(&params, &result);
        recommendation.validation = Some(result);
        recommendation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Severity;

    fn case(process: &str, thickness: f64) -> CaseDescriptor {
        CaseDescriptor {
            thickness: Some(thickness),
            process: Some(process.to_string()),
            ..CaseDescriptor::default()
        }
    }

    #[test]
    fn test_untrained_uses_fallback_everywhere() {
        let advisor = Advisor::new(Predictor::untrained(), Validator::default());
        let rec = advisor.recommend(&case("GMAW", 6.0));

        assert_eq!(rec.settings.len(), 4);
        for value in rec.settings.values() {
            assert_eq!(value.source, ValueSource::Fallback);
            assert_eq!(value.confidence, FALLBACK_CONFIDENCE);
        }
        assert_eq!(rec.settings[&Target::Amperage].value, 280.0);
    }

    #[test]
    fn test_tig_fallback_validates_without_errors() {
        let advisor = Advisor::new(Predictor::untrained(), Validator::default());
        let rec = advisor.recommend_validated(&case("GTAW", 3.0), None);

        let validation = rec.validation.unwrap();
        assert!(validation.valid, "errors: {:?}", validation.errors);
        assert_eq!(rec.settings[&Target::WireFeedSpeed].value, 0.0);
        assert!(!rec.suggestions.is_empty());
    }

    #[test]
    fn test_validation_sees_case_context() {
        let advisor = Advisor::new(Predictor::untrained(), Validator::default());
        let c = case("GMAW", 6.0);
        let rec = advisor.recommend_validated(&c, None);

        let params = rec.parameters(&c);
        assert_eq!(params.thickness, Some(6.0));
        assert_eq!(params.process.as_deref(), Some("GMAW"));
        assert_ne!(rec.validation.unwrap().severity, Severity::Error);
    }
}
