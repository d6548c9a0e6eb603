//! Assembly of model input vectors from case descriptors.
//!
//! Training and inference both go through [`FeatureEncoder`], so the column
//! order and categorical codes are produced by the same code path.

use serde::{Deserialize, Serialize};

use crate::dataset::{CaseDescriptor, CategoricalColumn, FeatureColumn};
use crate::model::LabelVocabulary;

/// A categorical value that was not part of the training vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownLabel {
    pub column: CategoricalColumn,
    pub label: String,
}

/// Input vector for one case, plus the labels that fell into the
/// placeholder bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCase {
    pub values: Vec<f64>,
    pub unknown_labels: Vec<UnknownLabel>,
}

/// The frozen vocabularies for every categorical column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureEncoder {
    vocabularies: Vec<LabelVocabulary>,
}

impl FeatureEncoder {
    /// Fit one vocabulary per categorical column over the whole corpus.
    pub fn fit<'a, I>(cases: I) -> Self
    where
        I: IntoIterator<Item = &'a CaseDescriptor>,
    {
        let cases: Vec<&CaseDescriptor> = cases.into_iter().collect();
        let vocabularies = CategoricalColumn::ALL
            .iter()
            .map(|&column| LabelVocabulary::fit(column, cases.iter().map(|c| c.label(column))))
            .collect();
        Self { vocabularies }
    }

    pub fn from_vocabularies(vocabularies: Vec<LabelVocabulary>) -> Self {
        Self { vocabularies }
    }

    pub fn vocabulary(&self, column: CategoricalColumn) -> Option<&LabelVocabulary> {
        self.vocabularies.iter().find(|v| v.column == column)
    }

    pub fn vocabularies(&self) -> &[LabelVocabulary] {
        &self.vocabularies
    }

    /// Feature vector for a training row, or `None` when a numeric feature
    /// is missing or not finite.
    pub fn training_features(
        &self,
        case: &CaseDescriptor,
        schema: &[FeatureColumn],
    ) -> Option<Vec<f64>> {
        schema
            .iter()
            .map(|&column| match column {
                FeatureColumn::Encoded(cat) => Some(self.code(cat, case.label(cat)).0),
                numeric => case.numeric(numeric).filter(|v| v.is_finite()),
            })
            .collect()
    }

    /// Feature vector for inference. Missing numeric values become 0 and
    /// unseen labels take the placeholder code.
    pub fn case_features(&self, case: &CaseDescriptor, schema: &[FeatureColumn]) -> EncodedCase {
        let mut unknown_labels = Vec::new();
        let values = schema
            .iter()
            .map(|&column| match column {
                FeatureColumn::Encoded(cat) => {
                    let label = case.label(cat);
                    let (code, known) = self.code(cat, label);
                    if !known {
                        unknown_labels.push(UnknownLabel {
                            column: cat,
                            label: label.unwrap_or_default().to_string(),
                        });
                    }
                    code
                }
                numeric => case
                    .numeric(numeric)
                    .filter(|v| v.is_finite())
                    .unwrap_or(0.0),
            })
            .collect();

        EncodedCase {
            values,
            unknown_labels,
        }
    }

    /// Code for a label and whether the vocabulary knew it.
    fn code(&self, column: CategoricalColumn, label: Option<&str>) -> (f64, bool) {
        match self.vocabulary(column) {
            Some(vocab) => match vocab.lookup(label) {
                Some(code) => (code as f64, true),
                None => (vocab.unknown_code() as f64, false),
            },
            None => (0.0, false),
        }
    }
}
