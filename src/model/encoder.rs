//! Label encoding for the categorical descriptors.
//!
//! Codes are baked into every persisted model, so a vocabulary is fit once
//! from the training corpus and then frozen.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::dataset::CategoricalColumn;

/// Placeholder for missing or blank labels. Always part of a fitted
/// vocabulary, and the bucket that unseen labels fall into at inference.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Frozen label → code mapping for one categorical column.
///
/// Codes are positions in the sorted label list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVocabulary {
    pub column: CategoricalColumn,
    labels: Vec<String>,
}

impl LabelVocabulary {
    /// Build a vocabulary from every label seen in the corpus.
    pub fn fit<'a, I>(column: CategoricalColumn, labels: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut distinct: BTreeSet<String> = labels
            .into_iter()
            .map(|l| normalize(l).to_string())
            .collect();
        distinct.insert(UNKNOWN_LABEL.to_string());

        Self {
            column,
            labels: distinct.into_iter().collect(),
        }
    }

    /// Code for a label the vocabulary has seen, `None` otherwise.
    pub fn lookup(&self, label: Option<&str>) -> Option<usize> {
        let label = normalize(label);
        self.labels.iter().position(|l| l == label)
    }

    /// Code for any label. Unseen labels get the placeholder's code.
    pub fn encode(&self, label: Option<&str>) -> usize {
        self.lookup(label).unwrap_or_else(|| self.unknown_code())
    }

    pub fn unknown_code(&self) -> usize {
        self.labels
            .iter()
            .position(|l| l == UNKNOWN_LABEL)
            .unwrap_or(0)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn normalize(label: Option<&str>) -> &str {
    match label {
        Some(l) if !l.trim().is_empty() => l,
        _ => UNKNOWN_LABEL,
    }
}
