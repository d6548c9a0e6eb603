//! Data splitting, cross-validation and candidate selection.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::matrix::{select, Matrix};
use super::metrics::r2_score;
use super::regressor::Regressor;
use crate::error::{Result, WeldError};

/// Shuffle `0..n_samples` with `seed` and hold out `ceil(n * test_size)` rows.
///
/// Returns `(train, test)` index lists. Both sides keep at least one row
/// whenever `n_samples >= 2`.
pub fn train_test_split(
    n_samples: usize,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if n_samples < 2 {
        return Err(WeldError::Training(format!(
            "Need at least 2 samples to split, got {}",
            n_samples
        )));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(WeldError::Training(format!(
            "test_size must be between 0 and 1, got {}",
            test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n_samples as f64 * test_size).ceil() as usize).clamp(1, n_samples - 1);
    let test = indices.split_off(n_samples - n_test);
    Ok((indices, test))
}

/// Contiguous, unshuffled k-fold splitter.
///
/// The first `n % k` folds take one extra sample each.
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// `(train, validation)` index pairs, one per fold.
    pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(WeldError::Training(format!(
                "k-fold needs at least 2 splits, got {}",
                self.n_splits
            )));
        }
        if self.n_splits > n_samples {
            return Err(WeldError::Training(format!(
                "Cannot make {} folds from {} samples",
                self.n_splits, n_samples
            )));
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            let end = start + size;
            let validation: Vec<usize> = (start..end).collect();
            let train: Vec<usize> = (0..start).chain(end..n_samples).collect();
            folds.push((train, validation));
            start = end;
        }
        Ok(folds)
    }
}

/// Per-fold R² scores of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub scores: Vec<f64>,
}

impl CrossValidationResult {
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return f64::NEG_INFINITY;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    /// Population standard deviation of the fold scores.
    pub fn std(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let var = self.scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>()
            / self.scores.len() as f64;
        var.sqrt()
    }
}

/// Fit a fresh copy of `template` on every fold and score it on the
/// held-back part.
pub fn cross_val_score(
    template: &Regressor,
    x: &Matrix,
    y: &[f64],
    folds: &[(Vec<usize>, Vec<usize>)],
) -> Result<CrossValidationResult> {
    let mut scores = Vec::with_capacity(folds.len());
    for (fold, (train, validation)) in folds.iter().enumerate() {
        let mut model = template.unfitted();
        model.fit(&x.select_rows(train), &select(y, train))?;

        let predicted = model.predict(&x.select_rows(validation));
        let score = r2_score(&select(y, validation), &predicted);
        debug!(
            "{} fold {}: R2 = {:.4} ({} train / {} validation)",
            template.family(),
            fold,
            score,
            train.len(),
            validation.len()
        );
        scores.push(score);
    }
    Ok(CrossValidationResult { scores })
}

/// Index of the best result by mean score. Ties keep the earliest; NaN
/// means never win.
pub fn best_candidate(results: &[CrossValidationResult]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, result) in results.iter().enumerate() {
        let mean = result.mean();
        if mean.is_nan() {
            continue;
        }
        match best {
            Some((_, best_mean)) if mean <= best_mean => {}
            _ => best = Some((i, mean)),
        }
    }
    best.map(|(i, _)| i)
}
