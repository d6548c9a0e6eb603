use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::matrix::Matrix;
use super::tree::RegressionTree;
use crate::error::{Result, WeldError};

/// Bagging ensemble of regression trees.
///
/// Each tree is grown on a bootstrap sample drawn with a per-tree seed
/// (`random_state + i`), so refitting on the same data reproduces the
/// same forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_estimators: usize,
    max_depth: Option<usize>,
    random_state: u64,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            max_depth: None,
            random_state: 42,
            trees: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<()> {
        let n_samples = x.n_rows();
        if n_samples != y.len() {
            return Err(WeldError::Training(
                "Number of samples in X and y must match".to_string(),
            ));
        }
        if n_samples == 0 {
            return Err(WeldError::Training(
                "Cannot fit a forest with zero samples".to_string(),
            ));
        }

        self.trees = Vec::with_capacity(self.n_estimators);
        for i in 0..self.n_estimators {
            let mut rng = StdRng::seed_from_u64(self.random_state.wrapping_add(i as u64));
            let bootstrap: Vec<usize> = (0..n_samples)
                .map(|_| rng.random_range(0..n_samples))
                .collect();

            let mut tree = RegressionTree::new().with_max_depth(self.max_depth);
            tree.fit_indices(x, y, &bootstrap)?;
            self.trees.push(tree);
        }
        Ok(())
    }

    /// Average of the per-tree predictions.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict(&self, x: &Matrix) -> Vec<f64> {
        (0..x.n_rows()).map(|r| self.predict_row(x.row(r))).collect()
    }

    pub fn check(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check(n_features).map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Same hyperparameters, no fitted trees.
    pub fn unfitted(&self) -> Self {
        Self {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            random_state: self.random_state,
            trees: Vec::new(),
        }
    }
}
