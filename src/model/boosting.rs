use serde::{Deserialize, Serialize};

use super::matrix::Matrix;
use super::tree::RegressionTree;
use crate::error::{Result, WeldError};

/// Least-squares gradient boosting over shallow regression trees.
///
/// Starts from the target mean; each stage fits a depth-limited tree to the
/// current residuals and adds `learning_rate` times its prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    init_prediction: f64,
    estimators: Vec<RegressionTree>,
}

impl GradientBoostingRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            learning_rate: 0.1,
            max_depth: 3,
            init_prediction: 0.0,
            estimators: Vec::new(),
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
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
                "Cannot fit boosting with zero samples".to_string(),
            ));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(WeldError::Training(format!(
                "Learning rate must be positive, got {}",
                self.learning_rate
            )));
        }

        self.init_prediction = y.iter().sum::<f64>() / n_samples as f64;
        self.estimators = Vec::with_capacity(self.n_estimators);

        let mut current = vec![self.init_prediction; n_samples];
        let mut residuals = vec![0.0; n_samples];
        for _ in 0..self.n_estimators {
            for ((r, &target), &fitted) in residuals.iter_mut().zip(y).zip(&current) {
                *r = target - fitted;
            }

            let mut tree = RegressionTree::new().with_max_depth(Some(self.max_depth));
            tree.fit(x, &residuals)?;

            for (i, value) in current.iter_mut().enumerate() {
                *value += self.learning_rate * tree.predict_row(x.row(i));
            }
            self.estimators.push(tree);
        }
        Ok(())
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.estimators
            .iter()
            .fold(self.init_prediction, |acc, tree| {
                acc + self.learning_rate * tree.predict_row(row)
            })
    }

    pub fn predict(&self, x: &Matrix) -> Vec<f64> {
        (0..x.n_rows()).map(|r| self.predict_row(x.row(r))).collect()
    }

    pub fn check(&self, n_features: usize) -> std::result::Result<(), String> {
        if !self.init_prediction.is_finite() || !self.learning_rate.is_finite() {
            return Err("non-finite initial prediction or learning rate".to_string());
        }
        if self.estimators.is_empty() {
            return Err("boosting has no stages".to_string());
        }
        for (i, tree) in self.estimators.iter().enumerate() {
            tree.check(n_features).map_err(|e| format!("stage {}: {}", i, e))?;
        }
        Ok(())
    }

    pub fn n_stages(&self) -> usize {
        self.estimators.len()
    }

    /// Same hyperparameters, no fitted stages.
    pub fn unfitted(&self) -> Self {
        Self {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
            init_prediction: 0.0,
            estimators: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic_data() -> (Matrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64 / 3.0]).collect();
        let y = rows.iter().map(|r| r[0] * r[0] + 1.0).collect();
        (Matrix::from_rows(&rows).unwrap(), y)
    }

    fn mse(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / a.len() as f64
    }

    #[test]
    fn test_single_stage_moves_from_mean() {
        let (x, y) = quadratic_data();
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let mut gb = GradientBoostingRegressor::new(1);
        gb.fit(&x, &y).unwrap();

        let baseline = mse(&vec![mean; y.len()], &y);
        assert!(mse(&gb.predict(&x), &y) < baseline);
    }

    #[test]
    fn test_training_error_decreases_with_stages() {
        let (x, y) = quadratic_data();
        let mut short = GradientBoostingRegressor::new(5);
        let mut long = GradientBoostingRegressor::new(50);
        short.fit(&x, &y).unwrap();
        long.fit(&x, &y).unwrap();

        assert_eq!(long.n_stages(), 50);
        assert!(mse(&long.predict(&x), &y) < mse(&short.predict(&x), &y));
        assert!(mse(&long.predict(&x), &y) < 1.0);
    }

    #[test]
    fn test_constant_target_predicts_constant() {
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let mut gb = GradientBoostingRegressor::new(10);
        gb.fit(&x, &[4.0, 4.0, 4.0]).unwrap();
        assert!((gb.predict_row(&[10.0]) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_learning_rate() {
        let (x, y) = quadratic_data();
        let mut gb = GradientBoostingRegressor::new(3).with_learning_rate(0.0);
        assert!(gb.fit(&x, &y).is_err());
    }

    #[test]
    fn test_deterministic_fit() {
        let (x, y) = quadratic_data();
        let mut a = GradientBoostingRegressor::new(10);
        let mut b = GradientBoostingRegressor::new(10);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }
}
