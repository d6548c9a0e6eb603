//! CART regression tree (mean squared error splits).
//!
//! Nodes live in a flat arena so a fitted tree serializes without
//! recursion; node 0 is the root.

use serde::{Deserialize, Serialize};

use super::matrix::Matrix;
use crate::error::{Result, WeldError};

/// A node in the flattened tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Samples with `row[feature] <= threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Mean target of the training samples that reached this leaf
    Leaf { value: f64, n_samples: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RegressionTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    /// Maximum depth (root has depth 0). `None` grows until leaves are pure.
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<()> {
        let indices: Vec<usize> = (0..x.n_rows()).collect();
        self.fit_indices(x, y, &indices)
    }

    /// Fit on a subset of rows. Indices may repeat (bootstrap samples).
    pub fn fit_indices(&mut self, x: &Matrix, y: &[f64], indices: &[usize]) -> Result<()> {
        if x.n_rows() != y.len() {
            return Err(WeldError::Training(
                "Number of samples in X and y must match".to_string(),
            ));
        }
        if indices.is_empty() {
            return Err(WeldError::Training(
                "Cannot fit a tree with zero samples".to_string(),
            ));
        }

        self.nodes.clear();
        self.build(x, y, indices.to_vec(), 0);
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value, .. }) => return *value,
                None => return 0.0,
            }
        }
    }

    pub fn predict(&self, x: &Matrix) -> Vec<f64> {
        (0..x.n_rows()).map(|r| self.predict_row(x.row(r))).collect()
    }

    /// Structural check for a deserialized tree: non-empty, every split
    /// reads a feature below `n_features`, and children come after their
    /// parent inside the arena.
    pub fn check(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} of {}",
                            id, feature, n_features
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has a NaN threshold", id));
                    }
                    for child in [*left, *right] {
                        if child <= id || child >= self.nodes.len() {
                            return Err(format!("node {} points to node {}", id, child));
                        }
                    }
                }
                TreeNode::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} holds {}", id, value));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Grow the subtree for `indices` and return its node id.
    fn build(&mut self, x: &Matrix, y: &[f64], indices: Vec<usize>, depth: usize) -> usize {
        let n = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n as f64;
        let leaf = TreeNode::Leaf {
            value: mean,
            n_samples: n,
        };

        let at_max_depth = self.max_depth.is_some_and(|d| depth >= d);
        let sse = indices.iter().map(|&i| (y[i] - mean).powi(2)).sum::<f64>();
        if n < self.min_samples_split || at_max_depth || sse < 1e-10 {
            self.nodes.push(leaf);
            return self.nodes.len() - 1;
        }

        let Some((feature, threshold)) = self.best_split(x, y, &indices, sse) else {
            self.nodes.push(leaf);
            return self.nodes.len() - 1;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x.get(i, feature) <= threshold);
        if left_idx.len() < self.min_samples_leaf || right_idx.len() < self.min_samples_leaf {
            self.nodes.push(leaf);
            return self.nodes.len() - 1;
        }

        // Reserve the slot so the parent precedes its children
        let id = self.nodes.len();
        self.nodes.push(leaf);
        let left = self.build(x, y, left_idx, depth + 1);
        let right = self.build(x, y, right_idx, depth + 1);
        self.nodes[id] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Best (feature, threshold) by squared-error reduction. Ties keep the
    /// first feature and the lowest threshold.
    fn best_split(
        &self,
        x: &Matrix,
        y: &[f64],
        indices: &[usize],
        parent_sse: f64,
    ) -> Option<(usize, f64)> {
        let n = indices.len();
        let min_leaf = self.min_samples_leaf;
        let mut best: Option<(usize, f64)> = None;
        let mut best_gain = 1e-12;

        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);
        for feature in 0..x.n_cols() {
            pairs.clear();
            pairs.extend(indices.iter().map(|&i| (x.get(i, feature), y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
            let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 1..n {
                let (prev_value, prev_y) = pairs[k - 1];
                left_sum += prev_y;
                left_sq += prev_y * prev_y;

                let value = pairs[k].0;
                if k < min_leaf || n - k < min_leaf || prev_value >= value {
                    continue;
                }

                let nl = k as f64;
                let nr = (n - k) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / nl) + (right_sq - right_sum * right_sum / nr);
                let gain = parent_sse - sse;

                if gain > best_gain {
                    best_gain = gain;
                    let mid = (prev_value + value) / 2.0;
                    // Adjacent floats can round the midpoint up onto `value`
                    let threshold = if mid < value { mid } else { prev_value };
                    best = Some((feature, threshold));
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Matrix, Vec<f64>) {
        let x = Matrix::from_rows(&[
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 1.0],
            vec![4.0, 1.0],
            vec![5.0, 0.0],
            vec![6.0, 1.0],
        ])
        .unwrap();
        let y = vec![10.0, 10.0, 10.0, 20.0, 20.0, 20.0];
        (x, y)
    }

    #[test]
    fn test_learns_step_function() {
        let (x, y) = step_data();
        let mut tree = RegressionTree::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x), y);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(&[3.4, 0.0]), 10.0);
        assert_eq!(tree.predict_row(&[3.6, 0.0]), 20.0);
    }

    #[test]
    fn test_max_depth_zero_predicts_mean() {
        let (x, y) = step_data();
        let mut tree = RegressionTree::new().with_max_depth(Some(0));
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict_row(&[100.0, 5.0]), 15.0);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let y = vec![0.0, 0.0, 0.0, 100.0];
        let mut tree = RegressionTree::new().with_min_samples_leaf(2);
        tree.fit(&x, &y).unwrap();
        // The only pure split would isolate one sample; the best allowed is 2/2
        assert_eq!(tree.predict_row(&[4.0]), 50.0);
        assert_eq!(tree.predict_row(&[1.0]), 0.0);
    }

    #[test]
    fn test_constant_features_give_single_leaf() {
        let x = Matrix::from_rows(&[vec![1.0], vec![1.0], vec![1.0]]).unwrap();
        let mut tree = RegressionTree::new();
        tree.fit(&x, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict_row(&[1.0]), 2.0);
    }

    #[test]
    fn test_fit_indices_with_repeats() {
        let (x, y) = step_data();
        let mut tree = RegressionTree::new();
        tree.fit_indices(&x, &y, &[0, 0, 5, 5]).unwrap();
        assert_eq!(tree.predict_row(&[1.0, 0.0]), 10.0);
        assert_eq!(tree.predict_row(&[6.0, 1.0]), 20.0);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let (x, _) = step_data();
        let mut tree = RegressionTree::new();
        assert!(tree.fit(&x, &[1.0]).is_err());
    }

    #[test]
    fn test_check_accepts_fitted_tree() {
        let (x, y) = step_data();
        let mut tree = RegressionTree::new();
        tree.fit(&x, &y).unwrap();
        assert!(tree.check(2).is_ok());
        assert!(tree.check(0).is_err());
        assert!(RegressionTree::new().check(2).is_err());
    }

    #[test]
    fn test_check_rejects_bad_links() {
        let mut tree = RegressionTree::new();
        tree.nodes = vec![
            TreeNode::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 7,
            },
            TreeNode::Leaf {
                value: 1.0,
                n_samples: 1,
            },
        ];
        assert!(tree.check(1).is_err());
    }

    #[test]
    fn test_short_row_does_not_panic() {
        let (x, y) = step_data();
        let mut tree = RegressionTree::new();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict_row(&[]), 10.0);
    }

    #[test]
    fn test_serde_round_trip_preserves_predictions() {
        let (x, y) = step_data();
        let mut tree = RegressionTree::new();
        tree.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&tree).unwrap();
        let back: RegressionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(tree, back);
        assert_eq!(back.predict(&x), tree.predict(&x));
    }
}
