use serde::{Deserialize, Serialize};

use super::matrix::Matrix;
use crate::error::{Result, WeldError};

/// Per-column standardization, `z = (x - mean) / std`.
///
/// Fit once on a training split; every later call only transforms. Columns
/// with zero variance are mapped to 0 instead of being divided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Matrix) -> Result<Self> {
        let (n_rows, n_cols) = x.shape();
        if n_rows == 0 {
            return Err(WeldError::Training(
                "Cannot fit scaler on zero rows".to_string(),
            ));
        }

        let mut mean = Vec::with_capacity(n_cols);
        let mut std = Vec::with_capacity(n_cols);
        for col in 0..n_cols {
            let m = x.column(col).sum::<f64>() / n_rows as f64;
            let var = x.column(col).map(|v| (v - m).powi(2)).sum::<f64>() / n_rows as f64;
            let s = var.sqrt();
            // Rounding in the mean leaves a tiny residual on constant columns
            let s = if s <= 1e-12 * m.abs().max(1.0) { 0.0 } else { s };
            mean.push(m);
            std.push(s);
        }

        Ok(Self { mean, std })
    }

    pub fn fit_transform(x: &Matrix) -> Result<(Self, Matrix)> {
        let scaler = Self::fit(x)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }

    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        self.check_width(x.n_cols())?;
        Ok(x.map_rows(|row| self.scale(row)))
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row.len())?;
        Ok(self.scale(row))
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn scale(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(&v, (&m, &s))| if s == 0.0 { 0.0 } else { (v - m) / s })
            .collect()
    }

    fn check_width(&self, got: usize) -> Result<()> {
        if got != self.mean.len() {
            return Err(WeldError::Training(format!(
                "Scaler fitted on {} features, got {}",
                self.mean.len(),
                got
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Matrix {
        Matrix::from_rows(&[
            vec![1.0, 100.0, 5.0],
            vec![2.0, 200.0, 5.0],
            vec![3.0, 300.0, 5.0],
            vec![4.0, 400.0, 5.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_zero_mean_unit_variance() {
        let (scaler, scaled) = StandardScaler::fit_transform(&sample()).unwrap();
        assert_eq!(scaler.mean()[0], 2.5);
        for col in 0..2 {
            let values: Vec<f64> = scaled.column(col).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let (scaler, scaled) = StandardScaler::fit_transform(&sample()).unwrap();
        assert_eq!(scaler.std()[2], 0.0);
        assert!(scaled.column(2).all(|v| v == 0.0));

        // Unseen values in a constant column still map to 0
        let row = scaler.transform_row(&[2.5, 250.0, 99.0]).unwrap();
        assert_eq!(row[2], 0.0);
        assert!(row.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let scaler = StandardScaler::fit(&sample()).unwrap();
        let held_out = Matrix::from_rows(&[vec![2.5, 250.0, 5.0]]).unwrap();
        let scaled = scaler.transform(&held_out).unwrap();
        assert!(scaled.get(0, 0).abs() < 1e-12);
        assert!(scaled.get(0, 1).abs() < 1e-12);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let scaler = StandardScaler::fit(&sample()).unwrap();
        assert!(scaler.transform_row(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_empty_fit_rejected() {
        let empty = Matrix::from_vec(0, 3, vec![]).unwrap();
        assert!(StandardScaler::fit(&empty).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_transform_idempotent_and_finite(
            n in 2..=12usize,
            seed in 0..500u32,
            constant in -1e3..1e3f64,
        ) {
            let rows: Vec<Vec<f64>> = (0..n)
                .map(|i| vec![((i as f64 + seed as f64) * 0.37).sin() * 100.0, constant])
                .collect();
            let x = Matrix::from_rows(&rows).unwrap();
            let scaler = StandardScaler::fit(&x).unwrap();
            let before = scaler.clone();

            let first = scaler.transform(&x).unwrap();
            let second = scaler.transform(&x).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(&scaler, &before);
            prop_assert!(first.column(1).all(|v| v == 0.0));
            prop_assert!((0..n).all(|r| first.row(r).iter().all(|v| v.is_finite())));
        }
    }
}
