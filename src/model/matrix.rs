use serde::{Deserialize, Serialize};

use crate::error::{Result, WeldError};

/// Dense row-major matrix of `f64` features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows * cols != data.len() {
            return Err(WeldError::Training(format!(
                "Matrix shape {}x{} does not match {} values",
                rows,
                cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a matrix from equally sized rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(WeldError::Training("Ragged feature rows".to_string()));
        }
        let data = rows.iter().flatten().copied().collect();
        Self::from_vec(rows.len(), cols, data)
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows).map(move |r| self.get(r, col))
    }

    /// Copy the given rows, in the given order, into a new matrix.
    pub fn select_rows(&self, indices: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &idx in indices {
            data.extend_from_slice(self.row(idx));
        }
        Matrix {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }

    pub fn map_rows<F>(&self, mut f: F) -> Matrix
    where
        F: FnMut(&[f64]) -> Vec<f64>,
    {
        let mut data = Vec::with_capacity(self.data.len());
        for r in 0..self.rows {
            data.extend(f(self.row(r)));
        }
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }
}

/// Gather `values[i]` for each index.
pub fn select(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| values[i]).collect()
}
