//! Regression scores.

/// Coefficient of determination.
///
/// A constant `y_true` has no variance to explain: a perfect prediction
/// scores 1.0 and anything else scores 0.0.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return 0.0;
    }
    let mean = y_true[..n].iter().sum::<f64>() / n as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true[..n].iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Root mean squared error.
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return 0.0;
    }
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n as f64;
    mse.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(r2_score(&y, &y), 1.0);
        assert_eq!(rmse(&y, &y), 0.0);
    }

    #[test]
    fn test_mean_prediction_scores_zero() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(r2_score(&y, &[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_worse_than_mean_is_negative() {
        assert!(r2_score(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) < 0.0);
    }

    #[test]
    fn test_constant_target() {
        assert_eq!(r2_score(&[5.0, 5.0], &[5.0, 5.0]), 1.0);
        assert_eq!(r2_score(&[5.0, 5.0], &[4.0, 6.0]), 0.0);
    }

    #[test]
    fn test_rmse_value() {
        assert!((rmse(&[0.0, 0.0], &[3.0, 4.0]) - 12.5f64.sqrt()).abs() < 1e-12);
    }
}
