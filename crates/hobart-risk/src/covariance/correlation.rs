//! Correlation from covariance.

use ndarray::Array2;

/// Convert a covariance matrix to a correlation matrix.
///
/// Off-diagonal entries involving a zero-variance asset are 0. The diagonal is
/// always 1.
pub fn correlation_matrix(cov: &Array2<f64>) -> Array2<f64> {
    let n = cov.nrows();
    let std: Vec<f64> = (0..n).map(|i| cov[[i, i]].max(0.0).sqrt()).collect();

    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            1.0
        } else if std[i] > 0.0 && std[j] > 0.0 {
            (cov[[i, j]] / (std[i] * std[j])).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    })
}
