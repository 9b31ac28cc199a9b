//! Unbiased sample covariance.
//!
//! Cov(i,j) = Σ_t (r_{t,i} - r̄_i)(r_{t,j} - r̄_j) / (T - 1)

use super::{CovarianceError, CovarianceEstimator};
use ndarray::{Array2, Axis};

/// Sample covariance estimator with `T - 1` normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleCovarianceEstimator;

impl SampleCovarianceEstimator {
    /// Create a new estimator.
    pub const fn new() -> Self {
        Self
    }
}

impl CovarianceEstimator for SampleCovarianceEstimator {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let n_periods = returns.nrows();
        if n_periods < 2 {
            return Err(CovarianceError::InsufficientData {
                required: 2,
                actual: n_periods,
            });
        }

        let Some(means) = returns.mean_axis(Axis(0)) else {
            return Err(CovarianceError::InsufficientData {
                required: 2,
                actual: 0,
            });
        };
        let centered = returns - &means;
        let cov = centered.t().dot(&centered) / (n_periods - 1) as f64;

        Ok(cov)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_known_values() {
        let returns = array![[0.01, 0.02], [0.03, 0.00], [-0.01, 0.04]];
        let cov = SampleCovarianceEstimator::new().estimate(&returns).unwrap();

        // means 0.01, 0.02; deviations (0, 0), (0.02, -0.02), (-0.02, 0.02)
        assert_relative_eq!(cov[[0, 0]], 0.0004, epsilon = 1e-15);
        assert_relative_eq!(cov[[1, 1]], 0.0004, epsilon = 1e-15);
        assert_relative_eq!(cov[[0, 1]], -0.0004, epsilon = 1e-15);
        assert_relative_eq!(cov[[1, 0]], cov[[0, 1]]);
    }

    #[test]
    fn test_single_row_rejected() {
        let returns = array![[0.01, 0.02]];
        let err = SampleCovarianceEstimator::new().estimate(&returns);
        assert!(matches!(
            err,
            Err(CovarianceError::InsufficientData { required: 2, actual: 1 })
        ));
    }
}
