//! Covariance estimation for asset returns
//!
//! The optimizer consumes an annualized (or window-scaled) covariance matrix of
//! the selected assets. Estimators work on raw periodic returns; scaling by the
//! statistics basis happens in [`CovarianceMatrix::estimate`].

pub mod correlation;
pub mod sample;

pub use correlation::correlation_matrix;
pub use sample::SampleCovarianceEstimator;

use crate::returns::WindowedReturnSeries;
use hobart_data::AssetCode;
use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

/// Errors that can occur during covariance estimation
#[derive(Debug, Error)]
pub enum CovarianceError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Trait for covariance matrix estimators
pub trait CovarianceEstimator {
    /// Estimate the covariance matrix from periodic returns
    ///
    /// # Arguments
    /// * `returns` - Matrix where each row is a period and each column an asset
    ///
    /// # Returns
    /// * Estimated covariance matrix (N x N where N is number of assets)
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError>;
}

/// Scaled covariance matrix labelled by asset.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceMatrix {
    assets: Vec<AssetCode>,
    matrix: Array2<f64>,
    multiplier: f64,
}

impl CovarianceMatrix {
    /// Wrap an existing matrix.
    ///
    /// # Errors
    /// Fails if the matrix is not square or does not match `assets`.
    pub fn new(
        assets: Vec<AssetCode>,
        matrix: Array2<f64>,
        multiplier: f64,
    ) -> Result<Self, CovarianceError> {
        let (rows, cols) = matrix.dim();
        if rows != cols || rows != assets.len() {
            return Err(CovarianceError::DimensionMismatch {
                expected: assets.len(),
                actual: if rows == assets.len() { cols } else { rows },
            });
        }
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(CovarianceError::InvalidParameter(format!(
                "multiplier must be positive, got {}",
                multiplier
            )));
        }
        Ok(Self {
            assets,
            matrix,
            multiplier,
        })
    }

    /// Estimate from a return series and scale by `multiplier`.
    ///
    /// # Errors
    /// Propagates estimator failures.
    pub fn estimate<E: CovarianceEstimator + ?Sized>(
        estimator: &E,
        returns: &WindowedReturnSeries,
        multiplier: f64,
    ) -> Result<Self, CovarianceError> {
        let raw = estimator.estimate(returns.returns())?;
        Self::new(returns.assets().to_vec(), raw * multiplier, multiplier)
    }

    /// Asset labels, in row/column order.
    pub fn assets(&self) -> &[AssetCode] {
        &self.assets
    }

    /// The scaled matrix.
    pub const fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Scaling factor applied to the periodic estimate.
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Number of assets.
    pub fn dim(&self) -> usize {
        self.assets.len()
    }

    /// Scaled variances (the diagonal).
    pub fn variances(&self) -> Array1<f64> {
        self.matrix.diag().to_owned()
    }

    /// wᵀ Σ w
    pub fn portfolio_variance(&self, weights: ArrayView1<'_, f64>) -> f64 {
        weights.dot(&self.matrix.dot(&weights))
    }
}
