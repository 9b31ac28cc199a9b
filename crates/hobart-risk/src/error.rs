//! Error types for return and statistics computation.

use crate::covariance::CovarianceError;
use thiserror::Error;

/// Result type for risk computations.
pub type Result<T> = std::result::Result<T, RiskError>;

/// Errors raised while building return series and statistics.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Window must select at least one observation
    #[error("Invalid window: {0} (must be at least 1)")]
    InvalidWindow(usize),

    /// No assets were requested
    #[error("No assets selected")]
    EmptyAssetSet,

    /// A requested asset has no prices in the panel
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    /// Not enough aligned observations after windowing and intersection
    #[error("Insufficient data: need at least {required} aligned observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Shapes of supplied arrays disagree
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Covariance estimation error
    #[error("Covariance error: {0}")]
    Covariance(#[from] CovarianceError),
}
