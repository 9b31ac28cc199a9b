//! Error types for portfolio optimization.

use crate::objective::Objective;
use thiserror::Error;

/// Result type for optimization.
pub type Result<T> = std::result::Result<T, OptimizeError>;

/// Errors raised while setting up or solving an allocation problem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    /// No assets to allocate across
    #[error("Empty problem: at least one asset is required")]
    EmptyProblem,

    /// Expected returns and covariance disagree in size
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Non-finite expected return, covariance or risk-free rate
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Optimizer settings out of range
    #[error("Invalid optimizer configuration: {0}")]
    InvalidConfig(String),

    /// No weight vector can satisfy the bounds and the budget
    #[error("Infeasible bounds: {n_assets} assets capped at {upper_bound} cannot sum to 1")]
    InfeasibleBounds {
        /// Number of assets
        n_assets: usize,
        /// Per-asset upper bound
        upper_bound: f64,
    },

    /// The solver did not converge
    #[error(
        "Optimization failed for {objective}: no convergence after {iterations} iterations (residual {residual:.3e})"
    )]
    OptimizationFailed {
        /// Objective that failed
        objective: Objective,
        /// Iterations performed
        iterations: usize,
        /// Final projected-gradient residual
        residual: f64,
    },
}
