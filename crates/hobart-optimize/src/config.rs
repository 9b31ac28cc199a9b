//! Optimizer settings.

use crate::error::{OptimizeError, Result};
use serde::{Deserialize, Serialize};

/// Optimizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Per-asset weight cap in (0, 1] (default: 1.0, long-only without a cap)
    pub upper_bound: f64,
    /// Iteration budget per objective (default: 10_000)
    pub max_iterations: usize,
    /// Convergence threshold on the projected-gradient residual (default: 1e-10)
    pub tolerance: f64,
    /// Decimal places of reported weights (default: 6)
    pub precision: u32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            upper_bound: 1.0,
            max_iterations: 10_000,
            tolerance: 1e-10,
            precision: 6,
        }
    }
}

impl OptimizerConfig {
    /// Check ranges.
    ///
    /// # Errors
    /// Returns [`OptimizeError::InvalidConfig`] for an out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if !(self.upper_bound > 0.0 && self.upper_bound <= 1.0) {
            return Err(OptimizeError::InvalidConfig(format!(
                "upper_bound must be in (0, 1], got {}",
                self.upper_bound
            )));
        }
        if self.max_iterations == 0 {
            return Err(OptimizeError::InvalidConfig(
                "max_iterations must be positive".into(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(OptimizeError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.precision > 15 {
            return Err(OptimizeError::InvalidConfig(format!(
                "precision must be at most 15 decimals, got {}",
                self.precision
            )));
        }
        Ok(())
    }

    /// Check that `n_assets` weights capped at `upper_bound` can sum to one.
    ///
    /// # Errors
    /// Returns [`OptimizeError::InfeasibleBounds`] when `n_assets * upper_bound < 1`.
    pub fn check_feasible(&self, n_assets: usize) -> Result<()> {
        if (n_assets as f64) * self.upper_bound < 1.0 - 1e-12 {
            return Err(OptimizeError::InfeasibleBounds {
                n_assets,
                upper_bound: self.upper_bound,
            });
        }
        Ok(())
    }
}
