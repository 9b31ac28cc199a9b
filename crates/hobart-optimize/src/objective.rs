//! Allocation objectives and the problem data they share.

use crate::error::{OptimizeError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Portfolio volatility below this is treated as zero.
pub(crate) const ZERO_VOLATILITY: f64 = 1e-14;

/// The three allocation problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Minimize `-wᵀμ`.
    MaxReturn,
    /// Minimize `wᵀΣw`.
    MinRisk,
    /// Minimize `-(wᵀμ - rf) / sqrt(wᵀΣw)`.
    MaxSharpe,
}

impl Objective {
    /// All objectives in reporting order.
    pub const ALL: [Self; 3] = [Self::MaxReturn, Self::MinRisk, Self::MaxSharpe];

    /// Short machine name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::MaxReturn => "max_return",
            Self::MinRisk => "min_risk",
            Self::MaxSharpe => "max_sharpe",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expected returns, covariance and risk-free rate of one allocation problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    expected_returns: Array1<f64>,
    covariance: Array2<f64>,
    risk_free_rate: f64,
}

impl Problem {
    /// Validate and copy the inputs.
    ///
    /// # Errors
    /// - [`OptimizeError::EmptyProblem`] with no assets
    /// - [`OptimizeError::DimensionMismatch`] if the covariance is not n x n
    /// - [`OptimizeError::InvalidInput`] for non-finite values
    pub fn new(
        expected_returns: ArrayView1<'_, f64>,
        covariance: ArrayView2<'_, f64>,
        risk_free_rate: f64,
    ) -> Result<Self> {
        let n = expected_returns.len();
        if n == 0 {
            return Err(OptimizeError::EmptyProblem);
        }
        if covariance.dim() != (n, n) {
            let (rows, cols) = covariance.dim();
            return Err(OptimizeError::DimensionMismatch(format!(
                "{} expected returns but covariance is {}x{}",
                n, rows, cols
            )));
        }
        if expected_returns.iter().any(|v| !v.is_finite()) {
            return Err(OptimizeError::InvalidInput(
                "expected returns must be finite".into(),
            ));
        }
        if covariance.iter().any(|v| !v.is_finite()) {
            return Err(OptimizeError::InvalidInput(
                "covariance must be finite".into(),
            ));
        }
        if !risk_free_rate.is_finite() {
            return Err(OptimizeError::InvalidInput(format!(
                "risk-free rate must be finite, got {}",
                risk_free_rate
            )));
        }
        Ok(Self {
            expected_returns: expected_returns.to_owned(),
            covariance: covariance.to_owned(),
            risk_free_rate,
        })
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.expected_returns.len()
    }

    /// Expected returns μ.
    pub const fn expected_returns(&self) -> &Array1<f64> {
        &self.expected_returns
    }

    /// Covariance Σ.
    pub const fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// Risk-free rate.
    pub const fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// wᵀμ
    pub fn portfolio_return(&self, w: ArrayView1<'_, f64>) -> f64 {
        w.dot(&self.expected_returns)
    }

    /// wᵀΣw
    pub fn portfolio_variance(&self, w: ArrayView1<'_, f64>) -> f64 {
        w.dot(&self.covariance.dot(&w))
    }

    /// Sharpe ratio of `w`; NaN at zero volatility.
    pub fn sharpe_ratio(&self, w: ArrayView1<'_, f64>) -> f64 {
        let vol = self.portfolio_variance(w).max(0.0).sqrt();
        if vol < ZERO_VOLATILITY {
            return f64::NAN;
        }
        (self.portfolio_return(w) - self.risk_free_rate) / vol
    }

    /// Objective value at `w`.
    pub fn value(&self, objective: Objective, w: ArrayView1<'_, f64>) -> f64 {
        match objective {
            Objective::MaxReturn => -self.portfolio_return(w),
            Objective::MinRisk => self.portfolio_variance(w),
            Objective::MaxSharpe => {
                let vol = self.portfolio_variance(w).max(0.0).sqrt();
                if vol < ZERO_VOLATILITY {
                    f64::INFINITY
                } else {
                    -(self.portfolio_return(w) - self.risk_free_rate) / vol
                }
            }
        }
    }

    /// Objective gradient at `w`.
    pub fn gradient(&self, objective: Objective, w: ArrayView1<'_, f64>) -> Array1<f64> {
        match objective {
            Objective::MaxReturn => -&self.expected_returns,
            Objective::MinRisk => self.covariance.dot(&w) * 2.0,
            Objective::MaxSharpe => {
                let sigma_w = self.covariance.dot(&w);
                let variance = w.dot(&sigma_w).max(0.0);
                let vol = variance.sqrt();
                if vol < ZERO_VOLATILITY {
                    return Array1::from_elem(w.len(), f64::NAN);
                }
                let excess = self.portfolio_return(w) - self.risk_free_rate;
                // d/dw of -(excess / vol)
                (sigma_w * (excess / (variance * vol))) - &self.expected_returns / vol
            }
        }
    }
}
