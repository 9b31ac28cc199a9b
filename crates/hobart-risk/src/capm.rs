//! CAPM beta and expected return.
//!
//! Excess returns are taken over a risk-free rate converted to the return
//! periodicity:
//!
//! ```text
//! rf_p   = (1 + rf_annual)^(1 / periods_per_year) - 1
//! beta   = Cov(r_a - rf_p, r_m - rf_p) / Var(r_m - rf_p)
//! E[r_a] = rf_p + beta * mean(r_m - rf_p)
//! ```
//!
//! The expected return here is per period; callers scale it by the basis.

use crate::error::{Result, RiskError};
use crate::statistics::{DEGENERATE_TOLERANCE, mean, sample_covariance};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Convert an annual risk-free rate to a per-period rate by compounding.
pub fn daily_risk_free_rate(annual_rate: f64, periods_per_year: u32) -> f64 {
    (1.0 + annual_rate).powf(1.0 / f64::from(periods_per_year.max(1))) - 1.0
}

/// Per-period CAPM estimate for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapmEstimate {
    /// Sensitivity to market excess return. NaN when market variance is zero.
    pub beta: f64,
    /// Per-period CAPM expected return. NaN when beta is undefined.
    pub expected_return: f64,
}

impl CapmEstimate {
    /// Whether beta could be computed.
    pub const fn is_defined(&self) -> bool {
        self.beta.is_finite()
    }
}

/// Estimate beta of `asset` against `market` over the same dates.
///
/// # Errors
/// Fails if the series lengths differ or fewer than two rows are supplied.
pub fn estimate_capm(
    asset: ArrayView1<'_, f64>,
    market: ArrayView1<'_, f64>,
    period_risk_free: f64,
) -> Result<CapmEstimate> {
    if asset.len() != market.len() {
        return Err(RiskError::DimensionMismatch(format!(
            "asset has {} returns, market has {}",
            asset.len(),
            market.len()
        )));
    }
    if asset.len() < 2 {
        return Err(RiskError::InsufficientData {
            required: 2,
            actual: asset.len(),
        });
    }

    let excess_asset = asset.mapv(|r| r - period_risk_free);
    let excess_market = market.mapv(|r| r - period_risk_free);

    let market_variance = sample_covariance(excess_market.view(), excess_market.view());
    if market_variance.sqrt() < DEGENERATE_TOLERANCE {
        return Ok(CapmEstimate {
            beta: f64::NAN,
            expected_return: f64::NAN,
        });
    }

    let beta = sample_covariance(excess_asset.view(), excess_market.view()) / market_variance;
    Ok(CapmEstimate {
        beta,
        expected_return: period_risk_free + beta * mean(excess_market.view()),
    })
}
