//! Per-asset return and risk statistics
//!
//! For each asset in a [`WindowedReturnSeries`]:
//!
//! - historical return: `p_last / p_first - 1` over the price window
//! - expected return: `mean(r) * basis`
//! - volatility: `std(r) * sqrt(basis)` (sample standard deviation)
//! - Sharpe ratio: `(expected - rf) / volatility`
//! - beta and CAPM expected return, when market returns are supplied
//!
//! Degenerate inputs never abort the computation. A zero volatility or a flat
//! market leaves the affected value as NaN and records an
//! [`UndefinedStatistic`] in the report.

use crate::capm::{daily_risk_free_rate, estimate_capm};
use crate::error::{Result, RiskError};
use crate::returns::{MarketAlignedReturns, WindowedReturnSeries};
use hobart_data::AssetCode;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard deviations below this are treated as zero.
pub(crate) const DEGENERATE_TOLERANCE: f64 = 1e-14;

pub(crate) fn mean(values: ArrayView1<'_, f64>) -> f64 {
    values.mean().unwrap_or(f64::NAN)
}

/// Sample covariance with `n - 1` normalization.
pub(crate) fn sample_covariance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let n = a.len();
    if n < 2 || n != b.len() {
        return f64::NAN;
    }
    let (ma, mb) = (mean(a), mean(b));
    let sum: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - ma) * (y - mb)).sum();
    sum / (n - 1) as f64
}

/// How periodic mean and standard deviation are scaled for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingBasis {
    /// Annualize with a fixed number of periods per year (252 for trading days).
    PeriodsPerYear(u32),
    /// Scale to the window: the multiplier is the number of return observations.
    Window,
}

impl Default for ScalingBasis {
    fn default() -> Self {
        Self::PeriodsPerYear(252)
    }
}

impl ScalingBasis {
    /// Multiplier applied to the mean; the standard deviation uses its square root.
    pub fn multiplier(self, n_observations: usize) -> f64 {
        match self {
            Self::PeriodsPerYear(periods) => f64::from(periods),
            Self::Window => n_observations as f64,
        }
    }
}

impl fmt::Display for ScalingBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeriodsPerYear(p) => write!(f, "{} periods/year", p),
            Self::Window => f.write_str("window"),
        }
    }
}

/// Statistics configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Risk-free rate on the same scale as the reported expected return (default: 0.0)
    pub risk_free_rate: f64,
    /// Scaling basis for mean and volatility (default: 252 periods per year)
    pub basis: ScalingBasis,
    /// Periods per year used to de-annualize the risk-free rate for CAPM (default: 252)
    pub periods_per_year: u32,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            basis: ScalingBasis::default(),
            periods_per_year: 252,
        }
    }
}

/// Which statistic could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedKind {
    /// Volatility is zero; the Sharpe ratio is NaN.
    ZeroVolatility,
    /// Market excess-return variance is zero; beta and CAPM return are NaN.
    ZeroMarketVariance,
    /// Fewer than two returns align with the benchmark; beta and CAPM return are NaN.
    InsufficientMarketOverlap,
}

/// Non-fatal warning attached to a statistics report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndefinedStatistic {
    /// Affected asset.
    pub asset: AssetCode,
    /// What was undefined.
    pub kind: UndefinedKind,
}

impl fmt::Display for UndefinedStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            UndefinedKind::ZeroVolatility => {
                write!(f, "{}: zero volatility, Sharpe ratio undefined", self.asset)
            }
            UndefinedKind::ZeroMarketVariance => {
                write!(f, "{}: zero market variance, beta undefined", self.asset)
            }
            UndefinedKind::InsufficientMarketOverlap => write!(
                f,
                "{}: too few returns aligned with the benchmark, beta undefined",
                self.asset
            ),
        }
    }
}

/// Statistics of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetStatistics {
    /// Asset code.
    pub code: AssetCode,
    /// `p_last / p_first - 1` over the price window.
    pub historical_return: f64,
    /// Scaled mean periodic return.
    pub expected_return: f64,
    /// Scaled sample standard deviation of periodic returns.
    pub volatility: f64,
    /// `(expected_return - rf) / volatility`; NaN when volatility is zero.
    pub sharpe_ratio: f64,
    /// CAPM beta, present when a market series was supplied.
    pub beta: Option<f64>,
    /// Scaled CAPM expected return, present when a market series was supplied.
    pub capm_expected_return: Option<f64>,
}

impl AssetStatistics {
    /// Whether the Sharpe ratio is defined.
    pub const fn has_sharpe(&self) -> bool {
        self.sharpe_ratio.is_finite()
    }
}

/// Statistics for every asset in a return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Multiplier the basis resolved to.
    pub multiplier: f64,
    /// Number of return observations used.
    pub n_observations: usize,
    /// Per-asset statistics, in series column order.
    pub assets: Vec<AssetStatistics>,
    /// Undefined values encountered.
    pub warnings: Vec<UndefinedStatistic>,
}

impl StatisticsReport {
    /// Statistics for `code`.
    pub fn get(&self, code: &AssetCode) -> Option<&AssetStatistics> {
        self.assets.iter().find(|s| &s.code == code)
    }

    /// Expected returns in column order.
    pub fn expected_returns(&self) -> Vec<f64> {
        self.assets.iter().map(|s| s.expected_return).collect()
    }

    /// Mark beta and CAPM return undefined for every asset because the
    /// benchmark `index` does not overlap the return window.
    pub fn mark_market_unavailable(&mut self, index: &str) {
        for stats in &mut self.assets {
            tracing::warn!(asset = %stats.code, index, "too few returns aligned with the benchmark, beta undefined");
            stats.beta = Some(f64::NAN);
            stats.capm_expected_return = Some(f64::NAN);
            self.warnings.push(UndefinedStatistic {
                asset: stats.code.clone(),
                kind: UndefinedKind::InsufficientMarketOverlap,
            });
        }
    }
}

/// Compute per-asset statistics.
///
/// `market`, when given, must be aligned to `returns` with [`crate::align_market`].
///
/// # Errors
/// - [`RiskError::InsufficientData`] with fewer than two return rows
/// - [`RiskError::DimensionMismatch`] if `market` covers a different number of assets
pub fn compute_statistics(
    returns: &WindowedReturnSeries,
    market: Option<&MarketAlignedReturns>,
    config: &StatisticsConfig,
) -> Result<StatisticsReport> {
    let n_obs = returns.n_observations();
    if n_obs < 2 {
        return Err(RiskError::InsufficientData {
            required: 2,
            actual: n_obs,
        });
    }
    if let Some(m) = market {
        if m.assets.ncols() != returns.n_assets() {
            return Err(RiskError::DimensionMismatch(format!(
                "market-aligned returns have {} assets, series has {}",
                m.assets.ncols(),
                returns.n_assets()
            )));
        }
    }

    let multiplier = config.basis.multiplier(n_obs);
    let historical = returns.historical_returns();
    let period_rf = daily_risk_free_rate(config.risk_free_rate, config.periods_per_year);

    let mut assets = Vec::with_capacity(returns.n_assets());
    let mut warnings = Vec::new();

    for (j, code) in returns.assets().iter().enumerate() {
        let column = returns.returns().column(j);
        let std = sample_covariance(column, column).sqrt();

        let expected_return = mean(column) * multiplier;
        let volatility = std * multiplier.sqrt();
        let sharpe_ratio = if std < DEGENERATE_TOLERANCE {
            tracing::warn!(asset = %code, "zero volatility, Sharpe ratio undefined");
            warnings.push(UndefinedStatistic {
                asset: code.clone(),
                kind: UndefinedKind::ZeroVolatility,
            });
            f64::NAN
        } else {
            (expected_return - config.risk_free_rate) / volatility
        };

        let (beta, capm_expected_return) = match market {
            Some(m) => {
                let est = estimate_capm(m.assets.column(j), m.market.view(), period_rf)?;
                if !est.is_defined() {
                    tracing::warn!(asset = %code, index = %m.index_name, "zero market variance, beta undefined");
                    warnings.push(UndefinedStatistic {
                        asset: code.clone(),
                        kind: UndefinedKind::ZeroMarketVariance,
                    });
                }
                (Some(est.beta), Some(est.expected_return * multiplier))
            }
            None => (None, None),
        };

        assets.push(AssetStatistics {
            code: code.clone(),
            historical_return: historical[j],
            expected_return,
            volatility,
            sharpe_ratio,
            beta,
            capm_expected_return,
        });
    }

    tracing::debug!(
        assets = assets.len(),
        observations = n_obs,
        multiplier,
        undefined = warnings.len(),
        "computed asset statistics"
    );

    Ok(StatisticsReport {
        multiplier,
        n_observations: n_obs,
        assets,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::{Array2, array};
    use rstest::rstest;

    fn series(prices: Array2<f64>) -> WindowedReturnSeries {
        let n = prices.ncols();
        let assets = (0..n)
            .map(|i| AssetCode::new(&format!("A{}", i)).unwrap())
            .collect();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..prices.nrows())
            .map(|d| start + chrono::Days::new(d as u64))
            .collect();
        WindowedReturnSeries::from_prices(assets, dates, prices, Default::default()).unwrap()
    }

    #[rstest]
    #[case(ScalingBasis::PeriodsPerYear(252), 19, 252.0)]
    #[case(ScalingBasis::PeriodsPerYear(12), 19, 12.0)]
    #[case(ScalingBasis::Window, 19, 19.0)]
    fn test_basis_multiplier(#[case] basis: ScalingBasis, #[case] n: usize, #[case] expected: f64) {
        assert_eq!(basis.multiplier(n), expected);
    }

    #[test]
    fn test_scaling() {
        // returns 0.1, 0.0, -0.05 -> mean 0.01666.., sample var
        let returns = series(array![[100.0], [110.0], [110.0], [104.5]]);
        let config = StatisticsConfig {
            basis: ScalingBasis::Window,
            risk_free_rate: 0.01,
            ..Default::default()
        };
        let report = compute_statistics(&returns, None, &config).unwrap();
        let s = &report.assets[0];

        let r = [0.1, 0.0, -0.05];
        let m = r.iter().sum::<f64>() / 3.0;
        let var = r.iter().map(|x| (x - m).powi(2)).sum::<f64>() / 2.0;

        assert_eq!(report.multiplier, 3.0);
        assert_relative_eq!(s.expected_return, m * 3.0, epsilon = 1e-12);
        assert_relative_eq!(s.volatility, var.sqrt() * 3.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(s.sharpe_ratio, (m * 3.0 - 0.01) / (var.sqrt() * 3.0_f64.sqrt()), epsilon = 1e-12);
        assert_relative_eq!(s.historical_return, 0.045, epsilon = 1e-12);
        assert!(s.beta.is_none());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_constant_price_flags_sharpe() {
        let returns = series(array![[50.0, 10.0], [50.0, 11.0], [50.0, 10.5]]);
        let report = compute_statistics(&returns, None, &StatisticsConfig::default()).unwrap();

        let flat = &report.assets[0];
        assert_eq!(flat.volatility, 0.0);
        assert!(flat.sharpe_ratio.is_nan());
        assert!(!flat.has_sharpe());
        assert!(report.assets[1].has_sharpe());
        assert_eq!(
            report.warnings,
            vec![UndefinedStatistic {
                asset: flat.code.clone(),
                kind: UndefinedKind::ZeroVolatility
            }]
        );
    }

    #[test]
    fn test_requires_two_returns() {
        let returns = series(array![[1.0], [2.0]]);
        let err = compute_statistics(&returns, None, &StatisticsConfig::default());
        assert!(matches!(
            err,
            Err(RiskError::InsufficientData { required: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_mark_market_unavailable() {
        let returns = series(array![[10.0, 20.0], [11.0, 19.0], [10.5, 21.0]]);
        let mut report = compute_statistics(&returns, None, &StatisticsConfig::default()).unwrap();
        report.mark_market_unavailable("XJO");

        assert!(report.assets.iter().all(|s| s.beta.is_some_and(f64::is_nan)));
        assert!(report.assets.iter().all(|s| s.capm_expected_return.is_some_and(f64::is_nan)));
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.warnings[1].kind, UndefinedKind::InsufficientMarketOverlap);
        assert!(report.warnings[0].to_string().contains("benchmark"));
    }
}
