//! Return Series Builder
//!
//! Converts a [`PricePanel`] into periodic returns over a trailing window.
//!
//! Window selection is per asset: each asset contributes the `window` most
//! recent dates on which it has a price. Only dates common to every requested
//! asset are kept, and returns are formed between consecutive kept dates:
//!
//! - simple: r_t = p_t / p_{t-1} - 1
//! - log:    r_t = ln(p_t / p_{t-1})
//!
//! The earliest kept date has no predecessor, so a window of T+1 aligned prices
//! yields T returns.

use crate::error::{Result, RiskError};
use chrono::NaiveDate;
use hobart_data::{AssetCode, IndexSeries, PricePanel};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How periodic returns are derived from consecutive prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnMode {
    /// p_t / p_{t-1} - 1
    #[default]
    Simple,
    /// ln(p_t / p_{t-1})
    Log,
}

impl ReturnMode {
    /// Return between two consecutive prices.
    pub fn compute(self, previous: f64, current: f64) -> f64 {
        match self {
            Self::Simple => current / previous - 1.0,
            Self::Log => (current / previous).ln(),
        }
    }
}

/// Returns of a set of assets over an aligned trailing window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedReturnSeries {
    assets: Vec<AssetCode>,
    price_dates: Vec<NaiveDate>,
    prices: Array2<f64>,
    returns: Array2<f64>,
    mode: ReturnMode,
}

impl WindowedReturnSeries {
    /// Build from an aligned price matrix (rows = ascending dates, columns = assets).
    ///
    /// # Errors
    /// Fails if the shapes disagree, or fewer than two dates are supplied.
    pub fn from_prices(
        assets: Vec<AssetCode>,
        price_dates: Vec<NaiveDate>,
        prices: Array2<f64>,
        mode: ReturnMode,
    ) -> Result<Self> {
        let (n_dates, n_assets) = prices.dim();
        if n_assets != assets.len() || n_dates != price_dates.len() {
            return Err(RiskError::DimensionMismatch(format!(
                "prices are {}x{}, expected {}x{}",
                n_dates,
                n_assets,
                price_dates.len(),
                assets.len()
            )));
        }
        if n_dates < 2 {
            return Err(RiskError::InsufficientData {
                required: 2,
                actual: n_dates,
            });
        }

        let mut returns = Array2::<f64>::zeros((n_dates - 1, n_assets));
        for t in 1..n_dates {
            for j in 0..n_assets {
                returns[[t - 1, j]] = mode.compute(prices[[t - 1, j]], prices[[t, j]]);
            }
        }

        Ok(Self {
            assets,
            price_dates,
            prices,
            returns,
            mode,
        })
    }

    /// Selected assets, in column order.
    pub fn assets(&self) -> &[AssetCode] {
        &self.assets
    }

    /// Aligned price dates (T + 1 entries).
    pub fn price_dates(&self) -> &[NaiveDate] {
        &self.price_dates
    }

    /// Dates carrying a return (T entries, the first price date dropped).
    pub fn return_dates(&self) -> &[NaiveDate] {
        &self.price_dates[1..]
    }

    /// Aligned prices, (T + 1) x n.
    pub const fn prices(&self) -> &Array2<f64> {
        &self.prices
    }

    /// Periodic returns, T x n.
    pub const fn returns(&self) -> &Array2<f64> {
        &self.returns
    }

    /// Return formula used.
    pub const fn mode(&self) -> ReturnMode {
        self.mode
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Number of return observations T.
    pub fn n_observations(&self) -> usize {
        self.returns.nrows()
    }

    /// Return column for `code`.
    pub fn column(&self, code: &AssetCode) -> Option<ArrayView1<'_, f64>> {
        let j = self.assets.iter().position(|a| a == code)?;
        Some(self.returns.column(j))
    }

    /// First-to-last price ratio minus one, per asset.
    pub fn historical_returns(&self) -> Array1<f64> {
        let first = self.prices.row(0);
        let last = self.prices.row(self.prices.nrows() - 1);
        Array1::from_iter(first.iter().zip(last.iter()).map(|(p0, p1)| p1 / p0 - 1.0))
    }
}

/// Build windowed returns for `assets` from `prices`.
///
/// # Errors
/// - [`RiskError::InvalidWindow`] if `window` is zero
/// - [`RiskError::EmptyAssetSet`] if no assets are requested
/// - [`RiskError::UnknownAsset`] if an asset has no prices
/// - [`RiskError::InsufficientData`] if fewer than two dates survive intersection
pub fn compute_returns(
    prices: &PricePanel,
    assets: &[AssetCode],
    window: usize,
    mode: ReturnMode,
) -> Result<WindowedReturnSeries> {
    if window == 0 {
        return Err(RiskError::InvalidWindow(window));
    }

    let mut selected: Vec<AssetCode> = Vec::with_capacity(assets.len());
    for code in assets {
        if !selected.contains(code) {
            selected.push(code.clone());
        }
    }
    if selected.is_empty() {
        return Err(RiskError::EmptyAssetSet);
    }

    let mut common: Option<BTreeSet<NaiveDate>> = None;
    for code in &selected {
        let series = prices
            .series(code)
            .ok_or_else(|| RiskError::UnknownAsset(code.to_string()))?;
        let recent: BTreeSet<NaiveDate> = series.latest_dates(window).into_iter().collect();
        common = Some(match common {
            None => recent,
            Some(acc) => acc.intersection(&recent).copied().collect(),
        });
    }
    let dates: Vec<NaiveDate> = common.unwrap_or_default().into_iter().collect();

    if dates.len() < 2 {
        return Err(RiskError::InsufficientData {
            required: 2,
            actual: dates.len(),
        });
    }

    let mut matrix = Array2::<f64>::zeros((dates.len(), selected.len()));
    for (j, code) in selected.iter().enumerate() {
        for (t, date) in dates.iter().enumerate() {
            // Every date in the intersection carries a price for every asset.
            matrix[[t, j]] = prices.price(code, date).unwrap_or(f64::NAN);
        }
    }

    tracing::debug!(
        assets = selected.len(),
        window,
        aligned_dates = dates.len(),
        "built windowed return series"
    );

    WindowedReturnSeries::from_prices(selected, dates, matrix, mode)
}

/// Asset returns inner-joined with benchmark returns on common dates.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketAlignedReturns {
    /// Joined dates, ascending.
    pub dates: Vec<NaiveDate>,
    /// Asset returns on the joined dates, rows x assets.
    pub assets: Array2<f64>,
    /// Benchmark returns on the joined dates.
    pub market: Array1<f64>,
    /// Benchmark name.
    pub index_name: String,
}

impl MarketAlignedReturns {
    /// Number of joined observations.
    pub fn n_observations(&self) -> usize {
        self.market.len()
    }
}

/// Restrict `index` to the window of `returns` and join it to the asset return dates.
///
/// Index returns are formed between consecutive index levels that fall inside
/// the asset window, using the same return formula as the asset series. Dates
/// present on only one side are dropped.
///
/// # Errors
/// Returns [`RiskError::InsufficientData`] if fewer than two dates survive the join.
pub fn align_market(
    returns: &WindowedReturnSeries,
    index: &IndexSeries,
) -> Result<MarketAlignedReturns> {
    let levels: Vec<(NaiveDate, f64)> = returns
        .price_dates()
        .iter()
        .filter_map(|d| index.prices().get(d).map(|p| (*d, p)))
        .collect();

    let market_by_date: BTreeMap<NaiveDate, f64> = levels
        .windows(2)
        .map(|w| (w[1].0, returns.mode().compute(w[0].1, w[1].1)))
        .collect();

    let mut rows = Vec::new();
    let mut dates = Vec::new();
    let mut market = Vec::new();
    for (row, date) in returns.return_dates().iter().enumerate() {
        if let Some(r) = market_by_date.get(date) {
            rows.push(row);
            dates.push(*date);
            market.push(*r);
        }
    }

    if rows.len() < 2 {
        return Err(RiskError::InsufficientData {
            required: 2,
            actual: rows.len(),
        });
    }

    Ok(MarketAlignedReturns {
        dates,
        assets: returns.returns().select(Axis(0), &rows),
        market: Array1::from(market),
        index_name: index.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn code(s: &str) -> AssetCode {
        AssetCode::new(s).unwrap()
    }

    fn panel(rows: &[(&str, u32, f64)]) -> PricePanel {
        let mut panel = PricePanel::new();
        for (c, d, p) in rows {
            panel.insert(code(c), day(*d), Some(*p)).unwrap();
        }
        panel
    }

    #[test]
    fn test_simple_and_log_returns() {
        let prices = panel(&[("A", 1, 100.0), ("A", 2, 110.0), ("A", 3, 121.0)]);

        let simple = compute_returns(&prices, &[code("A")], 3, ReturnMode::Simple).unwrap();
        assert_eq!(simple.n_observations(), 2);
        assert_relative_eq!(simple.returns()[[0, 0]], 0.10, epsilon = 1e-12);
        assert_relative_eq!(simple.returns()[[1, 0]], 0.10, epsilon = 1e-12);

        let log = compute_returns(&prices, &[code("A")], 3, ReturnMode::Log).unwrap();
        assert_relative_eq!(log.returns()[[0, 0]], 1.1_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(log.returns()[[1, 0]], 1.1_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_intersection_drops_partial_rows() {
        // B is missing day 2, so only days 1 and 3 are common.
        let prices = panel(&[
            ("A", 1, 10.0),
            ("A", 2, 11.0),
            ("A", 3, 12.0),
            ("B", 1, 20.0),
            ("B", 3, 22.0),
        ]);
        let series = compute_returns(&prices, &[code("A"), code("B")], 5, ReturnMode::Simple).unwrap();
        assert_eq!(series.price_dates(), &[day(1), day(3)]);
        assert_eq!(series.return_dates(), &[day(3)]);
        assert_relative_eq!(series.returns()[[0, 0]], 0.2, epsilon = 1e-12);
        assert_relative_eq!(series.returns()[[0, 1]], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_window_is_per_asset() {
        // A trades every day, B stopped after day 3: A's last two dates do not
        // overlap B's, so nothing is common.
        let prices = panel(&[
            ("A", 1, 1.0),
            ("A", 2, 1.0),
            ("A", 3, 1.0),
            ("A", 4, 1.0),
            ("A", 5, 1.0),
            ("B", 1, 1.0),
            ("B", 2, 1.0),
            ("B", 3, 1.0),
        ]);
        let err = compute_returns(&prices, &[code("A"), code("B")], 2, ReturnMode::Simple);
        assert!(matches!(
            err,
            Err(RiskError::InsufficientData {
                required: 2,
                actual: 0
            })
        ));
    }

    #[test]
    fn test_argument_errors() {
        let prices = panel(&[("A", 1, 1.0), ("A", 2, 2.0)]);
        assert!(matches!(
            compute_returns(&prices, &[code("A")], 0, ReturnMode::Simple),
            Err(RiskError::InvalidWindow(0))
        ));
        assert!(matches!(
            compute_returns(&prices, &[], 2, ReturnMode::Simple),
            Err(RiskError::EmptyAssetSet)
        ));
        assert!(matches!(
            compute_returns(&prices, &[code("Z")], 2, ReturnMode::Simple),
            Err(RiskError::UnknownAsset(c)) if c == "Z"
        ));
        assert!(matches!(
            compute_returns(&prices, &[code("A")], 1, ReturnMode::Simple),
            Err(RiskError::InsufficientData { actual: 1, .. })
        ));
    }

    #[test]
    fn test_historical_return_uses_prices() {
        let prices = panel(&[("A", 1, 50.0), ("A", 2, 40.0), ("A", 3, 60.0)]);
        let series = compute_returns(&prices, &[code("A")], 3, ReturnMode::Log).unwrap();
        assert_relative_eq!(series.historical_returns()[0], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_align_market_inner_join() {
        let prices = panel(&[
            ("A", 1, 10.0),
            ("A", 2, 11.0),
            ("A", 3, 12.1),
            ("A", 4, 13.31),
        ]);
        let series = compute_returns(&prices, &[code("A")], 4, ReturnMode::Simple).unwrap();

        let mut index = IndexSeries::new("IDX");
        for (d, p) in [(1, 100.0), (3, 110.0), (4, 121.0), (9, 130.0)] {
            index.insert(day(d), Some(p)).unwrap();
        }

        let aligned = align_market(&series, &index).unwrap();
        assert_eq!(aligned.dates, vec![day(3), day(4)]);
        assert_relative_eq!(aligned.market[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(aligned.market[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(aligned.assets[[0, 0]], 0.1, epsilon = 1e-12);
        assert_eq!(aligned.index_name, "IDX");
    }
}
