//! Price panel data model.
//!
//! A [`PricePanel`] maps `(date, asset code)` to a strictly positive closing
//! price. Each pair holds at most one value; a second value for the same pair
//! is rejected rather than overwritten. Prices that are not finite or not
//! positive are never stored: they are counted as gaps.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use derive_more::{Display, Into};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Upper-case, trimmed asset identifier.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Into, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct AssetCode(String);

impl AssetCode {
    /// Normalize a raw code: strip whitespace and NUL padding, upper-case.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidCode`] if nothing is left after normalization.
    pub fn new(raw: &str) -> Result<Self> {
        let code = raw
            .trim_matches(|c: char| c.is_whitespace() || c == '\0')
            .to_uppercase();
        if code.is_empty() {
            return Err(DataError::InvalidCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    /// Borrow the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AssetCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for AssetCode {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AssetCode {
    type Error = DataError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(&s)
    }
}

/// Outcome of recording a single price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The price was stored.
    Recorded,
    /// The price was missing, non-finite or non-positive and was skipped.
    Gap,
    /// A price already exists for this date.
    Duplicate,
}

/// Closing prices of one instrument, ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    observations: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a price for `date`.
    ///
    /// `None`, non-finite and non-positive prices are reported as
    /// [`Observation::Gap`] and leave the series untouched.
    pub fn record(&mut self, date: NaiveDate, price: Option<f64>) -> Observation {
        let Some(price) = price.filter(|p| p.is_finite() && *p > 0.0) else {
            return Observation::Gap;
        };
        if self.observations.contains_key(&date) {
            return Observation::Duplicate;
        }
        self.observations.insert(date, price);
        Observation::Recorded
    }

    /// Price on `date`, if recorded.
    pub fn get(&self, date: &NaiveDate) -> Option<f64> {
        self.observations.get(date).copied()
    }

    /// Number of recorded prices.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether no price has been recorded.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Iterate `(date, price)` in ascending date order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&NaiveDate, &f64)> {
        self.observations.iter()
    }

    /// Recorded dates in ascending order.
    pub fn dates(&self) -> impl DoubleEndedIterator<Item = &NaiveDate> {
        self.observations.keys()
    }

    /// The `n` most recent dates that carry a price, ascending.
    pub fn latest_dates(&self, n: usize) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.observations.keys().rev().take(n).copied().collect();
        dates.reverse();
        dates
    }

    /// First and last recorded dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.observations.keys().next()?;
        let last = self.observations.keys().next_back()?;
        Some((*first, *last))
    }
}

impl FromIterator<(NaiveDate, f64)> for PriceSeries {
    /// Build a series, silently dropping gaps and keeping the first price per date.
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        let mut series = Self::new();
        for (date, price) in iter {
            series.record(date, Some(price));
        }
        series
    }
}

/// Date × asset-code matrix of closing prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricePanel {
    series: BTreeMap<AssetCode, PriceSeries>,
    gaps: usize,
}

impl PricePanel {
    /// Create an empty panel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a closing price.
    ///
    /// # Errors
    /// Returns [`DataError::DuplicateObservation`] if the pair already holds a price.
    pub fn insert(
        &mut self,
        code: AssetCode,
        date: NaiveDate,
        price: Option<f64>,
    ) -> Result<Observation> {
        let series = self.series.entry(code.clone()).or_default();
        match series.record(date, price) {
            Observation::Duplicate => Err(DataError::DuplicateObservation {
                code: code.to_string(),
                date,
            }),
            Observation::Gap => {
                tracing::debug!(code = %code, %date, "price recorded as gap");
                self.gaps += 1;
                if series.is_empty() {
                    self.series.remove(&code);
                }
                Ok(Observation::Gap)
            }
            Observation::Recorded => Ok(Observation::Recorded),
        }
    }

    /// Add every price of `series` under `code`.
    ///
    /// # Errors
    /// Fails on the first date that already holds a price for `code`.
    pub fn insert_series(&mut self, code: AssetCode, series: &PriceSeries) -> Result<()> {
        for (date, price) in series.iter() {
            self.insert(code.clone(), *date, Some(*price))?;
        }
        Ok(())
    }

    /// Merge another panel into this one.
    ///
    /// # Errors
    /// Fails if both panels hold a price for the same `(date, code)` pair.
    pub fn merge(&mut self, other: Self) -> Result<()> {
        self.gaps += other.gaps;
        for (code, series) in other.series {
            self.insert_series(code, &series)?;
        }
        Ok(())
    }

    /// Asset codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = &AssetCode> {
        self.series.keys()
    }

    /// Whether the panel holds any price for `code`.
    pub fn contains(&self, code: &AssetCode) -> bool {
        self.series.contains_key(code)
    }

    /// Price series for `code`.
    pub fn series(&self, code: &AssetCode) -> Option<&PriceSeries> {
        self.series.get(code)
    }

    /// Price for `code` on `date`.
    pub fn price(&self, code: &AssetCode, date: &NaiveDate) -> Option<f64> {
        self.series.get(code)?.get(date)
    }

    /// Union of all dates carrying at least one price.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.series
            .values()
            .flat_map(|s| s.dates().copied())
            .collect()
    }

    /// First and last dates recorded for `code`.
    pub fn date_range(&self, code: &AssetCode) -> Option<(NaiveDate, NaiveDate)> {
        self.series.get(code)?.date_range()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.series.len()
    }

    /// Number of stored prices across all assets.
    pub fn n_observations(&self) -> usize {
        self.series.values().map(PriceSeries::len).sum()
    }

    /// Number of prices skipped as gaps.
    pub const fn gaps(&self) -> usize {
        self.gaps
    }

    /// Whether the panel holds no prices.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// A named benchmark index, e.g. a composite index level per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSeries {
    name: String,
    prices: PriceSeries,
    gaps: usize,
}

impl IndexSeries {
    /// Create an empty index series.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prices: PriceSeries::new(),
            gaps: 0,
        }
    }

    /// Create an index series from existing prices.
    pub fn from_prices(name: impl Into<String>, prices: PriceSeries) -> Self {
        Self {
            name: name.into(),
            prices,
            gaps: 0,
        }
    }

    /// Record an index level.
    ///
    /// # Errors
    /// Returns [`DataError::DuplicateObservation`] if `date` already holds a level.
    pub fn insert(&mut self, date: NaiveDate, price: Option<f64>) -> Result<Observation> {
        match self.prices.record(date, price) {
            Observation::Duplicate => Err(DataError::DuplicateObservation {
                code: self.name.clone(),
                date,
            }),
            Observation::Gap => {
                self.gaps += 1;
                Ok(Observation::Gap)
            }
            Observation::Recorded => Ok(Observation::Recorded),
        }
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index levels.
    pub const fn prices(&self) -> &PriceSeries {
        &self.prices
    }

    /// Number of levels skipped as gaps.
    pub const fn gaps(&self) -> usize {
        self.gaps
    }
}
