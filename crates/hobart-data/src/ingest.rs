//! CSV ingestion of daily closing prices.
//!
//! Files are long-format tables with one row per observation:
//!
//! ```text
//! date,code,close
//! 2024-03-01,BHP,45.12
//! 2024-03-01,CBA,118.40
//! ```
//!
//! Header names are matched case-insensitively, and the column names used by
//! exchange daily price dumps (`STK_CODE`, `STK_CLOS`) are accepted as aliases.
//! Whether a file holds asset prices or a benchmark index is decided by the
//! caller at parse time and carried in [`IngestedFile`].

use crate::error::{DataError, Result};
use crate::panel::{AssetCode, IndexSeries, Observation, PricePanel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DATE_COLUMNS: &[&str] = &["DATE", "TRADE_DATE"];
const CODE_COLUMNS: &[&str] = &["CODE", "STK_CODE", "SYMBOL"];
const CLOSE_COLUMNS: &[&str] = &["CLOSE", "STK_CLOS", "PRICE"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// What a price file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesKind {
    /// Closing prices for tradable assets.
    Asset,
    /// Levels of a benchmark index.
    Index,
}

/// A parsed price file.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestedFile {
    /// Asset closing prices.
    Assets(PricePanel),
    /// Benchmark index levels.
    Index(IndexSeries),
}

impl IngestedFile {
    /// The kind this file was parsed as.
    pub const fn kind(&self) -> SeriesKind {
        match self {
            Self::Assets(_) => SeriesKind::Asset,
            Self::Index(_) => SeriesKind::Index,
        }
    }
}

/// Parse a raw closing-price cell.
///
/// Strips surrounding whitespace and NUL padding. Returns `None` for anything
/// that does not parse to a finite, strictly positive number.
pub fn clean_price(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    let value: f64 = trimmed.replace('\0', "").parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().to_uppercase();
        candidates.iter().any(|c| *c == h)
    })
}

fn parse_date(raw: &str, line: usize) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| DataError::Parse {
        line,
        reason: format!("invalid date {:?}: {}", raw, e),
    })
}

/// Read a price CSV.
///
/// `name` labels an index file; it is ignored for asset files.
///
/// # Errors
/// Fails on IO/CSV errors, missing columns, unparsable dates or empty codes,
/// and on duplicate `(date, code)` pairs. Unparsable prices are gaps.
pub fn read_price_csv<R: Read>(reader: R, kind: SeriesKind, name: &str) -> Result<IngestedFile> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let date_idx =
        find_column(&headers, DATE_COLUMNS).ok_or_else(|| DataError::MissingColumn("date".into()))?;
    let close_idx = find_column(&headers, CLOSE_COLUMNS)
        .ok_or_else(|| DataError::MissingColumn("close".into()))?;

    match kind {
        SeriesKind::Asset => {
            let code_idx = find_column(&headers, CODE_COLUMNS)
                .ok_or_else(|| DataError::MissingColumn("code".into()))?;
            let mut panel = PricePanel::new();
            for (i, record) in rdr.records().enumerate() {
                let record = record?;
                let line = i + 2;
                let date = parse_date(record.get(date_idx).unwrap_or_default(), line)?;
                let code = AssetCode::new(record.get(code_idx).unwrap_or_default())?;
                let price = record.get(close_idx).and_then(clean_price);
                panel.insert(code, date, price)?;
            }
            tracing::debug!(
                assets = panel.n_assets(),
                observations = panel.n_observations(),
                gaps = panel.gaps(),
                "parsed asset price file"
            );
            Ok(IngestedFile::Assets(panel))
        }
        SeriesKind::Index => {
            let mut index = IndexSeries::new(name);
            for (i, record) in rdr.records().enumerate() {
                let record = record?;
                let line = i + 2;
                let date = parse_date(record.get(date_idx).unwrap_or_default(), line)?;
                let price = record.get(close_idx).and_then(clean_price);
                if index.insert(date, price)? == Observation::Gap {
                    tracing::debug!(index = name, %date, "index level recorded as gap");
                }
            }
            Ok(IngestedFile::Index(index))
        }
    }
}

/// Read a price CSV from disk. Index files are named after the file stem.
///
/// # Errors
/// See [`read_price_csv`].
pub fn read_price_file<P: AsRef<Path>>(path: P, kind: SeriesKind) -> Result<IngestedFile> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default();
    let file = File::open(path)?;
    read_price_csv(file, kind, &name)
}
