//! Export functionality for statistics and allocations.
//!
//! This module provides CSV and JSON export of per-asset statistics and of
//! optimized allocations. Undefined values (NaN) are exported as missing:
//! an empty CSV cell or a JSON `null`.

use hobart_data::AssetCode;
use hobart_optimize::{Allocation, AllocationResult, Objective, OptimizeError};
use hobart_risk::{AssetStatistics, StatisticsReport};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialized CSV was not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty" | "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

fn defined(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn write_csv<T: Serialize>(records: impl IntoIterator<Item = T>) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Statistics of a single asset, with undefined values as `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetStatisticsExport {
    /// Asset code.
    pub code: String,

    /// Price-window return.
    pub historical_return: Option<f64>,

    /// Scaled expected return.
    pub expected_return: Option<f64>,

    /// Scaled volatility.
    pub volatility: Option<f64>,

    /// Sharpe ratio, missing when volatility is zero.
    pub sharpe_ratio: Option<f64>,

    /// CAPM beta, missing without a benchmark or when it is undefined.
    pub beta: Option<f64>,

    /// Scaled CAPM expected return.
    pub capm_expected_return: Option<f64>,
}

impl From<&AssetStatistics> for AssetStatisticsExport {
    fn from(stats: &AssetStatistics) -> Self {
        Self {
            code: stats.code.to_string(),
            historical_return: defined(stats.historical_return),
            expected_return: defined(stats.expected_return),
            volatility: defined(stats.volatility),
            sharpe_ratio: defined(stats.sharpe_ratio),
            beta: stats.beta.and_then(defined),
            capm_expected_return: stats.capm_expected_return.and_then(defined),
        }
    }
}

impl AssetStatisticsExport {
    /// One record per asset of `report`.
    pub fn from_report(report: &StatisticsReport) -> Vec<Self> {
        report.assets.iter().map(Self::from).collect()
    }
}

/// Weight of one asset in an allocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldingExport {
    /// Asset code.
    pub code: String,

    /// Weight (0.0 to 1.0).
    pub weight: f64,
}

/// An allocation, or the reason it is missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationExport {
    /// `max_return`, `min_risk`, `max_sharpe` or `equal_weight`.
    pub strategy: String,

    /// Realized expected return.
    pub expected_return: Option<f64>,

    /// Realized volatility.
    pub volatility: Option<f64>,

    /// Realized Sharpe ratio.
    pub sharpe_ratio: Option<f64>,

    /// Weights per asset; empty when the objective failed.
    pub holdings: Vec<HoldingExport>,

    /// Failure message when the objective did not converge.
    pub error: Option<String>,
}

impl AllocationExport {
    /// Export a solved allocation over `assets`.
    pub fn from_allocation(assets: &[AssetCode], allocation: &Allocation) -> Self {
        Self {
            strategy: allocation.label().to_string(),
            expected_return: defined(allocation.expected_return),
            volatility: defined(allocation.volatility),
            sharpe_ratio: defined(allocation.sharpe_ratio),
            holdings: assets
                .iter()
                .zip(&allocation.weights)
                .map(|(code, weight)| HoldingExport {
                    code: code.to_string(),
                    weight: *weight,
                })
                .collect(),
            error: None,
        }
    }

    /// Export a failed objective.
    pub fn failed(objective: Objective, error: &OptimizeError) -> Self {
        Self {
            strategy: objective.name().to_string(),
            expected_return: None,
            volatility: None,
            sharpe_ratio: None,
            holdings: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// Export all three objectives, followed by the equal-weight reference if given.
    pub fn from_result(
        assets: &[AssetCode],
        result: &AllocationResult,
        equal_weight: Option<&Allocation>,
    ) -> Vec<Self> {
        let mut exports: Vec<Self> = result
            .iter()
            .map(|(objective, outcome)| match outcome {
                Ok(allocation) => Self::from_allocation(assets, allocation),
                Err(e) => Self::failed(objective, e),
            })
            .collect();
        if let Some(eq) = equal_weight {
            exports.push(Self::from_allocation(assets, eq));
        }
        exports
    }

    /// Sum of weights (1.0 for a solved allocation).
    pub fn total_weight(&self) -> f64 {
        self.holdings.iter().map(|h| h.weight).sum()
    }

    fn to_flat_records(&self) -> Vec<AllocationFlat> {
        if self.holdings.is_empty() {
            return vec![AllocationFlat {
                strategy: self.strategy.clone(),
                code: None,
                weight: None,
                expected_return: self.expected_return,
                volatility: self.volatility,
                sharpe_ratio: self.sharpe_ratio,
                error: self.error.clone(),
            }];
        }
        self.holdings
            .iter()
            .map(|h| AllocationFlat {
                strategy: self.strategy.clone(),
                code: Some(h.code.clone()),
                weight: Some(h.weight),
                expected_return: self.expected_return,
                volatility: self.volatility,
                sharpe_ratio: self.sharpe_ratio,
                error: self.error.clone(),
            })
            .collect()
    }
}

/// Flattened allocation for CSV export, one row per holding.
#[derive(Debug, Serialize, Deserialize)]
struct AllocationFlat {
    strategy: String,
    code: Option<String>,
    weight: Option<f64>,
    expected_return: Option<f64>,
    volatility: Option<f64>,
    sharpe_ratio: Option<f64>,
    error: Option<String>,
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for AssetStatisticsExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_csv([self]),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for Vec<AssetStatisticsExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_csv(self),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for AllocationExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_csv(self.to_flat_records()),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for Vec<AllocationExport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_csv(self.iter().flat_map(AllocationExport::to_flat_records)),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(sharpe: f64) -> AssetStatistics {
        AssetStatistics {
            code: AssetCode::new("bhp").unwrap(),
            historical_return: 0.12,
            expected_return: 0.1,
            volatility: 0.2,
            sharpe_ratio: sharpe,
            beta: Some(1.1),
            capm_expected_return: Some(0.09),
        }
    }

    fn allocation() -> Allocation {
        Allocation {
            objective: Some(Objective::MinRisk),
            weights: vec![0.25, 0.75],
            expected_return: 0.07,
            volatility: 0.11,
            sharpe_ratio: 0.5,
            iterations: 12,
        }
    }

    fn codes() -> Vec<AssetCode> {
        vec![AssetCode::new("A").unwrap(), AssetCode::new("B").unwrap()]
    }

    #[test]
    fn test_statistics_export_csv() {
        let export = AssetStatisticsExport::from(&stats(0.4));
        let csv = export.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.starts_with("code,historical_return,expected_return"));
        assert!(csv.contains("BHP,0.12,0.1,0.2,0.4,1.1,0.09"));
    }

    #[test]
    fn test_undefined_sharpe_is_missing() {
        let export = AssetStatisticsExport::from(&stats(f64::NAN));
        assert_eq!(export.sharpe_ratio, None);

        let csv = export.export_to_string(ExportFormat::Csv).unwrap();
        assert!(csv.contains("BHP,0.12,0.1,0.2,,1.1,0.09"));

        let json = export.export_to_string(ExportFormat::Json).unwrap();
        assert!(json.contains("\"sharpe_ratio\":null"));
    }

    #[test]
    fn test_allocation_export_csv_rows() {
        let export = AllocationExport::from_allocation(&codes(), &allocation());
        assert_eq!(export.strategy, "min_risk");
        assert!((export.total_weight() - 1.0).abs() < 1e-12);

        let csv = export.export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("min_risk,A,0.25"));
        assert!(lines[2].starts_with("min_risk,B,0.75"));
    }

    #[test]
    fn test_failed_allocation_export() {
        let error = OptimizeError::OptimizationFailed {
            objective: Objective::MaxSharpe,
            iterations: 10,
            residual: 0.5,
        };
        let exports = vec![
            AllocationExport::from_allocation(&codes(), &allocation()),
            AllocationExport::failed(Objective::MaxSharpe, &error),
        ];
        let csv = exports.export_to_string(ExportFormat::Csv).unwrap();
        assert_eq!(csv.lines().count(), 4);
        assert!(csv.contains("max_sharpe,,,,,,"));

        let json = exports.export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(json.contains("Optimization failed for max_sharpe"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("pretty".parse::<ExportFormat>().unwrap().extension(), "json");
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_to_file() {
        let path = std::env::temp_dir().join("hobart_output_export_test.json");
        let export = AssetStatisticsExport::from(&stats(0.4));
        export.export_to_file(&path, ExportFormat::Json).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"code\":\"BHP\""));
        std::fs::remove_file(path).unwrap();
    }
}
