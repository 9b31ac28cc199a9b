//! Report generation for portfolio analyses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required field was not set on the builder.
    #[error("Missing report field: {0}")]
    MissingField(&'static str),
}

/// A portfolio analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Assets analysed, in column order.
    pub assets: Vec<String>,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Price window length.
    pub window: usize,

    /// Report contents (JSON format).
    pub contents: serde_json::Value,
}

impl Report {
    /// Create a new report.
    pub fn new(assets: Vec<String>, window: usize, contents: serde_json::Value) -> Self {
        Self {
            assets,
            timestamp: Utc::now(),
            window,
            contents,
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    assets: Option<Vec<String>>,
    window: Option<usize>,
    contents: Option<serde_json::Value>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the analysed assets.
    pub fn assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets = Some(assets.into_iter().map(Into::into).collect());
        self
    }

    /// Set the price window.
    pub const fn window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    /// Set the report contents.
    pub fn contents(mut self, contents: serde_json::Value) -> Self {
        self.contents = Some(contents);
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<Report, ReportError> {
        let assets = self.assets.ok_or(ReportError::MissingField("assets"))?;
        let window = self.window.ok_or(ReportError::MissingField("window"))?;
        Ok(Report::new(
            assets,
            window,
            self.contents.unwrap_or(serde_json::Value::Null),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_creation() {
        let report = Report::new(
            vec!["BHP".to_string()],
            250,
            serde_json::json!({"test": "data"}),
        );

        assert_eq!(report.assets, vec!["BHP"]);
        assert_eq!(report.window, 250);
        assert!(report.to_json().unwrap().contains("\"window\": 250"));
    }

    #[test]
    fn test_report_builder() {
        let report = ReportBuilder::new()
            .assets(["CBA", "WBC"])
            .window(60)
            .contents(serde_json::json!({"key": "value"}))
            .build()
            .unwrap();

        assert_eq!(report.assets, vec!["CBA", "WBC"]);
        assert_eq!(report.window, 60);
    }

    #[test]
    fn test_report_builder_requires_window() {
        let err = ReportBuilder::new().assets(["CBA"]).build().unwrap_err();
        assert!(matches!(err, ReportError::MissingField("window")));
    }
}
