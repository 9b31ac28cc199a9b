//! Fixed-width tables for terminal display.

use hobart_data::AssetCode;
use hobart_optimize::{Allocation, AllocationResult};
use hobart_risk::StatisticsReport;
use ndarray::Array2;
use std::fmt;

const WIDTH: usize = 80;
const NOT_AVAILABLE: &str = "n/a";

/// Format a fraction as a percentage with two decimals, `n/a` if undefined.
pub fn format_percent(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        NOT_AVAILABLE.to_string()
    }
}

/// Format a number with `decimals` places, `n/a` if undefined.
pub fn format_number(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", decimals, value)
    } else {
        NOT_AVAILABLE.to_string()
    }
}

fn rule(output: &mut String, c: char) {
    output.extend(std::iter::repeat_n(c, WIDTH));
    output.push('\n');
}

/// Per-asset statistics table.
#[derive(Debug, Clone, Copy)]
pub struct StatisticsTable<'a> {
    report: &'a StatisticsReport,
}

impl<'a> StatisticsTable<'a> {
    /// Create a table over `report`.
    pub const fn new(report: &'a StatisticsReport) -> Self {
        Self { report }
    }

    fn has_capm(&self) -> bool {
        self.report.assets.iter().any(|s| s.beta.is_some())
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();
        let capm = self.has_capm();

        output.push_str(&format!(
            "\nAsset Statistics ({} returns, basis x{})\n",
            self.report.n_observations, self.report.multiplier
        ));
        rule(&mut output, '=');
        output.push_str(&format!(
            "{:<10} {:>11} {:>11} {:>11} {:>8}",
            "Asset", "Hist. Ret.", "Exp. Ret.", "Volatility", "Sharpe"
        ));
        if capm {
            output.push_str(&format!(" {:>8} {:>11}", "Beta", "CAPM Ret."));
        }
        output.push('\n');
        rule(&mut output, '-');

        for s in &self.report.assets {
            output.push_str(&format!(
                "{:<10} {:>11} {:>11} {:>11} {:>8}",
                s.code.as_str(),
                format_percent(s.historical_return),
                format_percent(s.expected_return),
                format_percent(s.volatility),
                format_number(s.sharpe_ratio, 3),
            ));
            if capm {
                output.push_str(&format!(
                    " {:>8} {:>11}",
                    s.beta.map_or_else(|| NOT_AVAILABLE.to_string(), |b| format_number(b, 3)),
                    s.capm_expected_return
                        .map_or_else(|| NOT_AVAILABLE.to_string(), format_percent),
                ));
            }
            output.push('\n');
        }

        if !self.report.warnings.is_empty() {
            output.push_str("\nWarnings:\n");
            for warning in &self.report.warnings {
                output.push_str(&format!("  {}\n", warning));
            }
        }
        rule(&mut output, '=');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("| Asset | Historical Return | Expected Return | Volatility | Sharpe | Beta |\n");
        output.push_str("|-------|-------------------|-----------------|------------|--------|------|\n");
        for s in &self.report.assets {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                s.code,
                format_percent(s.historical_return),
                format_percent(s.expected_return),
                format_percent(s.volatility),
                format_number(s.sharpe_ratio, 3),
                s.beta.map_or_else(|| NOT_AVAILABLE.to_string(), |b| format_number(b, 3)),
            ));
        }
        output
    }
}

impl fmt::Display for StatisticsTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_table())
    }
}

/// Allocation weights and realized metrics, one column per strategy.
#[derive(Debug, Clone, Copy)]
pub struct AllocationTable<'a> {
    assets: &'a [AssetCode],
    result: &'a AllocationResult,
    equal_weight: Option<&'a Allocation>,
}

impl<'a> AllocationTable<'a> {
    /// Create a table over the optimized allocations.
    pub const fn new(assets: &'a [AssetCode], result: &'a AllocationResult) -> Self {
        Self {
            assets,
            result,
            equal_weight: None,
        }
    }

    /// Add the equal-weight reference column.
    pub const fn with_equal_weight(mut self, allocation: &'a Allocation) -> Self {
        self.equal_weight = Some(allocation);
        self
    }

    fn columns(&self) -> Vec<(&'static str, Option<&'a Allocation>)> {
        let mut columns: Vec<_> = self
            .result
            .iter()
            .map(|(objective, outcome)| (objective.name(), outcome.as_ref().ok()))
            .collect();
        if let Some(eq) = self.equal_weight {
            columns.push(("equal_weight", Some(eq)));
        }
        columns
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();
        let columns = self.columns();

        output.push_str("\nAllocations\n");
        rule(&mut output, '=');
        output.push_str(&format!("{:<12}", "Asset"));
        for (name, _) in &columns {
            output.push_str(&format!(" {:>13}", name));
        }
        output.push('\n');
        rule(&mut output, '-');

        for (i, code) in self.assets.iter().enumerate() {
            output.push_str(&format!("{:<12}", code.as_str()));
            for (_, allocation) in &columns {
                let cell = allocation
                    .and_then(|a| a.weights.get(i))
                    .map_or_else(|| "failed".to_string(), |w| format_percent(*w));
                output.push_str(&format!(" {:>13}", cell));
            }
            output.push('\n');
        }
        rule(&mut output, '-');

        let metrics: [(&str, fn(&Allocation) -> String); 3] = [
            ("Return", |a| format_percent(a.expected_return)),
            ("Volatility", |a| format_percent(a.volatility)),
            ("Sharpe", |a| format_number(a.sharpe_ratio, 3)),
        ];
        for (label, metric) in metrics {
            output.push_str(&format!("{:<12}", label));
            for (_, allocation) in &columns {
                let cell = allocation.map_or_else(|| "failed".to_string(), metric);
                output.push_str(&format!(" {:>13}", cell));
            }
            output.push('\n');
        }

        let failures: Vec<String> = self
            .result
            .iter()
            .filter_map(|(_, outcome)| outcome.as_ref().err().map(ToString::to_string))
            .collect();
        if !failures.is_empty() {
            output.push_str("\nFailures:\n");
            for failure in failures {
                output.push_str(&format!("  {}\n", failure));
            }
        }
        rule(&mut output, '=');

        output
    }
}

impl fmt::Display for AllocationTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_table())
    }
}

/// Square asset-by-asset matrix, e.g. covariance or correlation.
#[derive(Debug, Clone, Copy)]
pub struct MatrixTable<'a> {
    title: &'a str,
    assets: &'a [AssetCode],
    matrix: &'a Array2<f64>,
    decimals: usize,
}

impl<'a> MatrixTable<'a> {
    /// Create a table with four decimals.
    pub const fn new(title: &'a str, assets: &'a [AssetCode], matrix: &'a Array2<f64>) -> Self {
        Self {
            title,
            assets,
            matrix,
            decimals: 4,
        }
    }

    /// Set the number of decimals.
    pub const fn decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", self.title));
        output.push_str(&format!("{:<10}", ""));
        for code in self.assets {
            output.push_str(&format!(" {:>10}", code.as_str()));
        }
        output.push('\n');
        for (i, code) in self.assets.iter().enumerate() {
            output.push_str(&format!("{:<10}", code.as_str()));
            for j in 0..self.assets.len() {
                let value = self.matrix.get((i, j)).copied().unwrap_or(f64::NAN);
                output.push_str(&format!(" {:>10}", format_number(value, self.decimals)));
            }
            output.push('\n');
        }
        output
    }
}

impl fmt::Display for MatrixTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hobart_optimize::{Objective, OptimizeError};
    use hobart_risk::{AssetStatistics, UndefinedKind, UndefinedStatistic};
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    #[case(0.1234, "12.34%")]
    #[case(-0.05, "-5.00%")]
    #[case(f64::NAN, "n/a")]
    #[case(f64::INFINITY, "n/a")]
    fn test_format_percent(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_percent(value), expected);
    }

    fn codes() -> Vec<AssetCode> {
        vec![AssetCode::new("AAA").unwrap(), AssetCode::new("BBB").unwrap()]
    }

    #[test]
    fn test_statistics_table_shows_na() {
        let code = AssetCode::new("FLAT").unwrap();
        let report = StatisticsReport {
            multiplier: 252.0,
            n_observations: 19,
            assets: vec![AssetStatistics {
                code: code.clone(),
                historical_return: 0.0,
                expected_return: 0.0,
                volatility: 0.0,
                sharpe_ratio: f64::NAN,
                beta: Some(f64::NAN),
                capm_expected_return: Some(f64::NAN),
            }],
            warnings: vec![UndefinedStatistic {
                asset: code,
                kind: UndefinedKind::ZeroVolatility,
            }],
        };
        let table = StatisticsTable::new(&report).to_ascii_table();
        assert!(table.contains("FLAT"));
        assert!(table.contains("n/a"));
        assert!(table.contains("Beta"));
        assert!(table.contains("FLAT: zero volatility"));
        assert!(StatisticsTable::new(&report).to_markdown().contains("| FLAT |"));
    }

    #[test]
    fn test_allocation_table_marks_failures() {
        let solved = Allocation {
            objective: Some(Objective::MaxReturn),
            weights: vec![0.6, 0.4],
            expected_return: 0.08,
            volatility: 0.15,
            sharpe_ratio: 0.4,
            iterations: 3,
        };
        let failure = OptimizeError::OptimizationFailed {
            objective: Objective::MaxSharpe,
            iterations: 10_000,
            residual: 1e-3,
        };
        let result = AllocationResult {
            max_return: Ok(solved.clone()),
            min_risk: Ok(Allocation {
                objective: Some(Objective::MinRisk),
                ..solved.clone()
            }),
            max_sharpe: Err(failure),
        };
        let eq = Allocation {
            objective: None,
            weights: vec![0.5, 0.5],
            ..solved
        };
        let assets = codes();
        let table = AllocationTable::new(&assets, &result)
            .with_equal_weight(&eq)
            .to_ascii_table();

        assert!(table.contains("max_return"));
        assert!(table.contains("equal_weight"));
        assert!(table.contains("60.00%"));
        assert!(table.contains("failed"));
        assert!(table.contains("Optimization failed for max_sharpe"));
    }

    #[test]
    fn test_matrix_table() {
        let assets = codes();
        let matrix = array![[1.0, 0.25], [0.25, 1.0]];
        let table = MatrixTable::new("Correlation", &assets, &matrix)
            .decimals(2)
            .to_string();
        assert!(table.contains("Correlation"));
        assert!(table.contains("0.25"));
        assert!(table.contains("BBB"));
    }
}
