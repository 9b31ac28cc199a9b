//! End-to-end portfolio analysis.
//!
//! [`analyze`] runs the full pipeline over a price panel: windowed returns,
//! optional market alignment, per-asset statistics, covariance and
//! correlation, the three optimized allocations and the equal-weight
//! reference. Data problems abort the run. A failing objective does not: it is
//! reported inside [`AllocationResult`] next to the objectives that solved.

use crate::settings::{AnalysisConfig, ConfigError};
use hobart_data::{AssetCode, DataError, IndexSeries, PricePanel};
use hobart_optimize::{Allocation, AllocationResult, OptimizeError, Optimizer};
use hobart_output::{
    AllocationExport, AllocationTable, AssetStatisticsExport, ExportError, MatrixTable, Report,
    ReportBuilder, ReportError, StatisticsTable,
};
use hobart_risk::{
    CovarianceError, CovarianceMatrix, RiskError, SampleCovarianceEstimator, StatisticsReport,
    WindowedReturnSeries, align_market, compute_returns, compute_statistics, correlation_matrix,
};
use ndarray::{Array1, Array2};
use serde::Serialize;
use thiserror::Error;

/// Errors that abort an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Price data error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Return or statistics error
    #[error(transparent)]
    Risk(#[from] RiskError),

    /// Covariance estimation error
    #[error(transparent)]
    Covariance(#[from] CovarianceError),

    /// Invalid or infeasible optimization problem
    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    /// Report error
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Export error
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Outcome of a complete analysis.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Windowed return series the statistics were computed on.
    pub returns: WindowedReturnSeries,
    /// Per-asset statistics.
    pub statistics: StatisticsReport,
    /// Scaled sample covariance.
    pub covariance: CovarianceMatrix,
    /// Pearson correlation.
    pub correlation: Array2<f64>,
    /// Optimized allocations, one outcome per objective.
    pub allocations: AllocationResult,
    /// Equal-weight reference allocation.
    pub equal_weight: Allocation,
    /// Benchmark used for beta, if any.
    pub index_name: Option<String>,
    /// Settings the analysis ran with.
    pub config: AnalysisConfig,
}

#[derive(Serialize)]
struct ReportContents<'a> {
    config: &'a AnalysisConfig,
    index: Option<&'a str>,
    return_dates: Option<(String, String)>,
    n_observations: usize,
    multiplier: f64,
    statistics: Vec<AssetStatisticsExport>,
    warnings: Vec<String>,
    covariance: Vec<Vec<f64>>,
    correlation: Vec<Vec<f64>>,
    allocations: Vec<AllocationExport>,
}

fn matrix_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.outer_iter().map(|row| row.to_vec()).collect()
}

impl Analysis {
    /// Analysed assets in column order.
    pub fn assets(&self) -> &[AssetCode] {
        self.returns.assets()
    }

    /// Statistics table for display.
    pub const fn statistics_table(&self) -> StatisticsTable<'_> {
        StatisticsTable::new(&self.statistics)
    }

    /// Allocation table, including the equal-weight column.
    pub fn allocation_table(&self) -> AllocationTable<'_> {
        AllocationTable::new(self.assets(), &self.allocations).with_equal_weight(&self.equal_weight)
    }

    /// Covariance table for display.
    pub fn covariance_table(&self) -> MatrixTable<'_> {
        MatrixTable::new("Covariance", self.assets(), self.covariance.matrix()).decimals(6)
    }

    /// Correlation table for display.
    pub fn correlation_table(&self) -> MatrixTable<'_> {
        MatrixTable::new("Correlation", self.assets(), &self.correlation)
    }

    /// Per-asset statistics ready for export.
    pub fn statistics_export(&self) -> Vec<AssetStatisticsExport> {
        AssetStatisticsExport::from_report(&self.statistics)
    }

    /// All allocations ready for export, equal weight last.
    pub fn allocation_exports(&self) -> Vec<AllocationExport> {
        AllocationExport::from_result(self.assets(), &self.allocations, Some(&self.equal_weight))
    }

    /// Build the JSON report.
    ///
    /// # Errors
    /// Fails if the contents cannot be serialized.
    pub fn report(&self) -> Result<Report, AnalysisError> {
        let dates = self.returns.return_dates();
        let contents = ReportContents {
            config: &self.config,
            index: self.index_name.as_deref(),
            return_dates: dates
                .first()
                .zip(dates.last())
                .map(|(first, last)| (first.to_string(), last.to_string())),
            n_observations: self.statistics.n_observations,
            multiplier: self.statistics.multiplier,
            statistics: self.statistics_export(),
            warnings: self
                .statistics
                .warnings
                .iter()
                .map(ToString::to_string)
                .collect(),
            covariance: matrix_rows(self.covariance.matrix()),
            correlation: matrix_rows(&self.correlation),
            allocations: self.allocation_exports(),
        };
        let contents = serde_json::to_value(&contents).map_err(ReportError::from)?;

        Ok(ReportBuilder::new()
            .assets(self.assets().iter().map(AssetCode::to_string))
            .window(self.config.returns.window)
            .contents(contents)
            .build()?)
    }
}

/// Run the full analysis for `assets`.
///
/// Beta and CAPM expected returns are computed only when `index` is given.
/// If it shares fewer than two return dates with the window, they are NaN and
/// flagged in the statistics warnings.
///
/// # Errors
/// Fails on invalid settings, unknown assets, too little aligned data, or an
/// infeasible weight cap. Objectives that fail to converge are not errors.
pub fn analyze(
    panel: &PricePanel,
    index: Option<&IndexSeries>,
    assets: &[AssetCode],
    config: &AnalysisConfig,
) -> Result<Analysis, AnalysisError> {
    config.validate()?;
    let optimizer = Optimizer::new(config.optimizer)?;

    let returns = compute_returns(panel, assets, config.returns.window, config.returns.mode)?;
    tracing::info!(
        assets = returns.n_assets(),
        observations = returns.n_observations(),
        mode = ?returns.mode(),
        "computed return series"
    );

    let mut no_overlap = None;
    let market = match index.map(|idx| (idx, align_market(&returns, idx))) {
        Some((_, Ok(m))) => {
            tracing::info!(
                index = %m.index_name,
                observations = m.n_observations(),
                "aligned market returns"
            );
            Some(m)
        }
        Some((idx, Err(RiskError::InsufficientData { actual, .. }))) => {
            tracing::warn!(
                index = idx.name(),
                aligned = actual,
                "benchmark does not overlap the return window"
            );
            no_overlap = Some(idx.name());
            None
        }
        Some((_, Err(e))) => return Err(e.into()),
        None => None,
    };

    let mut statistics = compute_statistics(&returns, market.as_ref(), &config.statistics)?;
    if let Some(name) = no_overlap {
        statistics.mark_market_unavailable(name);
    }
    tracing::info!(
        multiplier = statistics.multiplier,
        warnings = statistics.warnings.len(),
        "computed statistics"
    );

    let covariance = CovarianceMatrix::estimate(
        &SampleCovarianceEstimator::new(),
        &returns,
        statistics.multiplier,
    )?;
    let correlation = correlation_matrix(covariance.matrix());

    let mu = Array1::from(statistics.expected_returns());
    let rf = config.statistics.risk_free_rate;
    let allocations = optimizer.optimize(mu.view(), covariance.matrix().view(), rf)?;
    let equal_weight = optimizer.equal_weight(mu.view(), covariance.matrix().view(), rf)?;
    tracing::info!(
        solved = allocations.successes().count(),
        "optimized allocations"
    );

    Ok(Analysis {
        returns,
        statistics,
        covariance,
        correlation,
        allocations,
        equal_weight,
        index_name: index.map(|idx| idx.name().to_string()),
        config: *config,
    })
}
