#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod capm;
pub mod covariance;
pub mod error;
pub mod returns;
pub mod statistics;

// Re-export main types
pub use capm::{CapmEstimate, daily_risk_free_rate, estimate_capm};
pub use covariance::{
    CovarianceError, CovarianceEstimator, CovarianceMatrix, SampleCovarianceEstimator,
    correlation_matrix,
};
pub use error::{Result, RiskError};
pub use returns::{
    MarketAlignedReturns, ReturnMode, WindowedReturnSeries, align_market, compute_returns,
};
pub use statistics::{
    AssetStatistics, ScalingBasis, StatisticsConfig, StatisticsReport, UndefinedKind,
    UndefinedStatistic, compute_statistics,
};
