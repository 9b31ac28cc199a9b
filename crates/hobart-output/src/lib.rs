#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;
pub mod table;

pub use export::{
    AllocationExport, AssetStatisticsExport, ExportError, ExportFormat, Exporter, HoldingExport,
};
pub use report::{Report, ReportBuilder, ReportError};
pub use table::{AllocationTable, MatrixTable, StatisticsTable, format_number, format_percent};
