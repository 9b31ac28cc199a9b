#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod ingest;
pub mod panel;

pub use cache::{CacheStats, ContentKey, PanelCache};
pub use error::{DataError, Result};
pub use ingest::{IngestedFile, SeriesKind, clean_price, read_price_csv, read_price_file};
pub use panel::{AssetCode, IndexSeries, Observation, PricePanel, PriceSeries};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
