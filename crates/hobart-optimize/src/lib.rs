#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod allocation;
pub mod config;
pub mod error;
pub mod objective;
pub mod projection;
pub mod solver;

// Re-export main types
pub use allocation::{Allocation, AllocationResult, Optimizer, equal_weight, optimize};
pub use config::OptimizerConfig;
pub use error::{OptimizeError, Result};
pub use objective::{Objective, Problem};
pub use projection::project_capped_simplex;
pub use solver::{ProjectedGradient, Solution};
