//! Analysis configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `HOBART__`-prefixed environment variables (`__` separates nested keys).
//! Command-line flags are applied by the caller after loading.

use config::{Environment, File, FileFormat};
use hobart_optimize::OptimizerConfig;
use hobart_risk::{ReturnMode, ScalingBasis, StatisticsConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const ENV_PREFIX: &str = "HOBART";
const ENV_SEPARATOR: &str = "__";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file or environment could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A setting is out of range
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Return series settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnConfig {
    /// Most recent prices taken per asset (default: 252)
    pub window: usize,
    /// Simple or log returns (default: simple)
    pub mode: ReturnMode,
}

impl Default for ReturnConfig {
    fn default() -> Self {
        Self {
            window: 252,
            mode: ReturnMode::Simple,
        }
    }
}

/// Complete analysis configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Return series settings
    pub returns: ReturnConfig,
    /// Statistics settings
    pub statistics: StatisticsConfig,
    /// Optimizer settings
    pub optimizer: OptimizerConfig,
}

impl AnalysisConfig {
    /// `<config dir>/hobart/hobart.toml`, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hobart").join("hobart.toml"))
    }

    /// Load configuration from `path` (required to exist) or from the default
    /// path (optional), with environment overrides, and validate it.
    ///
    /// # Errors
    /// Fails if an explicit file is missing, a source cannot be parsed, or a
    /// setting is out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder =
                    builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
            }
            None => {
                if let Some(default) = Self::default_path() {
                    let file = File::from(default.as_path())
                        .format(FileFormat::Toml)
                        .required(false);
                    builder = builder.add_source(file);
                }
            }
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string, without environment overrides.
    ///
    /// # Errors
    /// Fails on invalid TOML or out-of-range settings.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.returns.window == 0 {
            return Err(ConfigError::Validation(
                "returns.window must be at least 1".into(),
            ));
        }

        let stats = &self.statistics;
        if !stats.risk_free_rate.is_finite() || stats.risk_free_rate <= -1.0 {
            return Err(ConfigError::Validation(format!(
                "statistics.risk_free_rate must be finite and above -1, got {}",
                stats.risk_free_rate
            )));
        }
        if stats.periods_per_year == 0 {
            return Err(ConfigError::Validation(
                "statistics.periods_per_year must be positive".into(),
            ));
        }
        if stats.basis == ScalingBasis::PeriodsPerYear(0) {
            return Err(ConfigError::Validation(
                "statistics.basis periods_per_year must be positive".into(),
            ));
        }

        self.optimizer
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }
}
