//! Configuration of the signal computations.

use crate::error::{Result, ServiceError};
use chrono::NaiveDate;
use hobart_regression::RollingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by the residual-return, market-factor and event-study services.
///
/// Missing fields in a JSON file fall back to [`SignalConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// First date of the computed history
    pub history_start: NaiveDate,
    /// Last date of the computed history
    pub history_end: NaiveDate,
    /// Ticker of the market benchmark
    pub benchmark: String,
    /// Window of the residual-return regressions, in sessions
    pub residual_window: usize,
    /// Window of the market-factor regressions, in sessions
    pub market_factor_window: usize,
    /// Largest p-value of the primary slope for which a fit is kept
    pub significance: f64,
    /// Regression worker threads (None = available hardware parallelism)
    pub workers: Option<usize>,
    /// Object-key prefix of the remote cache tier
    pub remote_prefix: String,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            history_start: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap_or_default(),
            history_end: NaiveDate::from_ymd_opt(2017, 12, 31).unwrap_or_default(),
            benchmark: "SPY".to_string(),
            residual_window: 252,
            market_factor_window: 126,
            significance: 0.05,
            workers: None,
            remote_prefix: hobart_data::cache::DEFAULT_PREFIX.to_string(),
        }
    }
}

impl SignalConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.history_start > self.history_end {
            return Err(ServiceError::Config(format!(
                "history start {} is after history end {}",
                self.history_start, self.history_end
            )));
        }
        if self.benchmark.trim().is_empty() {
            return Err(ServiceError::Config("benchmark ticker is empty".to_string()));
        }
        self.residual_rolling().validate(1)?;
        self.market_factor_rolling().validate(1)?;
        Ok(())
    }

    /// Rolling configuration of the residual-return regressions.
    pub const fn residual_rolling(&self) -> RollingConfig {
        RollingConfig::new(self.residual_window)
            .with_significance(self.significance)
            .with_workers(self.workers)
    }

    /// Rolling configuration of the market-factor regressions.
    pub const fn market_factor_rolling(&self) -> RollingConfig {
        RollingConfig::new(self.market_factor_window)
            .with_significance(self.significance)
            .with_workers(self.workers)
    }
}
