//! Rolling-window configuration and per-asset jobs.

pub mod job;

pub use job::{AssetRegression, RegressionRow};

use crate::error::{RegressionError, Result};
use serde::{Deserialize, Serialize};

/// Default significance level of the primary factor's slope.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Parameters of a rolling regression batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingConfig {
    /// Number of trailing observations in each fit
    pub window: usize,
    /// Largest p-value of the primary slope for which the fit is kept
    pub significance: f64,
    /// Worker threads (None = available hardware parallelism)
    pub workers: Option<usize>,
}

impl RollingConfig {
    /// Configuration with the given window and default gate and pool size.
    pub const fn new(window: usize) -> Self {
        Self {
            window,
            significance: DEFAULT_SIGNIFICANCE,
            workers: None,
        }
    }

    /// Set the significance level.
    pub const fn with_significance(mut self, significance: f64) -> Self {
        self.significance = significance;
        self
    }

    /// Set the worker count.
    pub const fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Check the configuration for a model with `n_factors` regressors.
    pub fn validate(&self, n_factors: usize) -> Result<()> {
        if n_factors == 0 {
            return Err(RegressionError::InvalidConfig(
                "at least one factor column is required".to_string(),
            ));
        }
        if self.window < 2 || self.window <= n_factors + 1 {
            return Err(RegressionError::InvalidConfig(format!(
                "window {} too short for {n_factors} factor(s)",
                self.window
            )));
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(RegressionError::InvalidConfig(format!(
                "significance {} must be between 0 and 1",
                self.significance
            )));
        }
        if self.workers == Some(0) {
            return Err(RegressionError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Worker threads to use for `jobs` jobs.
    pub fn resolved_workers(&self, jobs: usize) -> usize {
        let workers = self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        });
        workers.min(jobs).max(1)
    }
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self::new(252)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RollingConfig::new(252), 1, true)]
    #[case(RollingConfig::new(3), 1, true)]
    #[case(RollingConfig::new(2), 1, false)]
    #[case(RollingConfig::new(4), 3, false)]
    #[case(RollingConfig::new(126), 0, false)]
    #[case(RollingConfig::new(126).with_significance(0.0), 1, false)]
    #[case(RollingConfig::new(126).with_significance(1.0), 1, false)]
    #[case(RollingConfig::new(126).with_workers(Some(0)), 1, false)]
    fn test_validate(#[case] config: RollingConfig, #[case] n_factors: usize, #[case] ok: bool) {
        assert_eq!(config.validate(n_factors).is_ok(), ok);
    }

    #[test]
    fn test_resolved_workers() {
        let config = RollingConfig::new(10).with_workers(Some(8));
        assert_eq!(config.resolved_workers(3), 3);
        assert_eq!(config.resolved_workers(100), 8);
        assert_eq!(config.resolved_workers(0), 1);
        assert!(RollingConfig::new(10).resolved_workers(4) >= 1);
    }
}
