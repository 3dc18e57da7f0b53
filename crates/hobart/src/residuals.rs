//! Residual returns of every asset against the market or a set of external factors.
//!
//! Both computations regress each asset's daily returns over a rolling window and keep the
//! residual of the latest day in each window. Results are cached under a key per price
//! field and always cover the whole universe; callers receive a filtered view.

use crate::config::SignalConfig;
use crate::error::{Result, ServiceError};
use crate::history::{
    ProgressHook, benchmark_factor, computation_window, get_or_compute, progress_logger,
    restrict,
};
use crate::universe::Universe;
use chrono::NaiveDate;
use hobart_data::{Asset, FactorSeries, MarketDataProvider, Panel, PanelCache, PriceField};
use hobart_regression::RollingRegression;
use std::sync::Arc;
use tracing::info;

/// Source of external factor returns for multi-factor residuals.
pub trait FactorProvider: Send + Sync {
    /// Name of the factor model, for logging.
    fn name(&self) -> &str;

    /// Factor returns for dates in `[start, end]`.
    fn factor_returns(&self, start: NaiveDate, end: NaiveDate) -> hobart_data::Result<FactorSeries>;
}

/// Factor provider over a preloaded series.
#[derive(Debug, Clone)]
pub struct StaticFactors {
    name: String,
    series: FactorSeries,
}

impl StaticFactors {
    /// Create a provider named `name` serving `series`.
    pub fn new(name: impl Into<String>, series: FactorSeries) -> Self {
        Self {
            name: name.into(),
            series,
        }
    }
}

impl FactorProvider for StaticFactors {
    fn name(&self) -> &str {
        &self.name
    }

    fn factor_returns(&self, start: NaiveDate, end: NaiveDate) -> hobart_data::Result<FactorSeries> {
        Ok(self.series.between(Some(start), Some(end)))
    }
}

/// Cached market-neutral and multi-factor residual returns.
pub struct ResidualReturnsService {
    market: Arc<dyn MarketDataProvider>,
    cache: Arc<dyn PanelCache>,
    universe: Arc<dyn Universe>,
    factors: Option<Arc<dyn FactorProvider>>,
    config: SignalConfig,
    progress: Option<ProgressHook>,
}

impl std::fmt::Debug for ResidualReturnsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResidualReturnsService")
            .field("universe_size", &self.universe.size())
            .field("factors", &self.factors.as_ref().map(|p| p.name().to_string()))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ResidualReturnsService {
    /// Create a service from its collaborators.
    ///
    /// # Arguments
    /// * `market` - Returns, asset lookups and the trading calendar
    /// * `cache` - Panel cache for computed results
    /// * `universe` - Assets covered by a full computation
    /// * `factors` - External factor returns, required only for multi-factor residuals
    /// * `config` - History range, benchmark and regression settings
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        cache: Arc<dyn PanelCache>,
        universe: Arc<dyn Universe>,
        factors: Option<Arc<dyn FactorProvider>>,
        config: SignalConfig,
    ) -> Self {
        Self {
            market,
            cache,
            universe,
            factors,
            config,
            progress: None,
        }
    }

    /// Report regression progress to `hook`.
    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    /// The market data provider in use.
    pub fn market(&self) -> &Arc<dyn MarketDataProvider> {
        &self.market
    }

    /// The configuration in use.
    pub const fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Cache key of the market-neutral residuals on `field`.
    pub fn market_neutral_key(field: PriceField) -> String {
        format!("market_neutral_residual_returns_on_{field}")
    }

    /// Cache key of the multi-factor residuals on `field`.
    pub fn multi_factor_key(field: PriceField) -> String {
        format!("multi_factor_residual_returns_on_{field}")
    }

    /// Residual returns against the benchmark.
    ///
    /// Columns: `return`, `alpha`, `beta`, `residual_return`. Alpha and beta are zero for
    /// windows whose beta is not significant, in which case the residual is the raw
    /// return.
    ///
    /// # Arguments
    /// * `start` - First date returned (inclusive), `None` for no bound
    /// * `end` - Last date returned (inclusive), `None` for no bound
    /// * `assets` - Assets returned, `None` for all
    /// * `field` - Open-to-open or close-to-close returns
    pub fn get_market_neutral_residual_returns(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        assets: Option<&[Asset]>,
        field: PriceField,
    ) -> Result<Panel> {
        let key = Self::market_neutral_key(field);
        let panel = get_or_compute(&*self.cache, &key, || self.compute_market_neutral(field))?;
        restrict(&panel, start, end, assets)
    }

    /// Residual returns against the external factor model.
    ///
    /// Only close-to-close returns are supported. Columns: `return`, `alpha`, one
    /// `beta_{factor}` per factor, `residual_return`.
    pub fn get_multi_factor_residual_returns(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        assets: Option<&[Asset]>,
        field: PriceField,
    ) -> Result<Panel> {
        if field != PriceField::Close {
            return Err(ServiceError::InvalidArgument(format!(
                "multi-factor residual returns are only available on close, got {field}"
            )));
        }
        let provider = self.factors.as_ref().ok_or_else(|| {
            ServiceError::MissingCollaborator("factor provider for multi-factor residuals".into())
        })?;

        let key = Self::multi_factor_key(field);
        let panel = get_or_compute(&*self.cache, &key, || {
            self.compute_multi_factor(provider.as_ref(), field)
        })?;
        restrict(&panel, start, end, assets)
    }

    fn compute_market_neutral(&self, field: PriceField) -> Result<Panel> {
        let (start, end) = self.window()?;
        let benchmark = self.market.get_asset(&self.config.benchmark)?;
        let factor = benchmark_factor(&*self.market, &benchmark, start, end, field)?;
        info!(
            %start, %end, benchmark = %benchmark, %field,
            "computing market-neutral residual returns"
        );
        self.regress("market_neutral_residual_returns", start, end, field, &factor)
    }

    fn compute_multi_factor(&self, provider: &dyn FactorProvider, field: PriceField) -> Result<Panel> {
        let (start, end) = self.window()?;
        let factors = provider.factor_returns(start, end)?;
        info!(
            %start, %end, model = provider.name(), factors = ?factors.columns(),
            "computing multi-factor residual returns"
        );
        self.regress("multi_factor_residual_returns", start, end, field, &factors)
    }

    fn window(&self) -> Result<(NaiveDate, NaiveDate)> {
        computation_window(
            &*self.market,
            self.config.history_start,
            self.config.history_end,
            self.config.residual_window,
        )
    }

    fn regress(
        &self,
        label: &'static str,
        start: NaiveDate,
        end: NaiveDate,
        field: PriceField,
        factors: &FactorSeries,
    ) -> Result<Panel> {
        let universe = self.universe.assets();
        let returns = self.market.get_returns(start, end, Some(&universe))?;
        let engine = RollingRegression::new(self.config.residual_rolling());
        let progress = progress_logger(label, self.progress.as_ref());
        Ok(engine.run_with_progress(&returns, field.return_column(), factors, &progress)?)
    }
}
