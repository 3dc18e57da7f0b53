//! Rolling market betas.

use crate::config::SignalConfig;
use crate::error::Result;
use crate::history::{
    ProgressHook, benchmark_factor, computation_window, get_or_compute, progress_logger,
    restrict,
};
use crate::universe::Universe;
use chrono::NaiveDate;
use hobart_data::{Asset, MarketDataProvider, Panel, PanelCache, PriceField};
use hobart_regression::{ALPHA_COLUMN, BETA_COLUMN, RollingRegression};
use std::sync::Arc;
use tracing::info;

/// Cache key of the market factors.
pub const MARKET_FACTORS_KEY: &str = "market_factors";

/// Cached per-asset alpha and beta against the benchmark on close-to-close returns.
pub struct MarketFactorService {
    market: Arc<dyn MarketDataProvider>,
    cache: Arc<dyn PanelCache>,
    universe: Arc<dyn Universe>,
    config: SignalConfig,
    progress: Option<ProgressHook>,
}

impl std::fmt::Debug for MarketFactorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketFactorService")
            .field("universe_size", &self.universe.size())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MarketFactorService {
    /// Create a service from its collaborators.
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        cache: Arc<dyn PanelCache>,
        universe: Arc<dyn Universe>,
        config: SignalConfig,
    ) -> Self {
        Self {
            market,
            cache,
            universe,
            config,
            progress: None,
        }
    }

    /// Report regression progress to `hook`.
    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    /// Rolling `alpha` and `beta` of each asset against the benchmark.
    ///
    /// Both are zero for windows whose beta is not significant.
    ///
    /// # Arguments
    /// * `start` - First date returned (inclusive), `None` for no bound
    /// * `end` - Last date returned (inclusive), `None` for no bound
    /// * `assets` - Assets returned, `None` for all
    pub fn get_market_factors(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        assets: Option<&[Asset]>,
    ) -> Result<Panel> {
        let panel = get_or_compute(&*self.cache, MARKET_FACTORS_KEY, || self.compute())?;
        restrict(&panel, start, end, assets)
    }

    fn compute(&self) -> Result<Panel> {
        let field = PriceField::Close;
        let (start, end) = computation_window(
            &*self.market,
            self.config.history_start,
            self.config.history_end,
            self.config.market_factor_window,
        )?;
        let benchmark = self.market.get_asset(&self.config.benchmark)?;
        let factor = benchmark_factor(&*self.market, &benchmark, start, end, field)?;
        info!(%start, %end, benchmark = %benchmark, "computing market factors");

        let universe = self.universe.assets();
        let returns = self.market.get_returns(start, end, Some(&universe))?;
        let engine = RollingRegression::new(self.config.market_factor_rolling());
        let progress = progress_logger("market_factors", self.progress.as_ref());
        let regressed =
            engine.run_with_progress(&returns, field.return_column(), &factor, &progress)?;
        Ok(regressed.select(&[ALPHA_COLUMN, BETA_COLUMN])?)
    }
}
