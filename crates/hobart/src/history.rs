//! Shared plumbing for the cached signal computations.

use crate::error::{Result, ServiceError};
use chrono::NaiveDate;
use hobart_data::{
    Asset, FactorSeries, MarketDataProvider, Panel, PanelCache, PanelFilter, PriceField,
    TradingCalendar,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Factor column holding the benchmark's returns.
pub const BENCHMARK_FACTOR: &str = "benchmark_return";

/// Callback receiving `(completed, total)` as regression jobs finish.
pub type ProgressHook = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Return the cached panel under `key`, computing and storing it on a miss.
pub(crate) fn get_or_compute(
    cache: &dyn PanelCache,
    key: &str,
    compute: impl FnOnce() -> Result<Panel>,
) -> Result<Panel> {
    if let Some(panel) = cache.get(key)? {
        debug!(key, rows = panel.len(), "cache hit");
        return Ok(panel);
    }

    debug!(key, "cache miss, computing");
    let panel = compute()?;
    cache.put(key, &panel)?;
    info!(key, rows = panel.len(), "stored computed panel");
    Ok(panel)
}

/// Session range of a full computation: `window + 1` sessions of lead-in before the first
/// valid session of the history, through its last valid session.
pub(crate) fn computation_window(
    calendar: &dyn TradingCalendar,
    history_start: NaiveDate,
    history_end: NaiveDate,
    window: usize,
) -> Result<(NaiveDate, NaiveDate)> {
    let start = calendar.valid_trading_start(history_start)?;
    let end = calendar.valid_trading_end(history_end)?;
    let lead_in = i32::try_from(window + 1)
        .map_err(|_| ServiceError::Config(format!("window {window} is too large")))?;
    let windowed_start = calendar
        .n_trading_days_from(-lead_in, start)?
        .first()
        .copied()
        .unwrap_or(start);
    Ok((windowed_start, end))
}

/// The benchmark's returns on `field` as a single-factor series.
pub(crate) fn benchmark_factor(
    market: &dyn MarketDataProvider,
    benchmark: &Asset,
    start: NaiveDate,
    end: NaiveDate,
    field: PriceField,
) -> Result<FactorSeries> {
    let panel = market.get_returns(start, end, Some(std::slice::from_ref(benchmark)))?;
    Ok(FactorSeries::from_panel_column(
        &panel,
        benchmark,
        field.return_column(),
        BENCHMARK_FACTOR,
    )?)
}

/// Restrict a computed panel to the caller's inclusive range and asset set.
pub(crate) fn restrict(
    panel: &Panel,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    assets: Option<&[Asset]>,
) -> Result<Panel> {
    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        return Err(ServiceError::InvalidArgument(format!(
            "start {start} is after end {end}"
        )));
    }
    Ok(panel.filter(&PanelFilter::between(start, end).with_assets(assets)))
}

/// Wrap an optional hook so that progress is also logged at every tenth of the batch.
pub(crate) fn progress_logger<'a>(
    label: &'static str,
    hook: Option<&'a ProgressHook>,
) -> impl Fn(usize, usize) + 'a {
    move |completed, total| {
        if let Some(hook) = hook {
            hook(completed, total);
        }
        let percent = completed * 100 / total.max(1);
        let previous = completed.saturating_sub(1) * 100 / total.max(1);
        if percent / 10 != previous / 10 || completed == total {
            info!(computation = label, "progress: {percent}%");
        }
    }
}
