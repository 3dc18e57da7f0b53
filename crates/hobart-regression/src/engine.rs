//! Parallel rolling regressions over a panel of assets.
//!
//! Each asset is an independent [`AssetRegression`] job. Jobs run on a rayon pool built
//! for the batch and report back over a channel; the calling thread collects results,
//! counts progress, and stops the batch on the first non-recoverable failure.

use crate::error::{RegressionError, Result};
use crate::window::{AssetRegression, RegressionRow, RollingConfig};
use hobart_data::{FactorSeries, Panel};
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Output column holding the asset's observed return.
pub const RETURN_COLUMN: &str = "return";
/// Output column holding the intercept.
pub const ALPHA_COLUMN: &str = "alpha";
/// Output column holding the slope of a single-factor model.
pub const BETA_COLUMN: &str = "beta";
/// Output column holding the residual return.
pub const RESIDUAL_COLUMN: &str = "residual_return";

/// Progress callback, invoked with `(completed, total)` jobs on the calling thread.
pub type ProgressFn<'a> = dyn Fn(usize, usize) + 'a;

/// Rolling-window factor regression engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RollingRegression {
    config: RollingConfig,
}

impl RollingRegression {
    /// Create an engine with the given configuration.
    pub const fn new(config: RollingConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration.
    pub const fn config(&self) -> &RollingConfig {
        &self.config
    }

    /// Beta column names for a factor series: `beta` for a single factor, otherwise
    /// `beta_{factor}` per factor.
    pub fn beta_columns(factors: &FactorSeries) -> Vec<String> {
        match factors.columns() {
            [_] => vec![BETA_COLUMN.to_string()],
            columns => columns.iter().map(|c| format!("{BETA_COLUMN}_{c}")).collect(),
        }
    }

    /// Output columns for a factor series.
    pub fn output_columns(factors: &FactorSeries) -> Vec<String> {
        let mut columns = vec![RETURN_COLUMN.to_string(), ALPHA_COLUMN.to_string()];
        columns.extend(Self::beta_columns(factors));
        columns.push(RESIDUAL_COLUMN.to_string());
        columns
    }

    /// Regress every asset's `return_column` on `factors`.
    ///
    /// # Arguments
    /// * `returns` - Asset return panel
    /// * `return_column` - Column of `returns` used as the response
    /// * `factors` - Explanatory factor returns
    pub fn run(&self, returns: &Panel, return_column: &str, factors: &FactorSeries) -> Result<Panel> {
        self.run_with_progress(returns, return_column, factors, &|_, _| {})
    }

    /// Like [`RollingRegression::run`], reporting progress as jobs complete.
    pub fn run_with_progress(
        &self,
        returns: &Panel,
        return_column: &str,
        factors: &FactorSeries,
        progress: &ProgressFn<'_>,
    ) -> Result<Panel> {
        self.config.validate(factors.columns().len())?;
        let return_idx = returns.require_column(return_column)?;

        let jobs: Vec<AssetRegression> = returns
            .partition_by_asset()
            .into_iter()
            .map(|(asset, rows)| AssetRegression::align(asset, &rows, return_idx, factors))
            .collect();
        let total = jobs.len();
        let mut panel = Panel::new(Self::output_columns(factors));
        if total == 0 {
            return Ok(panel);
        }

        let workers = self.config.resolved_workers(total);
        debug!(
            assets = total,
            window = self.config.window,
            workers,
            factors = ?factors.columns(),
            "starting rolling regression"
        );

        let results = self.fan_out(&jobs, workers, progress)?;

        let mut skipped = 0;
        for (job, rows) in jobs.iter().zip(results) {
            let Some(rows) = rows else {
                skipped += 1;
                continue;
            };
            for row in rows {
                let RegressionRow {
                    date,
                    asset_return,
                    alpha,
                    betas,
                    residual,
                } = row;
                let mut values = Vec::with_capacity(betas.len() + 3);
                values.push(asset_return);
                values.push(alpha);
                values.extend(betas);
                values.push(residual);
                panel.insert(date, job.asset().clone(), values)?;
            }
        }

        info!(
            assets = total,
            skipped,
            rows = panel.len(),
            "rolling regression complete"
        );
        Ok(panel)
    }

    /// Run all jobs on a dedicated pool. `None` marks an asset skipped for lack of data.
    fn fan_out(
        &self,
        jobs: &[AssetRegression],
        workers: usize,
        progress: &ProgressFn<'_>,
    ) -> Result<Vec<Option<Vec<RegressionRow>>>> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("hobart-regression-{i}"))
            .build()
            .map_err(|e| RegressionError::Pool(e.to_string()))?;

        let total = jobs.len();
        let config = &self.config;
        let abort = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<(usize, Result<Vec<RegressionRow>>)>();

        let mut results: Vec<Option<Vec<RegressionRow>>> = vec![None; total];
        let mut fatal: Option<RegressionError> = None;

        pool.in_place_scope(|scope| {
            for (index, job) in jobs.iter().enumerate() {
                let tx = tx.clone();
                let abort = &abort;
                scope.spawn(move |_| {
                    if abort.load(Ordering::Relaxed) {
                        return;
                    }
                    let _ = tx.send((index, job.run(config)));
                });
            }
            drop(tx);

            let mut completed = 0;
            for (index, outcome) in rx.iter() {
                completed += 1;
                progress(completed, total);

                match outcome {
                    Ok(rows) => results[index] = Some(rows),
                    Err(e) if e.is_recoverable() => {
                        warn!(asset = %jobs[index].asset(), error = %e, "skipping asset");
                    }
                    Err(e) => {
                        error!(
                            asset = %jobs[index].asset(),
                            observations = jobs[index].observations(),
                            error = %e,
                            "regression failed, aborting batch"
                        );
                        abort.store(true, Ordering::Relaxed);
                        if fatal.is_none() {
                            fatal = Some(e);
                        }
                    }
                }
            }
        });

        match fatal {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Days, NaiveDate};
    use hobart_data::Asset;
    use std::cell::RefCell;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        (0..n).map(|i| start + Days::new(i as u64)).collect()
    }

    fn market(n: usize) -> FactorSeries {
        let mut factors = FactorSeries::new(["benchmark_return"]);
        for (i, date) in dates(n).into_iter().enumerate() {
            factors
                .insert(date, vec![((i * 37) % 11) as f64 / 100.0 - 0.05])
                .unwrap();
        }
        factors
    }

    /// Asset `sid` with `n` observations following `0.002 + beta * market`.
    fn add_asset(panel: &mut Panel, factors: &FactorSeries, sid: u64, n: usize, beta: f64) {
        for (i, (date, f)) in factors.iter().take(n).enumerate() {
            let noise = if i % 2 == 0 { 0.001 } else { -0.001 };
            panel
                .insert(date, Asset::new(sid, format!("A{sid}")), vec![0.002 + beta * f[0] + noise])
                .unwrap();
        }
    }

    #[test]
    fn test_output_columns() {
        assert_eq!(
            RollingRegression::output_columns(&market(1)),
            vec!["return", "alpha", "beta", "residual_return"]
        );
        let multi = FactorSeries::new(["mkt", "smb"]);
        assert_eq!(
            RollingRegression::beta_columns(&multi),
            vec!["beta_mkt", "beta_smb"]
        );
    }

    #[test]
    fn test_short_assets_are_skipped() {
        let factors = market(40);
        let mut panel = Panel::new(["close_return"]);
        add_asset(&mut panel, &factors, 1, 40, 1.0);
        add_asset(&mut panel, &factors, 2, 19, 1.0);
        add_asset(&mut panel, &factors, 3, 20, 1.0);

        let engine = RollingRegression::new(RollingConfig::new(20).with_workers(Some(2)));
        let out = engine.run(&panel, "close_return", &factors).unwrap();

        let assets: Vec<u64> = out.assets().iter().map(|a| a.sid.0).collect();
        assert_eq!(assets, vec![1, 3]);
        assert_eq!(out.asset_rows(&Asset::new(1, "A1")).len(), 21);
        assert_eq!(out.asset_rows(&Asset::new(3, "A3")).len(), 1);
    }

    #[test]
    fn test_residual_identity() {
        let factors = market(60);
        let mut panel = Panel::new(["close_return"]);
        add_asset(&mut panel, &factors, 1, 60, 1.3);
        add_asset(&mut panel, &factors, 2, 60, -0.4);

        let out = RollingRegression::new(RollingConfig::new(30))
            .run(&panel, "close_return", &factors)
            .unwrap();
        for (key, row) in out.iter() {
            let f = factors.get(key.date).unwrap()[0];
            assert_relative_eq!(row[3], row[0] - (row[1] + row[2] * f), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_progress_reports_every_job() {
        let factors = market(30);
        let mut panel = Panel::new(["close_return"]);
        for sid in 1..=5 {
            add_asset(&mut panel, &factors, sid, 30, 1.0);
        }

        let seen = RefCell::new(Vec::new());
        RollingRegression::new(RollingConfig::new(25))
            .run_with_progress(&panel, "close_return", &factors, &|done, total| {
                seen.borrow_mut().push((done, total));
            })
            .unwrap();
        assert_eq!(*seen.borrow(), (1..=5).map(|i| (i, 5)).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_panel() {
        let out = RollingRegression::new(RollingConfig::new(5))
            .run(&Panel::new(["close_return"]), "close_return", &market(5))
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.columns().len(), 4);
    }

    #[test]
    fn test_missing_return_column() {
        let result = RollingRegression::new(RollingConfig::new(5)).run(
            &Panel::new(["open_return"]),
            "close_return",
            &market(5),
        );
        assert!(matches!(result, Err(RegressionError::Data(_))));
    }
}
