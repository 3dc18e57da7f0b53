//! One asset's rolling regression.

use super::RollingConfig;
use crate::error::{RegressionError, Result};
use crate::ols::fit_ols;
use chrono::NaiveDate;
use hobart_data::{Asset, FactorSeries};
use ndarray::{Array1, Array2, s};

/// Result of one window fit, keyed by the window's last date.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionRow {
    /// Last date of the window
    pub date: NaiveDate,
    /// Observed asset return on `date`
    pub asset_return: f64,
    /// Intercept, zero when the fit failed the significance gate
    pub alpha: f64,
    /// Slopes, zero when the fit failed the significance gate
    pub betas: Vec<f64>,
    /// `asset_return - (alpha + Σ beta · factor)` on `date`
    pub residual: f64,
}

/// Aligned observations of one asset against the factor series.
///
/// Built once on the coordinating thread and handed to a worker by reference; it holds
/// everything a fit needs.
#[derive(Debug, Clone)]
pub struct AssetRegression {
    asset: Asset,
    dates: Vec<NaiveDate>,
    returns: Array1<f64>,
    factors: Array2<f64>,
}

impl AssetRegression {
    /// Inner-join an asset's returns with the factor series on date.
    ///
    /// Dates missing from either side, and rows with a non-finite value, are dropped.
    ///
    /// # Arguments
    /// * `asset` - The asset being regressed
    /// * `rows` - The asset's panel rows in date order
    /// * `return_idx` - Position of the return column within each row
    /// * `factors` - Explanatory factor returns
    pub fn align(
        asset: Asset,
        rows: &[(NaiveDate, &[f64])],
        return_idx: usize,
        factors: &FactorSeries,
    ) -> Self {
        let n_factors = factors.columns().len();
        let mut dates = Vec::with_capacity(rows.len());
        let mut returns = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * n_factors);

        for (date, row) in rows {
            let Some(factor_row) = factors.get(*date) else {
                continue;
            };
            let value = row[return_idx];
            if !value.is_finite() || !factor_row.iter().all(|f| f.is_finite()) {
                continue;
            }
            dates.push(*date);
            returns.push(value);
            flat.extend_from_slice(factor_row);
        }

        let n = dates.len();
        let factors = Array2::from_shape_vec((n, n_factors), flat)
            .unwrap_or_else(|_| Array2::zeros((0, n_factors)));

        Self {
            asset,
            dates,
            returns: Array1::from(returns),
            factors,
        }
    }

    /// The asset.
    pub const fn asset(&self) -> &Asset {
        &self.asset
    }

    /// Number of aligned observations.
    pub fn observations(&self) -> usize {
        self.dates.len()
    }

    /// First and last aligned date.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }

    /// Fit every full window, oldest first.
    ///
    /// Returns [`RegressionError::InsufficientData`] when fewer than `config.window`
    /// observations are available, and [`RegressionError::Computation`] with the asset's
    /// context when any fit fails.
    pub fn run(&self, config: &RollingConfig) -> Result<Vec<RegressionRow>> {
        let window = config.window;
        let n = self.observations();
        if n < window {
            return Err(RegressionError::InsufficientData {
                required: window,
                actual: n,
            });
        }

        let mut out = Vec::with_capacity(n + 1 - window);
        for end in window..=n {
            let range = end - window..end;
            let fit = fit_ols(
                self.returns.slice(s![range.clone()]),
                self.factors.slice(s![range, ..]),
            )
            .map_err(|e| self.context(e))?;

            let (alpha, betas) = if fit.slope_p_value(0) <= config.significance {
                (fit.intercept(), fit.slopes().to_vec())
            } else {
                (0.0, vec![0.0; self.factors.ncols()])
            };

            let last = end - 1;
            let predicted = alpha
                + betas
                    .iter()
                    .zip(self.factors.row(last))
                    .map(|(b, f)| b * f)
                    .sum::<f64>();
            let asset_return = self.returns[last];

            out.push(RegressionRow {
                date: self.dates[last],
                asset_return,
                alpha,
                betas,
                residual: asset_return - predicted,
            });
        }

        Ok(out)
    }

    /// Wrap a fit failure with the asset's diagnostic context.
    fn context(&self, source: RegressionError) -> RegressionError {
        let (first, last) = self
            .date_range()
            .map(|(f, l)| (f.to_string(), l.to_string()))
            .unwrap_or_default();
        RegressionError::Computation {
            asset: self.asset.clone(),
            observations: self.observations(),
            first_date: first,
            last_date: last,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Days;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        (0..n)
            .map(|i| start + Days::new(i as u64))
            .collect()
    }

    /// Factor with some spread, asset = 0.001 + 1.5 * factor + small noise.
    fn job(n: usize) -> AssetRegression {
        let mut factors = FactorSeries::new(["benchmark_return"]);
        let mut rows = Vec::new();
        for (i, date) in dates(n).into_iter().enumerate() {
            let f = ((i * 37) % 11) as f64 / 100.0 - 0.05;
            let noise = if i % 2 == 0 { 0.0005 } else { -0.0005 };
            factors.insert(date, vec![f]).unwrap();
            rows.push((date, vec![0.001 + 1.5 * f + noise]));
        }
        let rows: Vec<(NaiveDate, &[f64])> =
            rows.iter().map(|(d, v)| (*d, v.as_slice())).collect();
        AssetRegression::align(Asset::new(1, "A"), &rows, 0, &factors)
    }

    #[test]
    fn test_window_sufficiency() {
        let config = RollingConfig::new(10);
        assert_eq!(job(10).run(&config).unwrap().len(), 1);
        assert!(matches!(
            job(9).run(&config),
            Err(RegressionError::InsufficientData {
                required: 10,
                actual: 9
            })
        ));
        assert_eq!(job(15).run(&config).unwrap().len(), 6);
    }

    #[test]
    fn test_rows_are_date_ordered_and_consistent() {
        let rows = job(30).run(&RollingConfig::new(10)).unwrap();
        let all_dates = dates(30);
        for (row, expected) in rows.iter().zip(&all_dates[9..]) {
            assert_eq!(row.date, *expected);
            assert_relative_eq!(row.betas[0], 1.5, epsilon = 0.05);
        }
    }

    #[test]
    fn test_alignment_drops_unmatched_and_non_finite() {
        let all = dates(5);
        let mut factors = FactorSeries::new(["mkt"]);
        factors.insert(all[0], vec![0.1]).unwrap();
        factors.insert(all[1], vec![f64::NAN]).unwrap();
        factors.insert(all[2], vec![0.3]).unwrap();
        factors.insert(all[4], vec![0.5]).unwrap();

        let values = [[1.0], [2.0], [f64::INFINITY], [4.0], [5.0]];
        let rows: Vec<(NaiveDate, &[f64])> = all
            .iter()
            .zip(&values)
            .map(|(d, v)| (*d, v.as_slice()))
            .collect();
        let aligned = AssetRegression::align(Asset::new(1, "A"), &rows, 0, &factors);

        assert_eq!(aligned.observations(), 2);
        assert_eq!(aligned.date_range(), Some((all[0], all[4])));
    }

    #[test]
    fn test_fit_failure_carries_context() {
        let all = dates(6);
        let mut factors = FactorSeries::new(["mkt"]);
        let values: Vec<[f64; 1]> = (0..6).map(|i| [f64::from(i)]).collect();
        for date in &all {
            factors.insert(*date, vec![0.01]).unwrap();
        }
        let rows: Vec<(NaiveDate, &[f64])> = all
            .iter()
            .zip(&values)
            .map(|(d, v)| (*d, v.as_slice()))
            .collect();
        let aligned = AssetRegression::align(Asset::new(7, "FLAT"), &rows, 0, &factors);

        match aligned.run(&RollingConfig::new(4)) {
            Err(RegressionError::Computation {
                asset,
                observations,
                first_date,
                last_date,
                source,
            }) => {
                assert_eq!(asset.sid.0, 7);
                assert_eq!(observations, 6);
                assert_eq!(first_date, "2016-01-01");
                assert_eq!(last_date, "2016-01-06");
                assert!(matches!(*source, RegressionError::SingularMatrix));
            }
            other => panic!("expected computation failure, got {other:?}"),
        }
    }
}
