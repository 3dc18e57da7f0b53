//! Date-keyed factor return series.

use crate::error::{DataError, Result};
use crate::panel::{Asset, Panel};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Date-indexed table of one or more factor return columns.
///
/// Used as the explanatory side of the rolling regressions: a single benchmark return
/// column for market-neutral residuals, several columns for multi-factor models.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FactorSeries {
    columns: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<f64>>,
}

impl FactorSeries {
    /// Create an empty series with the given factor columns.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: BTreeMap::new(),
        }
    }

    /// Take one asset's column from a panel as a single-factor series named `name`.
    ///
    /// Typically used to turn the benchmark's returns into the market factor.
    pub fn from_panel_column(panel: &Panel, asset: &Asset, column: &str, name: &str) -> Result<Self> {
        let idx = panel.require_column(column)?;
        let mut series = Self::new([name]);
        for (date, row) in panel.asset_rows(asset) {
            series.insert(date, vec![row[idx]])?;
        }
        Ok(series)
    }

    /// Insert a row. Fails on wrong arity or an already present date.
    pub fn insert(&mut self, date: NaiveDate, values: Vec<f64>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(DataError::ArityMismatch {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        if self.rows.contains_key(&date) {
            return Err(DataError::DuplicateKey {
                date: date.to_string(),
                asset: "<factor>".to_string(),
            });
        }
        self.rows.insert(date, values);
        Ok(())
    }

    /// Factor column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Factor values on a date.
    pub fn get(&self, date: NaiveDate) -> Option<&[f64]> {
        self.rows.get(&date).map(Vec::as_slice)
    }

    /// Iterate rows in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[f64])> {
        self.rows.iter().map(|(d, v)| (*d, v.as_slice()))
    }

    /// Copy restricted to an inclusive date range.
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let rows = self
            .rows
            .iter()
            .filter(|(d, _)| start.is_none_or(|s| **d >= s) && end.is_none_or(|e| **d <= e))
            .map(|(d, v)| (*d, v.clone()))
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Combine the columns of two series on the dates they share.
    pub fn inner_join(&self, other: &Self) -> Self {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());

        let rows = self
            .rows
            .iter()
            .filter_map(|(date, left)| {
                other.rows.get(date).map(|right| {
                    let mut row = left.clone();
                    row.extend_from_slice(right);
                    (*date, row)
                })
            })
            .collect();

        Self { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 6, day).unwrap()
    }

    #[test]
    fn test_from_panel_column() {
        let spy = Asset::new(8554, "SPY");
        let other = Asset::new(1, "X");
        let mut panel = Panel::new(["open_return", "close_return"]);
        panel.insert(d(1), spy.clone(), vec![0.1, 0.2]).unwrap();
        panel.insert(d(2), spy.clone(), vec![0.3, 0.4]).unwrap();
        panel.insert(d(2), other, vec![9.0, 9.0]).unwrap();

        let series =
            FactorSeries::from_panel_column(&panel, &spy, "close_return", "benchmark_return")
                .unwrap();
        assert_eq!(series.columns(), &["benchmark_return".to_string()]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(d(2)), Some(&[0.4][..]));
    }

    #[test]
    fn test_inner_join_drops_unshared_dates() {
        let mut left = FactorSeries::new(["mkt"]);
        left.insert(d(1), vec![1.0]).unwrap();
        left.insert(d(2), vec![2.0]).unwrap();
        let mut right = FactorSeries::new(["smb", "hml"]);
        right.insert(d(2), vec![3.0, 4.0]).unwrap();
        right.insert(d(3), vec![5.0, 6.0]).unwrap();

        let joined = left.inner_join(&right);
        assert_eq!(joined.columns().len(), 3);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.get(d(2)), Some(&[2.0, 3.0, 4.0][..]));
    }

    #[test]
    fn test_between() {
        let mut series = FactorSeries::new(["mkt"]);
        for day in 1..=5 {
            series.insert(d(day), vec![f64::from(day)]).unwrap();
        }
        assert_eq!(series.between(Some(d(2)), Some(d(4))).len(), 3);
        assert_eq!(series.between(None, Some(d(1))).len(), 1);
        assert!(series.insert(d(1), vec![0.0]).is_err());
    }
}
