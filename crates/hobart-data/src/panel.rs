//! Time-indexed panels keyed by (trading date, asset).
//!
//! A [`Panel`] is the unit of exchange between every component: the market data
//! provider returns one, the regression engine produces one, and the cache stores one.
//! Rows are kept in `(date, asset id)` order and keys are unique.

use crate::error::{DataError, Result};
use crate::filter::PanelFilter;
use chrono::NaiveDate;
use derive_more::{Display, From, Into};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

/// Reserved column holding the trading date in DataFrame form.
pub const DATE_COLUMN: &str = "date";
/// Reserved column holding the asset id in DataFrame form.
pub const ASSET_COLUMN: &str = "asset";
/// Reserved column holding the ticker symbol in DataFrame form.
pub const SYMBOL_COLUMN: &str = "symbol";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Opaque, stable asset identifier.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Serialize, Deserialize,
)]
pub struct AssetId(pub u64);

/// A tradable asset.
///
/// Symbols are reused over time, so identity is the [`AssetId`] alone: two assets with
/// the same id compare equal even if their symbols differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Stable identifier
    pub sid: AssetId,
    /// Ticker symbol at the time of lookup
    pub symbol: String,
}

impl Asset {
    /// Create a new asset.
    pub fn new(sid: impl Into<AssetId>, symbol: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            symbol: symbol.into(),
        }
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.sid == other.sid
    }
}

impl Eq for Asset {}

impl Hash for Asset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sid.hash(state);
    }
}

impl PartialOrd for Asset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Asset {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sid.cmp(&other.sid)
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.symbol, self.sid)
    }
}

/// Composite panel key, ordered by date then asset id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelKey {
    /// Trading date
    pub date: NaiveDate,
    /// Asset
    pub asset: Asset,
}

impl PanelKey {
    /// Create a new key.
    pub const fn new(date: NaiveDate, asset: Asset) -> Self {
        Self { date, asset }
    }
}

/// Ordered table keyed by (date, asset) with a fixed set of named `f64` columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Panel {
    columns: Vec<String>,
    rows: BTreeMap<PanelKey, Vec<f64>>,
}

impl Panel {
    /// Create an empty panel with the given value columns.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: BTreeMap::new(),
        }
    }

    /// Insert a row. Fails on wrong arity or an already present key.
    pub fn insert(&mut self, date: NaiveDate, asset: Asset, values: Vec<f64>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(DataError::ArityMismatch {
                expected: self.columns.len(),
                actual: values.len(),
            });
        }

        let key = PanelKey::new(date, asset);
        if self.rows.contains_key(&key) {
            return Err(DataError::DuplicateKey {
                date: key.date.to_string(),
                asset: key.asset.to_string(),
            });
        }

        self.rows.insert(key, values);
        Ok(())
    }

    /// Value columns, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column, as an error if absent.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row values for a key.
    pub fn get(&self, date: NaiveDate, asset: &Asset) -> Option<&[f64]> {
        self.rows
            .get(&PanelKey::new(date, asset.clone()))
            .map(Vec::as_slice)
    }

    /// Single cell lookup.
    pub fn value(&self, date: NaiveDate, asset: &Asset, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.get(date, asset).map(|row| row[idx])
    }

    /// Iterate rows in (date, asset) order.
    pub fn iter(&self) -> impl Iterator<Item = (&PanelKey, &[f64])> {
        self.rows.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Distinct dates, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows
            .keys()
            .map(|k| k.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct assets, ordered by id.
    pub fn assets(&self) -> Vec<Asset> {
        self.rows
            .keys()
            .map(|k| k.asset.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Date-ordered rows of a single asset.
    pub fn asset_rows(&self, asset: &Asset) -> Vec<(NaiveDate, &[f64])> {
        self.rows
            .iter()
            .filter(|(k, _)| k.asset == *asset)
            .map(|(k, v)| (k.date, v.as_slice()))
            .collect()
    }

    /// Split rows by asset in a single pass, each asset's rows in date order.
    pub fn partition_by_asset(&self) -> BTreeMap<Asset, Vec<(NaiveDate, &[f64])>> {
        let mut out: BTreeMap<Asset, Vec<(NaiveDate, &[f64])>> = BTreeMap::new();
        for (key, row) in &self.rows {
            out.entry(key.asset.clone())
                .or_default()
                .push((key.date, row.as_slice()));
        }
        out
    }

    /// Copy of the panel restricted to the given columns, in the given order.
    pub fn select(&self, columns: &[&str]) -> Result<Self> {
        let indices = columns
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|(k, v)| (k.clone(), indices.iter().map(|&i| v[i]).collect()))
            .collect();

        Ok(Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        })
    }

    /// Rename a column in place.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        let idx = self.require_column(from)?;
        self.columns[idx] = to.to_string();
        Ok(())
    }

    /// Copy of the panel restricted by a date range and/or asset set.
    pub fn filter(&self, filter: &PanelFilter) -> Self {
        let rows = self
            .rows
            .iter()
            .filter(|(k, _)| filter.matches(k.date, &k.asset))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Concatenate panels sharing the same columns. Keys must remain unique.
    pub fn concat(panels: impl IntoIterator<Item = Self>) -> Result<Self> {
        let mut iter = panels.into_iter();
        let Some(mut out) = iter.next() else {
            return Ok(Self::default());
        };

        for panel in iter {
            if panel.columns != out.columns {
                return Err(DataError::ColumnMismatch {
                    expected: out.columns.clone(),
                    actual: panel.columns,
                });
            }
            for (key, values) in panel.rows {
                out.insert(key.date, key.asset, values)?;
            }
        }

        Ok(out)
    }

    /// Convert to a polars DataFrame with `date`, `asset`, `symbol` and one column per value.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let n = self.rows.len();
        let mut dates = Vec::with_capacity(n);
        let mut sids = Vec::with_capacity(n);
        let mut symbols = Vec::with_capacity(n);
        let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(n); self.columns.len()];

        for (key, row) in &self.rows {
            dates.push(key.date.format(DATE_FORMAT).to_string());
            sids.push(key.asset.sid.0);
            symbols.push(key.asset.symbol.clone());
            for (column, value) in values.iter_mut().zip(row) {
                column.push(*value);
            }
        }

        let mut columns: Vec<Column> = vec![
            Series::new(DATE_COLUMN.into(), dates).into(),
            Series::new(ASSET_COLUMN.into(), sids).into(),
            Series::new(SYMBOL_COLUMN.into(), symbols).into(),
        ];
        for (name, column) in self.columns.iter().zip(values) {
            columns.push(Series::new(name.as_str().into(), column).into());
        }

        let df = DataFrame::new(columns)?
            .lazy()
            .with_column(col(DATE_COLUMN).cast(DataType::Date))
            .collect()?;

        Ok(df)
    }

    /// Build a panel from a DataFrame produced by [`Panel::to_dataframe`].
    ///
    /// Every column other than `date`, `asset` and `symbol` becomes a value column.
    /// Null values are read back as `NaN`.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let dates = df.column(DATE_COLUMN)?.cast(&DataType::String)?;
        let dates = dates.str()?;
        let sids = df.column(ASSET_COLUMN)?.cast(&DataType::UInt64)?;
        let sids = sids.u64()?;
        let symbols = df.column(SYMBOL_COLUMN)?.cast(&DataType::String)?;
        let symbols = symbols.str()?;

        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| {
                name != DATE_COLUMN && name != ASSET_COLUMN && name != SYMBOL_COLUMN
            })
            .collect();

        let casted = names
            .iter()
            .map(|name| df.column(name)?.cast(&DataType::Float64))
            .collect::<PolarsResult<Vec<_>>>()?;
        let chunks = casted
            .iter()
            .map(|c| c.f64())
            .collect::<PolarsResult<Vec<_>>>()?;

        let mut panel = Self::new(names);
        for i in 0..df.height() {
            let date = dates
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;
            let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
                .map_err(|e| DataError::Parse(format!("Invalid date {date}: {e}")))?;
            let sid = sids
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing asset".to_string()))?;
            let symbol = symbols.get(i).unwrap_or_default();
            let values = chunks
                .iter()
                .map(|c| c.get(i).unwrap_or(f64::NAN))
                .collect();

            panel.insert(date, Asset::new(sid, symbol), values)?;
        }

        Ok(panel)
    }
}
