//! Events and their grouping labels.

use crate::error::{EventError, Result};
use chrono::NaiveDate;
use hobart_data::Asset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Column names that grouping columns may not use.
pub const RESERVED_COLUMNS: [&str; 6] = [
    "date",
    "asset",
    "event_time",
    "residual_return",
    "count",
    "cumulative_residual_return",
];

/// A cohort label attached to an event, e.g. a decile or a year.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupLabel {
    /// Integer label
    Int(i64),
    /// Free-form label
    Text(String),
}

impl GroupLabel {
    /// Parse a raw field: integers become [`GroupLabel::Int`], anything else text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse::<i64>()
            .map_or_else(|_| Self::Text(raw.to_string()), Self::Int)
    }
}

impl std::fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for GroupLabel {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for GroupLabel {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for GroupLabel {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A point event: an as-of date, an asset and one label per grouping column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// As-of date
    pub date: NaiveDate,
    /// Asset
    pub asset: Asset,
    /// Labels, aligned with [`EventSet::group_columns`]
    pub groups: Vec<GroupLabel>,
}

/// Events sharing a set of grouping columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventSet {
    group_columns: Vec<String>,
    events: Vec<Event>,
}

impl EventSet {
    /// Create an empty set with the given grouping columns.
    pub fn new<S: Into<String>>(group_columns: impl IntoIterator<Item = S>) -> Result<Self> {
        let group_columns: Vec<String> = group_columns.into_iter().map(Into::into).collect();

        let mut seen = BTreeSet::new();
        for column in &group_columns {
            if RESERVED_COLUMNS.contains(&column.as_str()) {
                return Err(EventError::InvalidGroupColumn(format!(
                    "{column} is a reserved column name"
                )));
            }
            if !seen.insert(column.as_str()) {
                return Err(EventError::InvalidGroupColumn(format!(
                    "{column} appears more than once"
                )));
            }
        }

        Ok(Self {
            group_columns,
            events: Vec::new(),
        })
    }

    /// Append an event.
    pub fn push(&mut self, date: NaiveDate, asset: Asset, groups: Vec<GroupLabel>) -> Result<()> {
        if groups.len() != self.group_columns.len() {
            return Err(EventError::ArityMismatch {
                expected: self.group_columns.len(),
                actual: groups.len(),
            });
        }
        self.events.push(Event {
            date,
            asset,
            groups,
        });
        Ok(())
    }

    /// Grouping column names.
    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    /// Events in insertion order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether there are no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Distinct assets, ordered by id.
    pub fn assets(&self) -> Vec<Asset> {
        self.events
            .iter()
            .map(|e| e.asset.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Earliest and latest as-of date.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.events.iter().map(|e| e.date).min()?;
        let last = self.events.iter().map(|e| e.date).max()?;
        Some((first, last))
    }
}
