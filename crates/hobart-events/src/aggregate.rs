//! Joining windows with residual returns and aggregating by group and event time.

use crate::error::{EventError, Result};
use crate::event::GroupLabel;
use crate::window::EventWindows;
use hobart_data::Panel;
use hobart_data::panel::{ASSET_COLUMN, DATE_COLUMN};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Column of the residual panel joined onto event windows.
pub const RESIDUAL_RETURN: &str = "residual_return";

const ROW_COLUMN: &str = "row";
const FILLED_COLUMN: &str = "filled";
const EVENT_TIME_COLUMN: &str = "event_time";
const COUNT_COLUMN: &str = "count";
const CUMULATIVE_COLUMN: &str = "cumulative_residual_return";

/// A window row with its residual return attached.
#[derive(Debug, Clone, PartialEq)]
pub struct EventObservation {
    /// Labels of the source event
    pub groups: Vec<GroupLabel>,
    /// Session offset from the event date
    pub event_time: i32,
    /// Residual return, 0.0 where the panel had none
    pub residual_return: f64,
}

/// Joined observations, with the grouping columns they carry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventData {
    group_columns: Vec<String>,
    observations: Vec<EventObservation>,
}

impl EventData {
    /// Grouping column names.
    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    /// Observations, one per window row.
    pub fn observations(&self) -> &[EventObservation] {
        &self.observations
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether there are no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Left-join window rows with `residual_return` on (date, asset).
///
/// Rows without a residual, or with a NaN one, keep their place with a value of 0.0, so
/// every event keeps its full window width.
pub fn join_and_fill(windows: &EventWindows, residuals: &Panel) -> Result<EventData> {
    residuals.require_column(RESIDUAL_RETURN)?;

    let rows = windows.rows();
    let left = DataFrame::new(vec![
        Series::new(ROW_COLUMN.into(), (0..rows.len() as u64).collect::<Vec<_>>()).into(),
        Series::new(
            DATE_COLUMN.into(),
            rows.iter()
                .map(|r| r.date.format("%Y-%m-%d").to_string())
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            ASSET_COLUMN.into(),
            rows.iter().map(|r| r.asset.sid.0).collect::<Vec<_>>(),
        )
        .into(),
    ])?
    .lazy()
    .with_column(col(DATE_COLUMN).cast(DataType::Date));

    let right = residuals
        .to_dataframe()?
        .lazy()
        .select([col(DATE_COLUMN), col(ASSET_COLUMN), col(RESIDUAL_RETURN)]);

    let joined = left
        .join(
            right,
            [col(DATE_COLUMN), col(ASSET_COLUMN)],
            [col(DATE_COLUMN), col(ASSET_COLUMN)],
            JoinArgs::new(JoinType::Left),
        )
        .with_column(
            col(RESIDUAL_RETURN)
                .is_null()
                .or(col(RESIDUAL_RETURN).is_nan())
                .alias(FILLED_COLUMN),
        )
        .with_column(
            col(RESIDUAL_RETURN)
                .fill_nan(lit(0.0))
                .fill_null(lit(0.0)),
        )
        .sort([ROW_COLUMN], SortMultipleOptions::default())
        .collect()?;

    let filled = joined.column(FILLED_COLUMN)?.bool()?.num_trues();
    let values = joined.column(RESIDUAL_RETURN)?.f64()?;
    let observations = rows
        .iter()
        .zip(values.into_no_null_iter())
        .map(|(row, residual_return)| EventObservation {
            groups: row.groups.clone(),
            event_time: row.event_time,
            residual_return,
        })
        .collect();

    debug!(rows = windows.len(), filled, "joined event windows with residual returns");

    Ok(EventData {
        group_columns: windows.group_columns().to_vec(),
        observations,
    })
}

/// One (group, event time) cell of an event study.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStudyRow {
    /// Group labels, aligned with [`EventStudyResult::group_columns`]
    pub groups: Vec<GroupLabel>,
    /// Session offset from the event date
    pub event_time: i32,
    /// Mean residual return
    pub residual_return: f64,
    /// Number of observations averaged
    pub count: usize,
    /// Running sum of `residual_return` over event times up to this one, within the group
    pub cumulative_residual_return: f64,
}

/// Grouped event-study curves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventStudyResult {
    group_columns: Vec<String>,
    rows: Vec<EventStudyRow>,
}

impl EventStudyResult {
    /// Grouping column names.
    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    /// Rows ordered by group, then ascending event time.
    pub fn rows(&self) -> &[EventStudyRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct groups, ordered.
    pub fn groups(&self) -> Vec<Vec<GroupLabel>> {
        let mut groups: Vec<Vec<GroupLabel>> = self.rows.iter().map(|r| r.groups.clone()).collect();
        groups.dedup();
        groups
    }

    /// The curve of one group, in ascending event time.
    pub fn rows_for(&self, groups: &[GroupLabel]) -> Vec<&EventStudyRow> {
        self.rows.iter().filter(|r| r.groups == groups).collect()
    }

    /// Convert to a DataFrame with one column per grouping column followed by
    /// `event_time`, `residual_return`, `count` and `cumulative_residual_return`.
    ///
    /// A grouping column holding only integer labels becomes `Int64`, otherwise `String`.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.group_columns.len() + 4);

        for (i, name) in self.group_columns.iter().enumerate() {
            let labels: Vec<&GroupLabel> = self.rows.iter().map(|r| &r.groups[i]).collect();
            let ints: Option<Vec<i64>> = labels
                .iter()
                .map(|label| match label {
                    GroupLabel::Int(v) => Some(*v),
                    GroupLabel::Text(_) => None,
                })
                .collect();
            let series = match ints {
                Some(values) => Series::new(name.as_str().into(), values),
                None => Series::new(
                    name.as_str().into(),
                    labels.iter().map(ToString::to_string).collect::<Vec<_>>(),
                ),
            };
            columns.push(series.into());
        }

        let event_times: Vec<i32> = self.rows.iter().map(|r| r.event_time).collect();
        let means: Vec<f64> = self.rows.iter().map(|r| r.residual_return).collect();
        let counts: Vec<u64> = self.rows.iter().map(|r| r.count as u64).collect();
        let cumulative: Vec<f64> = self
            .rows
            .iter()
            .map(|r| r.cumulative_residual_return)
            .collect();

        columns.push(Series::new(EVENT_TIME_COLUMN.into(), event_times).into());
        columns.push(Series::new(RESIDUAL_RETURN.into(), means).into());
        columns.push(Series::new(COUNT_COLUMN.into(), counts).into());
        columns.push(Series::new(CUMULATIVE_COLUMN.into(), cumulative).into());

        Ok(DataFrame::new(columns)?)
    }
}

/// Mean and count of residual returns per (group, event time), plus the running sum of
/// the mean over ascending event time within each group.
///
/// `group_columns` selects which of the data's grouping columns define a group. With no
/// grouping columns every observation belongs to one global group.
pub fn aggregate(data: &EventData, group_columns: &[String]) -> Result<EventStudyResult> {
    let indices = group_columns
        .iter()
        .map(|column| {
            data.group_columns()
                .iter()
                .position(|c| c == column)
                .ok_or_else(|| EventError::UnknownGroupColumn(column.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    let observations = data.observations();
    let codes: Vec<LabelCodes> = indices
        .iter()
        .enumerate()
        .map(|(i, &idx)| LabelCodes::new(format!("group_{i}"), observations, idx))
        .collect();

    let mut columns: Vec<Column> = codes.iter().map(|c| c.encode(observations).into()).collect();
    columns.push(
        Series::new(
            EVENT_TIME_COLUMN.into(),
            observations.iter().map(|o| o.event_time).collect::<Vec<_>>(),
        )
        .into(),
    );
    columns.push(
        Series::new(
            RESIDUAL_RETURN.into(),
            observations
                .iter()
                .map(|o| o.residual_return)
                .collect::<Vec<_>>(),
        )
        .into(),
    );

    let group_keys: Vec<Expr> = codes.iter().map(|c| col(c.column.as_str())).collect();
    let mut cell_keys = group_keys.clone();
    cell_keys.push(col(EVENT_TIME_COLUMN));

    let running = col(RESIDUAL_RETURN).cum_sum(false);
    let running = if group_keys.is_empty() {
        running
    } else {
        running.over(group_keys)
    };

    let df = DataFrame::new(columns)?
        .lazy()
        .group_by(cell_keys.clone())
        .agg([
            col(RESIDUAL_RETURN).mean(),
            len().cast(DataType::UInt64).alias(COUNT_COLUMN),
        ])
        .sort_by_exprs(cell_keys, SortMultipleOptions::default())
        .with_column(running.alias(CUMULATIVE_COLUMN))
        .collect()?;

    let decoded = codes
        .iter()
        .map(|c| c.decode(&df))
        .collect::<Result<Vec<_>>>()?;
    let event_times = df.column(EVENT_TIME_COLUMN)?.i32()?;
    let means = df.column(RESIDUAL_RETURN)?.f64()?;
    let counts = df.column(COUNT_COLUMN)?.u64()?;
    let cumulative = df.column(CUMULATIVE_COLUMN)?.f64()?;

    let rows = event_times
        .into_no_null_iter()
        .zip(means.into_no_null_iter())
        .zip(counts.into_no_null_iter())
        .zip(cumulative.into_no_null_iter())
        .enumerate()
        .map(|(i, (((event_time, mean), count), cumulative))| EventStudyRow {
            groups: decoded.iter().map(|labels| labels[i].clone()).collect(),
            event_time,
            residual_return: mean,
            count: count as usize,
            cumulative_residual_return: cumulative,
        })
        .collect::<Vec<_>>();

    debug!(groups = group_columns.len(), rows = rows.len(), "aggregated event study");

    Ok(EventStudyResult {
        group_columns: group_columns.to_vec(),
        rows,
    })
}

/// Dense, order-preserving `u32` codes for the labels of one grouping column, so that
/// integer and text labels sort in the frame exactly as [`GroupLabel`] orders them.
#[derive(Debug)]
struct LabelCodes {
    column: String,
    source: usize,
    labels: Vec<GroupLabel>,
}

impl LabelCodes {
    fn new(column: String, observations: &[EventObservation], source: usize) -> Self {
        let labels = observations
            .iter()
            .map(|o| &o.groups[source])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();
        Self {
            column,
            source,
            labels,
        }
    }

    fn encode(&self, observations: &[EventObservation]) -> Series {
        let codes: Vec<u32> = observations
            .iter()
            .map(|o| {
                self.labels
                    .binary_search(&o.groups[self.source])
                    .map_or(0, |code| code as u32)
            })
            .collect();
        Series::new(self.column.as_str().into(), codes)
    }

    fn decode(&self, df: &DataFrame) -> Result<Vec<GroupLabel>> {
        Ok(df
            .column(&self.column)?
            .u32()?
            .into_no_null_iter()
            .map(|code| self.labels[code as usize].clone())
            .collect())
    }
}
