//! Expansion of point events into relative-time windows.

use crate::error::Result;
use crate::event::{EventSet, GroupLabel};
use chrono::NaiveDate;
use hobart_data::{Asset, TradingCalendar};
use std::collections::BTreeSet;
use tracing::debug;

/// One row of an event window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRow {
    /// Trading session
    pub date: NaiveDate,
    /// Asset of the source event
    pub asset: Asset,
    /// Session offset from the event date; 0 is the event itself
    pub event_time: i32,
    /// Labels copied from the source event
    pub groups: Vec<GroupLabel>,
}

/// Window rows of every event, with the grouping columns they carry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventWindows {
    group_columns: Vec<String>,
    rows: Vec<WindowRow>,
}

impl EventWindows {
    /// Grouping column names.
    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    /// Rows ordered by (date, asset id, event time).
    pub fn rows(&self) -> &[WindowRow] {
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

    /// Earliest and latest session covered.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.rows.first()?.date, self.rows.last()?.date))
    }

    /// Distinct assets, ordered by id.
    pub fn assets(&self) -> Vec<Asset> {
        self.rows
            .iter()
            .map(|r| r.asset.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Add each event itself as a row at `event_time = 0`.
    pub fn with_event_rows(mut self, events: &EventSet) -> Self {
        self.rows.extend(events.events().iter().map(|e| WindowRow {
            date: e.date,
            asset: e.asset.clone(),
            event_time: 0,
            groups: e.groups.clone(),
        }));
        self.sort();
        self
    }

    fn sort(&mut self) {
        self.rows
            .sort_by(|a, b| (a.date, &a.asset, a.event_time).cmp(&(b.date, &b.asset, b.event_time)));
    }
}

/// Expand every event into the `days_before` sessions strictly before its date and the
/// `days_after` sessions strictly after it.
///
/// Offsets count trading sessions: the session just before the event is `-1`, the one
/// just after is `1`. Near the edge of the calendar fewer sessions are available and the
/// window is truncated on that side. The event row itself is not included; see
/// [`EventWindows::with_event_rows`].
///
/// # Arguments
/// * `events` - Events to expand
/// * `days_before` - Sessions before each event
/// * `days_after` - Sessions after each event
/// * `calendar` - Trading calendar
pub fn build_windows(
    events: &EventSet,
    days_before: u32,
    days_after: u32,
    calendar: &dyn TradingCalendar,
) -> Result<EventWindows> {
    debug!(
        events = events.len(),
        days_before, days_after, "building event windows"
    );

    let before = i32::try_from(days_before).unwrap_or(i32::MAX);
    let after = i32::try_from(days_after).unwrap_or(i32::MAX);

    // Sized by what the calendar returns, not by the requested widths.
    let mut rows = Vec::new();
    let mut truncated = 0usize;
    for event in events.events() {
        let prior = calendar.n_trading_days_from(-before, event.date)?;
        let post = calendar.n_trading_days_from(after, event.date)?;
        if prior.len() < days_before as usize || post.len() < days_after as usize {
            truncated += 1;
        }

        // prior is ascending and ends right before the event
        let n_prior = prior.len() as i32;
        let offsets = (-n_prior..0).chain(1..);
        for (date, event_time) in prior.into_iter().chain(post).zip(offsets) {
            rows.push(WindowRow {
                date,
                asset: event.asset.clone(),
                event_time,
                groups: event.groups.clone(),
            });
        }
    }

    if truncated > 0 {
        debug!(truncated, "event windows truncated at the calendar edge");
    }

    let mut windows = EventWindows {
        group_columns: events.group_columns().to_vec(),
        rows,
    };
    windows.sort();
    Ok(windows)
}
