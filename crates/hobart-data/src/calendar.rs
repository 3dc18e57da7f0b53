//! Trading-session calendars.

use crate::error::{DataError, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// Trading-calendar arithmetic over exchange sessions.
///
/// Offsets are counted in sessions, never in calendar days.
pub trait TradingCalendar: Send + Sync {
    /// `date` if it is a session, otherwise the next session.
    fn valid_trading_start(&self, date: NaiveDate) -> Result<NaiveDate>;

    /// `date` if it is a session, otherwise the previous session.
    fn valid_trading_end(&self, date: NaiveDate) -> Result<NaiveDate>;

    /// Sessions relative to `date`, in ascending order.
    ///
    /// `n < 0` returns the `|n|` sessions strictly before `date`, `n > 0` the `n` sessions
    /// strictly after it and `n == 0` an empty list. Near the edge of the calendar fewer
    /// sessions may be returned.
    fn n_trading_days_from(&self, n: i32, date: NaiveDate) -> Result<Vec<NaiveDate>>;
}

/// Calendar backed by an explicit, sorted list of sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCalendar {
    sessions: Vec<NaiveDate>,
}

impl SessionCalendar {
    /// Build from any collection of session dates (deduplicated and sorted).
    pub fn new(sessions: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            sessions: sessions
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        }
    }

    /// Monday-to-Friday sessions in `[start, end]`, minus `holidays`.
    pub fn weekdays(start: NaiveDate, end: NaiveDate, holidays: &[NaiveDate]) -> Self {
        let holidays: BTreeSet<_> = holidays.iter().copied().collect();
        let sessions = start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .filter(|d| !holidays.contains(d));
        Self::new(sessions)
    }

    /// All sessions, ascending.
    pub fn sessions(&self) -> &[NaiveDate] {
        &self.sessions
    }

    /// Whether `date` is a session.
    pub fn is_session(&self, date: NaiveDate) -> bool {
        self.sessions.binary_search(&date).is_ok()
    }

    /// First and last session.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.sessions.first()?, *self.sessions.last()?))
    }
}

impl TradingCalendar for SessionCalendar {
    fn valid_trading_start(&self, date: NaiveDate) -> Result<NaiveDate> {
        let idx = self.sessions.partition_point(|s| *s < date);
        self.sessions
            .get(idx)
            .copied()
            .ok_or_else(|| DataError::Calendar(format!("No session on or after {date}")))
    }

    fn valid_trading_end(&self, date: NaiveDate) -> Result<NaiveDate> {
        let idx = self.sessions.partition_point(|s| *s <= date);
        idx.checked_sub(1)
            .map(|i| self.sessions[i])
            .ok_or_else(|| DataError::Calendar(format!("No session on or before {date}")))
    }

    fn n_trading_days_from(&self, n: i32, date: NaiveDate) -> Result<Vec<NaiveDate>> {
        let count = n.unsigned_abs() as usize;
        let dates = match n.signum() {
            -1 => {
                let end = self.sessions.partition_point(|s| *s < date);
                let start = end.saturating_sub(count);
                self.sessions[start..end].to_vec()
            }
            1 => {
                let start = self.sessions.partition_point(|s| *s <= date);
                let end = (start + count).min(self.sessions.len());
                self.sessions[start..end].to_vec()
            }
            _ => Vec::new(),
        };
        Ok(dates)
    }
}
