//! Event studies over market-neutral residual returns.

use crate::error::Result;
use crate::residuals::ResidualReturnsService;
use hobart_data::{Panel, PriceField};
use hobart_events::{
    EventSet, EventStudyResult, RESIDUAL_RETURN, aggregate, build_windows, join_and_fill,
};
use std::sync::Arc;
use tracing::info;

/// Average residual-return curves around events, per event group.
#[derive(Debug, Clone)]
pub struct EventStudyService {
    residuals: Arc<ResidualReturnsService>,
}

impl EventStudyService {
    /// Create a service reading residuals (and the trading calendar) from `residuals`.
    pub const fn new(residuals: Arc<ResidualReturnsService>) -> Self {
        Self { residuals }
    }

    /// Run an event study.
    ///
    /// Each event is expanded to `days_before` sessions before and `days_after` sessions
    /// after its date, plus the event day itself at event time 0. Residual returns are
    /// joined on (date, asset), with 0.0 where none exist, and averaged per group and
    /// event time. `cumulative_residual_return` sums the means along event time within
    /// each group.
    ///
    /// # Arguments
    /// * `events` - Events with their grouping labels
    /// * `field` - Returns the residuals are computed on
    /// * `days_before` - Sessions before each event
    /// * `days_after` - Sessions after each event
    pub fn run_event_study(
        &self,
        events: &EventSet,
        field: PriceField,
        days_before: u32,
        days_after: u32,
    ) -> Result<EventStudyResult> {
        let market = self.residuals.market();
        let windows = build_windows(events, days_before, days_after, &**market)?
            .with_event_rows(events);

        let residuals = match windows.date_range() {
            Some((start, end)) => {
                let assets = windows.assets();
                self.residuals.get_market_neutral_residual_returns(
                    Some(start),
                    Some(end),
                    Some(&assets),
                    field,
                )?
            }
            None => Panel::new([RESIDUAL_RETURN]),
        };

        let data = join_and_fill(&windows, &residuals)?;
        let result = aggregate(&data, events.group_columns())?;
        info!(
            events = events.len(),
            window_rows = windows.len(),
            groups = result.groups().len(),
            "event study complete"
        );
        Ok(result)
    }
}
