//! Date-range and asset filtering for panels.

use crate::panel::{Asset, AssetId};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Inclusive date range plus optional asset membership.
///
/// Unset bounds are open; an unset asset set keeps every asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelFilter {
    /// First date kept (inclusive)
    pub start: Option<NaiveDate>,
    /// Last date kept (inclusive)
    pub end: Option<NaiveDate>,
    /// Assets kept, by id
    pub assets: Option<BTreeSet<AssetId>>,
}

impl PanelFilter {
    /// Filter that keeps everything.
    pub const fn all() -> Self {
        Self {
            start: None,
            end: None,
            assets: None,
        }
    }

    /// Filter on an inclusive date range.
    pub const fn between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            start,
            end,
            assets: None,
        }
    }

    /// Restrict to the given assets. `None` keeps every asset.
    pub fn with_assets(mut self, assets: Option<&[Asset]>) -> Self {
        self.assets = assets.map(|a| a.iter().map(|asset| asset.sid).collect());
        self
    }

    /// Whether a key passes the filter.
    pub fn matches(&self, date: NaiveDate, asset: &Asset) -> bool {
        if self.start.is_some_and(|start| date < start) {
            return false;
        }
        if self.end.is_some_and(|end| date > end) {
            return false;
        }
        self.assets
            .as_ref()
            .is_none_or(|assets| assets.contains(&asset.sid))
    }
}
