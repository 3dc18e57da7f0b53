//! Market data provider interface and an in-memory implementation.

use crate::calendar::{SessionCalendar, TradingCalendar};
use crate::error::{DataError, Result};
use crate::filter::PanelFilter;
use crate::panel::{Asset, Panel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Column holding open-to-open returns.
pub const OPEN_RETURN: &str = "open_return";
/// Column holding close-to-close returns.
pub const CLOSE_RETURN: &str = "close_return";

/// Which price a return series is measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    /// Open-to-open returns
    Open,
    /// Close-to-close returns
    #[default]
    Close,
}

impl PriceField {
    /// Name of the return column in provider panels.
    pub const fn return_column(&self) -> &'static str {
        match self {
            Self::Open => OPEN_RETURN,
            Self::Close => CLOSE_RETURN,
        }
    }

    /// Lowercase name, used in cache keys.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }
}

impl std::fmt::Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceField {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            other => Err(DataError::Parse(format!("Invalid price field: {other}"))),
        }
    }
}

/// Source of daily asset returns, asset lookups and trading-calendar arithmetic.
///
/// Errors from implementations are propagated unchanged by every caller; retrying is the
/// provider's own concern.
pub trait MarketDataProvider: TradingCalendar {
    /// Panel with `open_return` and `close_return` for sessions in `[start, end]`.
    ///
    /// `None` returns every asset the provider knows.
    fn get_returns(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        assets: Option<&[Asset]>,
    ) -> Result<Panel>;

    /// Resolve tickers to assets, in the order given.
    fn get_assets(&self, tickers: &[&str]) -> Result<Vec<Asset>>;

    /// Resolve a single ticker.
    fn get_asset(&self, ticker: &str) -> Result<Asset> {
        self.get_assets(&[ticker])?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::UnknownAsset(ticker.to_string()))
    }
}

/// Provider serving a preloaded returns panel.
#[derive(Debug, Clone)]
pub struct InMemoryMarketData {
    returns: Panel,
    by_symbol: BTreeMap<String, Asset>,
    calendar: SessionCalendar,
}

impl InMemoryMarketData {
    /// Create a provider over `returns` using `calendar` for session arithmetic.
    ///
    /// The panel must carry `open_return` and `close_return` columns.
    pub fn new(returns: Panel, calendar: SessionCalendar) -> Result<Self> {
        returns.require_column(OPEN_RETURN)?;
        returns.require_column(CLOSE_RETURN)?;

        let by_symbol = returns
            .assets()
            .into_iter()
            .map(|asset| (asset.symbol.to_uppercase(), asset))
            .collect();

        Ok(Self {
            returns,
            by_symbol,
            calendar,
        })
    }

    /// Create a provider whose calendar is the set of dates present in `returns`.
    pub fn from_returns(returns: Panel) -> Result<Self> {
        let calendar = SessionCalendar::new(returns.dates());
        Self::new(returns, calendar)
    }

    /// The session calendar in use.
    pub const fn calendar(&self) -> &SessionCalendar {
        &self.calendar
    }

    /// Every known asset, ordered by id.
    pub fn assets(&self) -> Vec<Asset> {
        self.returns.assets()
    }
}

impl TradingCalendar for InMemoryMarketData {
    fn valid_trading_start(&self, date: NaiveDate) -> Result<NaiveDate> {
        self.calendar.valid_trading_start(date)
    }

    fn valid_trading_end(&self, date: NaiveDate) -> Result<NaiveDate> {
        self.calendar.valid_trading_end(date)
    }

    fn n_trading_days_from(&self, n: i32, date: NaiveDate) -> Result<Vec<NaiveDate>> {
        self.calendar.n_trading_days_from(n, date)
    }
}

impl MarketDataProvider for InMemoryMarketData {
    fn get_returns(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        assets: Option<&[Asset]>,
    ) -> Result<Panel> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        let filter = PanelFilter::between(Some(start), Some(end)).with_assets(assets);
        Ok(self.returns.filter(&filter))
    }

    fn get_assets(&self, tickers: &[&str]) -> Result<Vec<Asset>> {
        tickers
            .iter()
            .map(|ticker| {
                self.by_symbol
                    .get(&ticker.to_uppercase())
                    .cloned()
                    .ok_or_else(|| DataError::UnknownAsset((*ticker).to_string()))
            })
            .collect()
    }
}
