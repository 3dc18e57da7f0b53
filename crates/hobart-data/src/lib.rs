#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod calendar;
pub mod error;
pub mod filter;
pub mod market;
pub mod panel;
pub mod series;

pub use cache::{CacheTier, FileTier, MemoryTier, PanelCache, RemoteBackend, RemoteTier, SqliteBackend, TieredCache};
pub use calendar::{SessionCalendar, TradingCalendar};
pub use error::{DataError, Result};
pub use filter::PanelFilter;
pub use market::{CLOSE_RETURN, InMemoryMarketData, MarketDataProvider, OPEN_RETURN, PriceField};
pub use panel::{Asset, AssetId, Panel, PanelKey};
pub use series::FactorSeries;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
