#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod event_study;
pub mod factors;
mod history;
pub mod residuals;
pub mod universe;

// Re-export main types from sub-crates
pub use hobart_data as data;
pub use hobart_events as events;
pub use hobart_regression as regression;

pub use config::SignalConfig;
pub use error::{Result, ServiceError};
pub use event_study::EventStudyService;
pub use factors::{MARKET_FACTORS_KEY, MarketFactorService};
pub use history::{BENCHMARK_FACTOR, ProgressHook};
pub use residuals::{FactorProvider, ResidualReturnsService, StaticFactors};
pub use universe::{StaticUniverse, Universe};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
