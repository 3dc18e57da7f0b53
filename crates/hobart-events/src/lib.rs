#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod bucket;
pub mod error;
pub mod event;
pub mod window;

pub use aggregate::{
    EventData, EventObservation, EventStudyResult, EventStudyRow, RESIDUAL_RETURN, aggregate,
    join_and_fill,
};
pub use bucket::{equal_width_buckets, quantile_buckets};
pub use error::{EventError, Result};
pub use event::{Event, EventSet, GroupLabel};
pub use window::{EventWindows, WindowRow, build_windows};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
