#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod ols;
pub mod window;

pub use engine::{ALPHA_COLUMN, BETA_COLUMN, RESIDUAL_COLUMN, RETURN_COLUMN, RollingRegression};
pub use error::{RegressionError, Result};
pub use ols::{OlsFit, fit_ols};
pub use window::{AssetRegression, RegressionRow, RollingConfig};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
