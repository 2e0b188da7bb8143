//! Output tables and plot-ready data.

pub mod plots;
pub mod tables;

pub use plots::{signed_log, signed_log_breaks, signed_log_inverse, PlotSpec};
pub use tables::{write_comparison, write_ols_results, write_score_results};
