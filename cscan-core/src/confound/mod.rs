//! Construction of the confounded marker and its covariate.

pub mod covariate;
pub mod selector;

pub use covariate::{CovariateLabel, CovariateTable};
pub use selector::{select_confounded_marker, ConfoundedSelection, SelectionError};
