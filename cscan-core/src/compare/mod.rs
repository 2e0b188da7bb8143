//! Side-by-side comparison of score-test and OLS results.

pub mod evaluator;

pub use evaluator::{compare, AgreementSummary, ComparisonRecord, ComparisonTable};
