//! Joins the two scans by marker ID and measures how far they disagree.
//!
//! An aliased OLS genotype term carries no evidence: it enters the
//! comparison with estimate 0 and -log10 p of 0.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::ols::OlsMarkerResult;
use crate::score_test::ScoreTestResult;
use crate::util::math::{neg_log10, pearson_correlation};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRecord {
    pub marker_id: String,
    pub score_estimate: f64,
    pub ols_estimate: f64,
    pub score_neg_log10_p: f64,
    pub ols_neg_log10_p: f64,
    pub is_confounded: bool,
}

impl ComparisonRecord {
    pub fn neg_log10_discrepancy(&self) -> f64 {
        (self.score_neg_log10_p - self.ols_neg_log10_p).abs()
    }

    pub fn estimate_discrepancy(&self) -> f64 {
        (self.score_estimate - self.ols_estimate).abs()
    }
}

/// Agreement between the two methods over a set of markers.
#[derive(Debug, Clone, Serialize)]
pub struct AgreementSummary {
    pub n_markers: usize,
    pub max_neg_log10_discrepancy: f64,
    pub max_estimate_discrepancy: f64,
    pub neg_log10_correlation: f64,
    pub estimate_correlation: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ComparisonTable {
    records: Vec<ComparisonRecord>,
}

impl ComparisonTable {
    pub fn new(records: Vec<ComparisonRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ComparisonRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn confounded(&self) -> Option<&ComparisonRecord> {
        self.records.iter().find(|r| r.is_confounded)
    }

    pub fn get(&self, marker_id: &str) -> Option<&ComparisonRecord> {
        self.records.iter().find(|r| r.marker_id == marker_id)
    }

    /// The table without one marker.
    pub fn without(&self, marker_id: &str) -> ComparisonTable {
        Self::new(
            self.records
                .iter()
                .filter(|r| r.marker_id != marker_id)
                .cloned()
                .collect(),
        )
    }

    /// Largest |score - OLS| difference in -log10 p; 0 for an empty table.
    pub fn max_neg_log10_discrepancy(&self) -> f64 {
        max_finite(self.records.iter().map(|r| r.neg_log10_discrepancy()))
    }

    /// Largest |score - OLS| difference in effect estimate; 0 for an empty table.
    pub fn max_estimate_discrepancy(&self) -> f64 {
        max_finite(self.records.iter().map(|r| r.estimate_discrepancy()))
    }

    pub fn summary(&self) -> AgreementSummary {
        let (score_p, ols_p): (Vec<f64>, Vec<f64>) = self
            .records
            .iter()
            .map(|r| (r.score_neg_log10_p, r.ols_neg_log10_p))
            .unzip();
        let (score_b, ols_b): (Vec<f64>, Vec<f64>) = self
            .records
            .iter()
            .map(|r| (r.score_estimate, r.ols_estimate))
            .unzip();
        AgreementSummary {
            n_markers: self.len(),
            max_neg_log10_discrepancy: self.max_neg_log10_discrepancy(),
            max_estimate_discrepancy: self.max_estimate_discrepancy(),
            neg_log10_correlation: pearson_correlation(&score_p, &ols_p),
            estimate_correlation: pearson_correlation(&score_b, &ols_b),
        }
    }
}

fn max_finite(values: impl Iterator<Item = f64>) -> f64 {
    values.filter(|v| v.is_finite()).fold(0.0, f64::max)
}

/// Inner-join the two scans by marker ID, in score-result order.
pub fn compare(
    score_rows: &[ScoreTestResult],
    ols_rows: &[OlsMarkerResult],
    confounded_id: &str,
) -> ComparisonTable {
    let ols_by_id: HashMap<&str, &OlsMarkerResult> =
        ols_rows.iter().map(|r| (r.marker_id.as_str(), r)).collect();

    let records: Vec<ComparisonRecord> = score_rows
        .iter()
        .filter_map(|s| {
            let o = ols_by_id.get(s.marker_id.as_str())?;
            let (ols_estimate, ols_neg_log10_p) = if o.aliased {
                (0.0, 0.0)
            } else {
                (o.estimate, neg_log10(o.pvalue))
            };
            Some(ComparisonRecord {
                marker_id: s.marker_id.clone(),
                score_estimate: s.beta,
                ols_estimate,
                score_neg_log10_p: neg_log10(s.pvalue),
                ols_neg_log10_p,
                is_confounded: s.marker_id == confounded_id,
            })
        })
        .collect();

    debug!(
        "Joined {} score rows with {} OLS rows: {} markers",
        score_rows.len(),
        ols_rows.len(),
        records.len()
    );
    ComparisonTable::new(records)
}
