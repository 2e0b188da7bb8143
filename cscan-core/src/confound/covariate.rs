//! Two-level covariate synthesized from the selected marker.
//!
//! The lower dosage level maps to "A", the higher to "B". Individuals with a
//! missing dosage get no label and drop out of every downstream join.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::selector::ConfoundedSelection;

#[derive(Error, Debug, PartialEq)]
pub enum CovariateError {
    #[error("Expected exactly two distinct non-missing dosage levels, found {found}")]
    LevelCount { found: usize },

    #[error("{ids} sample IDs for {dosages} dosages")]
    LengthMismatch { ids: usize, dosages: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CovariateLabel {
    A,
    B,
}

impl CovariateLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            CovariateLabel::A => "A",
            CovariateLabel::B => "B",
        }
    }

    /// Treatment coding with "A" as the reference level.
    pub fn indicator(self) -> f64 {
        match self {
            CovariateLabel::A => 0.0,
            CovariateLabel::B => 1.0,
        }
    }
}

impl fmt::Display for CovariateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Covariate labels keyed by individual ID.
#[derive(Debug, Clone)]
pub struct CovariateTable {
    /// Labelled IDs in source order.
    ids: Vec<String>,
    labels: HashMap<String, CovariateLabel>,
    /// Dosage levels behind "A" and "B".
    levels: (f64, f64),
}

impl CovariateTable {
    /// Map a two-level dosage vector onto labels.
    pub fn from_dosages(sample_ids: &[String], dosages: &[f64]) -> Result<Self, CovariateError> {
        if sample_ids.len() != dosages.len() {
            return Err(CovariateError::LengthMismatch {
                ids: sample_ids.len(),
                dosages: dosages.len(),
            });
        }

        let mut distinct: Vec<f64> = Vec::with_capacity(2);
        for &d in dosages.iter().filter(|d| !d.is_nan()) {
            if !distinct.contains(&d) {
                distinct.push(d);
            }
        }
        if distinct.len() != 2 {
            return Err(CovariateError::LevelCount {
                found: distinct.len(),
            });
        }
        let low = distinct[0].min(distinct[1]);
        let high = distinct[0].max(distinct[1]);

        let mut ids = Vec::with_capacity(sample_ids.len());
        let mut labels = HashMap::with_capacity(sample_ids.len());
        for (id, &d) in sample_ids.iter().zip(dosages.iter()) {
            if d.is_nan() {
                continue;
            }
            let label = if d == low {
                CovariateLabel::A
            } else {
                CovariateLabel::B
            };
            ids.push(id.clone());
            labels.insert(id.clone(), label);
        }

        Ok(Self {
            ids,
            labels,
            levels: (low, high),
        })
    }

    /// Covariate for the selected marker.
    pub fn from_selection(selection: &ConfoundedSelection) -> Result<Self, CovariateError> {
        Self::from_dosages(&selection.sample_ids, &selection.marker.dosages)
    }

    pub fn label(&self, id: &str) -> Option<CovariateLabel> {
        self.labels.get(id).copied()
    }

    /// IDs that received a label, in source order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dosage level represented by a label.
    pub fn level_of(&self, label: CovariateLabel) -> f64 {
        match label {
            CovariateLabel::A => self.levels.0,
            CovariateLabel::B => self.levels.1,
        }
    }

    /// Label strings for `ids`, `None` where unlabelled.
    pub fn labels_for(&self, ids: &[String]) -> Vec<Option<String>> {
        ids.iter()
            .map(|id| self.label(id).map(|l| l.as_str().to_string()))
            .collect()
    }

    /// 0/1 design column for `ids` (inner join: unlabelled IDs are dropped).
    ///
    /// Returns the kept IDs alongside their indicator values.
    pub fn indicator_for(&self, ids: &[String]) -> (Vec<String>, Vec<f64>) {
        ids.iter()
            .filter_map(|id| self.label(id).map(|l| (id.clone(), l.indicator())))
            .unzip()
    }

    /// Count of individuals per label.
    pub fn counts(&self) -> (usize, usize) {
        let b = self
            .labels
            .values()
            .filter(|&&l| l == CovariateLabel::B)
            .count();
        (self.labels.len() - b, b)
    }
}
