//! Sample ID joins.
//!
//! Every table in the pipeline (genotype store, phenotype, covariate) is keyed
//! by individual ID. Joins are inner joins on that key; rows without a match
//! on every side are dropped, never treated as errors.

use std::collections::HashMap;

/// Result of intersecting sample IDs from multiple sources.
#[derive(Debug, Clone)]
pub struct SampleIntersection {
    /// Sample IDs in the intersection, in the order they appear in the primary source.
    pub ids: Vec<String>,
    /// `indices[s][k]` is the row of `ids[k]` in source `s`.
    pub indices: Vec<Vec<usize>>,
}

impl SampleIntersection {
    /// Number of joined samples.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Pull the joined rows of `values`, which must be laid out like `source`.
    pub fn gather<T: Clone>(&self, source: usize, values: &[T]) -> Vec<T> {
        self.indices[source].iter().map(|&i| values[i].clone()).collect()
    }
}

/// Intersect sample IDs from multiple sources.
///
/// Returns the intersection in the order of the first (primary) source.
pub fn intersect_samples(sources: &[&[String]]) -> SampleIntersection {
    if sources.is_empty() {
        return SampleIntersection {
            ids: Vec::new(),
            indices: Vec::new(),
        };
    }

    let maps: Vec<HashMap<&str, usize>> = sources
        .iter()
        .map(|ids| {
            ids.iter()
                .enumerate()
                .map(|(i, id)| (id.as_str(), i))
                .collect()
        })
        .collect();

    let mut result_ids = Vec::new();
    let mut result_indices: Vec<Vec<usize>> = vec![Vec::new(); sources.len()];

    for (primary_idx, id) in sources[0].iter().enumerate() {
        let in_all = maps[1..].iter().all(|m| m.contains_key(id.as_str()));
        if in_all {
            result_ids.push(id.clone());
            result_indices[0].push(primary_idx);
            for (src, map) in maps[1..].iter().enumerate() {
                result_indices[src + 1].push(map[id.as_str()]);
            }
        }
    }

    SampleIntersection {
        ids: result_ids,
        indices: result_indices,
    }
}
