//! In-memory genotype store.
//!
//! Holds a full individual x marker dosage matrix. Used for simulated data
//! and for exercising the pipeline without a PLINK fileset on disk.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::traits::{GenotypeReader, MarkerData, MarkerInfo};

pub struct InMemoryReader {
    markers: Vec<MarkerInfo>,
    /// `dosages[m][i]`: marker m, sample i (store order).
    dosages: Vec<Vec<f64>>,
    id_index: HashMap<String, usize>,
    sample_ids: Vec<String>,
    sample_subset: Option<Vec<usize>>,
}

impl InMemoryReader {
    /// Build a store from sample IDs and one dosage row per marker.
    pub fn new(sample_ids: Vec<String>, markers: Vec<MarkerInfo>, dosages: Vec<Vec<f64>>) -> Result<Self> {
        if markers.len() != dosages.len() {
            bail!(
                "{} marker infos but {} dosage rows",
                markers.len(),
                dosages.len()
            );
        }
        if let Some((m, row)) = dosages
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != sample_ids.len())
        {
            bail!(
                "Marker {} has {} dosages, store has {} samples",
                markers[m].id,
                row.len(),
                sample_ids.len()
            );
        }
        let mut id_index = HashMap::with_capacity(sample_ids.len());
        for (i, id) in sample_ids.iter().enumerate() {
            if id_index.insert(id.clone(), i).is_some() {
                bail!("Duplicate sample ID: {}", id);
            }
        }
        Ok(Self {
            markers,
            dosages,
            id_index,
            sample_ids,
            sample_subset: None,
        })
    }

    /// Convenience constructor: samples `S1..Sn`, markers `m0..mk` on chromosome 1.
    pub fn from_rows(dosages: Vec<Vec<f64>>) -> Result<Self> {
        let n = dosages.first().map_or(0, |r| r.len());
        let ids = (1..=n).map(|i| format!("S{}", i)).collect();
        let markers = (0..dosages.len())
            .map(|m| MarkerInfo {
                chrom: "1".into(),
                pos: (m as u64 + 1) * 1000,
                id: format!("m{}", m),
                ref_allele: "A".into(),
                alt_allele: "G".into(),
            })
            .collect();
        Self::new(ids, markers, dosages)
    }
}

impl GenotypeReader for InMemoryReader {
    fn n_markers(&self) -> usize {
        self.markers.len()
    }

    fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    fn set_sample_subset(&mut self, ids: &[String]) -> Result<()> {
        let (indices, new_ids): (Vec<usize>, Vec<String>) = ids
            .iter()
            .filter_map(|id| self.id_index.get(id).map(|&i| (i, id.clone())))
            .unzip();
        self.sample_subset = Some(indices);
        self.sample_ids = new_ids;
        Ok(())
    }

    fn read_marker(&mut self, index: u64) -> Result<MarkerData> {
        let idx = index as usize;
        let Some(row) = self.dosages.get(idx) else {
            bail!("Marker index {} out of range ({})", index, self.markers.len());
        };
        let dosages = match &self.sample_subset {
            Some(indices) => indices.iter().map(|&i| row[i]).collect(),
            None => row.clone(),
        };
        Ok(MarkerData::new(self.markers[idx].clone(), dosages))
    }

    fn marker_info(&self, index: u64) -> Result<MarkerInfo> {
        match self.markers.get(index as usize) {
            Some(info) => Ok(info.clone()),
            None => bail!("Marker index {} out of range ({})", index, self.markers.len()),
        }
    }
}
