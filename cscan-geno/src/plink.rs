//! PLINK bed/bim/fam reader (memory-mapped) and writer.
//!
//! PLINK binary format consists of three files:
//! - .bed: Binary genotype data (2 bits per genotype, packed)
//! - .bim: Variant information (chrom, id, cm, pos, a1, a2)
//! - .fam: Sample information (fid, iid, father, mother, sex, pheno)
//!
//! Reference: https://www.cog-genomics.org/plink/1.9/formats#bed

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use tracing::{debug, info};

use crate::traits::{GenotypeReader, MarkerData, MarkerInfo};

/// Magic bytes plus the SNP-major mode byte.
const BED_HEADER: [u8; 3] = [0x6C, 0x1B, 0x01];

/// PLINK BIM file entry (one per variant).
#[derive(Debug, Clone)]
pub struct BimEntry {
    pub chrom: String,
    pub id: String,
    pub cm: f64,
    pub pos: u64,
    pub allele1: String, // Counted allele (ALT)
    pub allele2: String, // REF
}

impl BimEntry {
    fn to_marker_info(&self) -> MarkerInfo {
        MarkerInfo {
            chrom: self.chrom.clone(),
            pos: self.pos,
            id: self.id.clone(),
            ref_allele: self.allele2.clone(),
            alt_allele: self.allele1.clone(),
        }
    }
}

/// PLINK FAM file entry (one per sample).
#[derive(Debug, Clone)]
pub struct FamEntry {
    pub fid: String,
    pub iid: String,
    pub father: String,
    pub mother: String,
    pub sex: i32,
    pub pheno: f64,
}

/// Append a PLINK extension to a fileset prefix.
///
/// `Path::with_extension` would clobber dotted prefixes like `data.chr1`.
pub fn fileset_path(base: &Path, ext: &str) -> PathBuf {
    let mut s = base.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// Reader for PLINK bed/bim/fam files.
pub struct PlinkReader {
    /// Memory-mapped .bed file.
    mmap: Mmap,
    /// Variant information from .bim file.
    bim: Vec<BimEntry>,
    /// Sample information from .fam file.
    fam: Vec<FamEntry>,
    /// IID -> row in the .fam file.
    fam_index: HashMap<String, usize>,
    /// Number of bytes per marker in the bed file.
    bytes_per_marker: usize,
    /// Sample IDs (IID) of the current subset.
    sample_ids: Vec<String>,
    /// Indices of selected samples (None = all samples).
    sample_subset: Option<Vec<usize>>,
}

impl PlinkReader {
    /// Open PLINK files from a fileset prefix (without extension).
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base = base_path.as_ref();
        let bed_path = fileset_path(base, "bed");
        let bim_path = fileset_path(base, "bim");
        let fam_path = fileset_path(base, "fam");

        let fam = Self::parse_fam(&fam_path)?;
        let n_samples = fam.len();
        let bim = Self::parse_bim(&bim_path)?;

        let bed_file = File::open(&bed_path)
            .with_context(|| format!("Failed to open bed file: {}", bed_path.display()))?;
        let mmap = unsafe { Mmap::map(&bed_file)? };

        if mmap.len() < 3 {
            bail!("Bed file too small");
        }
        if mmap[0] != BED_HEADER[0] || mmap[1] != BED_HEADER[1] {
            bail!("Invalid PLINK bed file magic number");
        }
        if mmap[2] != BED_HEADER[2] {
            bail!("Only SNP-major bed files are supported (mode byte = 0x01)");
        }

        let bytes_per_marker = n_samples.div_ceil(4);
        let expected_size = 3 + bytes_per_marker * bim.len();
        if mmap.len() < expected_size {
            bail!(
                "Bed file too small: expected at least {} bytes, got {}",
                expected_size,
                mmap.len()
            );
        }

        let mut fam_index = HashMap::with_capacity(n_samples);
        for (i, f) in fam.iter().enumerate() {
            if fam_index.insert(f.iid.clone(), i).is_some() {
                bail!("Duplicate sample ID in fam file: {}", f.iid);
            }
        }

        let sample_ids: Vec<String> = fam.iter().map(|f| f.iid.clone()).collect();
        debug!(
            "Opened PLINK fileset {}: {} samples, {} markers",
            base.display(),
            n_samples,
            bim.len()
        );

        Ok(Self {
            mmap,
            bim,
            fam,
            fam_index,
            bytes_per_marker,
            sample_ids,
            sample_subset: None,
        })
    }

    fn parse_fam(path: &Path) -> Result<Vec<FamEntry>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fam file: {}", path.display()))?;
        let mut entries = Vec::new();
        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                bail!("Fam file line {} has fewer than 6 fields", line_num + 1);
            }
            entries.push(FamEntry {
                fid: fields[0].to_string(),
                iid: fields[1].to_string(),
                father: fields[2].to_string(),
                mother: fields[3].to_string(),
                sex: fields[4].parse().unwrap_or(0),
                pheno: fields[5].parse().unwrap_or(f64::NAN),
            });
        }
        Ok(entries)
    }

    fn parse_bim(path: &Path) -> Result<Vec<BimEntry>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bim file: {}", path.display()))?;
        let mut entries = Vec::new();
        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                bail!("Bim file line {} has fewer than 6 fields", line_num + 1);
            }
            entries.push(BimEntry {
                chrom: fields[0].to_string(),
                id: fields[1].to_string(),
                cm: fields[2].parse().unwrap_or(0.0),
                pos: fields[3].parse().unwrap_or(0),
                allele1: fields[4].to_string(),
                allele2: fields[5].to_string(),
            });
        }
        Ok(entries)
    }

    /// Decode a single genotype from the bed file.
    /// Returns dosage of allele1: 0, 1, 2, or NaN for missing.
    #[inline]
    fn decode_genotype(byte: u8, offset: usize) -> f64 {
        match (byte >> (offset * 2)) & 0x03 {
            0b00 => 2.0,      // Homozygous A1/A1
            0b01 => f64::NAN, // Missing
            0b10 => 1.0,      // Heterozygous
            _ => 0.0,         // Homozygous A2/A2
        }
    }

    /// Read the dosage of every selected sample at one marker.
    fn read_selected(&self, index: usize) -> Vec<f64> {
        let offset = 3 + index * self.bytes_per_marker;
        let decode = |sample_idx: usize| {
            let byte = self.mmap[offset + sample_idx / 4];
            Self::decode_genotype(byte, sample_idx % 4)
        };
        match &self.sample_subset {
            Some(indices) => indices.iter().map(|&i| decode(i)).collect(),
            None => (0..self.fam.len()).map(decode).collect(),
        }
    }

    /// FAM entries of the current subset, in subset order.
    pub fn subset_fam(&self) -> Vec<FamEntry> {
        match &self.sample_subset {
            Some(indices) => indices.iter().map(|&i| self.fam[i].clone()).collect(),
            None => self.fam.clone(),
        }
    }

    /// Write the current sample subset, all markers, as a new fileset.
    pub fn write_subset<P: AsRef<Path>>(&self, base_path: P) -> Result<()> {
        let base = base_path.as_ref();
        let mut writer = PlinkWriter::create(base, &self.subset_fam())?;
        for (m, entry) in self.bim.iter().enumerate() {
            writer.write_marker(entry, &self.read_selected(m))?;
        }
        let n_written = writer.finish()?;
        info!(
            "Wrote {} samples x {} markers to {}",
            self.n_samples(),
            n_written,
            base.display()
        );
        Ok(())
    }
}

impl GenotypeReader for PlinkReader {
    fn n_markers(&self) -> usize {
        self.bim.len()
    }

    fn n_samples(&self) -> usize {
        match &self.sample_subset {
            Some(indices) => indices.len(),
            None => self.fam.len(),
        }
    }

    fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    fn set_sample_subset(&mut self, ids: &[String]) -> Result<()> {
        let mut indices = Vec::with_capacity(ids.len());
        let mut new_ids = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(&pos) = self.fam_index.get(id) {
                indices.push(pos);
                new_ids.push(id.clone());
            }
        }
        if indices.len() < ids.len() {
            debug!(
                "Sample subset: {} of {} requested IDs present in store",
                indices.len(),
                ids.len()
            );
        }
        self.sample_subset = Some(indices);
        self.sample_ids = new_ids;
        Ok(())
    }

    fn read_marker(&mut self, index: u64) -> Result<MarkerData> {
        let idx = index as usize;
        if idx >= self.bim.len() {
            bail!("Marker index {} out of range ({})", index, self.bim.len());
        }
        let dosages = self.read_selected(idx);
        Ok(MarkerData::new(self.bim[idx].to_marker_info(), dosages))
    }

    fn marker_info(&self, index: u64) -> Result<MarkerInfo> {
        match self.bim.get(index as usize) {
            Some(entry) => Ok(entry.to_marker_info()),
            None => bail!("Marker index {} out of range ({})", index, self.bim.len()),
        }
    }
}

/// Streaming writer for a SNP-major PLINK fileset.
///
/// The .fam file is written on creation; markers are appended one at a time.
pub struct PlinkWriter {
    bed: BufWriter<File>,
    bim: BufWriter<File>,
    n_samples: usize,
    n_markers: usize,
}

impl PlinkWriter {
    pub fn create<P: AsRef<Path>>(base_path: P, samples: &[FamEntry]) -> Result<Self> {
        let base = base_path.as_ref();
        let fam_path = fileset_path(base, "fam");
        let bim_path = fileset_path(base, "bim");
        let bed_path = fileset_path(base, "bed");

        let mut fam = BufWriter::new(
            File::create(&fam_path)
                .with_context(|| format!("Failed to create fam file: {}", fam_path.display()))?,
        );
        for f in samples {
            let pheno = if f.pheno.is_nan() {
                "-9".to_string()
            } else {
                f.pheno.to_string()
            };
            writeln!(
                fam,
                "{} {} {} {} {} {}",
                f.fid, f.iid, f.father, f.mother, f.sex, pheno
            )?;
        }
        fam.flush()?;

        let bim = BufWriter::new(
            File::create(&bim_path)
                .with_context(|| format!("Failed to create bim file: {}", bim_path.display()))?,
        );
        let mut bed = BufWriter::new(
            File::create(&bed_path)
                .with_context(|| format!("Failed to create bed file: {}", bed_path.display()))?,
        );
        bed.write_all(&BED_HEADER)?;

        Ok(Self {
            bed,
            bim,
            n_samples: samples.len(),
            n_markers: 0,
        })
    }

    /// Encode a dosage into its 2-bit bed code. Anything other than 0/1/2 is missing.
    #[inline]
    fn encode_genotype(dosage: f64) -> u8 {
        if dosage == 2.0 {
            0b00
        } else if dosage == 1.0 {
            0b10
        } else if dosage == 0.0 {
            0b11
        } else {
            0b01
        }
    }

    pub fn write_marker(&mut self, entry: &BimEntry, dosages: &[f64]) -> Result<()> {
        if dosages.len() != self.n_samples {
            bail!(
                "Marker {} has {} dosages, fileset has {} samples",
                entry.id,
                dosages.len(),
                self.n_samples
            );
        }
        writeln!(
            self.bim,
            "{}\t{}\t{}\t{}\t{}\t{}",
            entry.chrom, entry.id, entry.cm, entry.pos, entry.allele1, entry.allele2
        )?;

        let mut packed = vec![0u8; self.n_samples.div_ceil(4)];
        for (i, &d) in dosages.iter().enumerate() {
            packed[i / 4] |= Self::encode_genotype(d) << ((i % 4) * 2);
        }
        self.bed.write_all(&packed)?;
        self.n_markers += 1;
        Ok(())
    }

    /// Flush all files. Returns the number of markers written.
    pub fn finish(mut self) -> Result<usize> {
        self.bed.flush()?;
        self.bim.flush()?;
        Ok(self.n_markers)
    }
}
