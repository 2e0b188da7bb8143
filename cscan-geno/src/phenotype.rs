//! Phenotype table I/O.
//!
//! Tab/space-delimited files with a sample ID column, one numeric phenotype
//! column and optional categorical covariate columns. Missing values are
//! written as `NA` and read back as NaN / `None`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

/// Phenotype values keyed by sample, in file order.
#[derive(Debug, Clone, Default)]
pub struct PhenotypeData {
    /// Sample IDs in file order.
    pub sample_ids: Vec<String>,
    /// Phenotype values (NaN for missing).
    pub phenotype: Vec<f64>,
}

/// A named categorical column aligned with a `PhenotypeData`.
#[derive(Debug, Clone, Copy)]
pub struct CategoricalColumn<'a> {
    pub name: &'a str,
    pub values: &'a [Option<String>],
}

/// Parse a phenotype file.
///
/// # Arguments
/// - `path`: Path to the TSV file
/// - `pheno_col`: Name of the phenotype column
/// - `sample_id_col`: Name of the sample ID column (usually "IID")
pub fn parse_phenotype_file(
    path: &Path,
    pheno_col: &str,
    sample_id_col: &str,
) -> Result<PhenotypeData> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read phenotype file: {}", path.display()))?;

    let mut lines = contents.lines();
    let header_line = lines
        .next()
        .ok_or_else(|| anyhow!("Empty phenotype file"))?;

    let delim = if header_line.contains('\t') { '\t' } else { ' ' };
    let headers: Vec<&str> = header_line.split(delim).map(|s| s.trim()).collect();

    let id_idx = headers
        .iter()
        .position(|&h| h == sample_id_col)
        .ok_or_else(|| anyhow!("Sample ID column '{}' not found in header", sample_id_col))?;
    let pheno_idx = headers
        .iter()
        .position(|&h| h == pheno_col)
        .ok_or_else(|| anyhow!("Phenotype column '{}' not found in header", pheno_col))?;

    let mut data = PhenotypeData::default();
    for (line_num, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(delim).map(|s| s.trim()).collect();
        if fields.len() <= id_idx.max(pheno_idx) {
            bail!(
                "Line {} has too few fields (expected at least {})",
                line_num + 2,
                id_idx.max(pheno_idx) + 1
            );
        }
        data.sample_ids.push(fields[id_idx].to_string());
        data.phenotype.push(parse_value(fields[pheno_idx]));
    }

    Ok(data)
}

/// Parse a string value to f64, treating NA/missing as NaN.
fn parse_value(s: &str) -> f64 {
    match s {
        "NA" | "na" | "Na" | "." | "" | "-" | "NaN" | "nan" => f64::NAN,
        _ => s.parse().unwrap_or(f64::NAN),
    }
}

/// Write a phenotype table with an `IID` column, the phenotype, and any
/// categorical covariates.
pub fn write_phenotype_file(
    path: &Path,
    pheno_col: &str,
    data: &PhenotypeData,
    covariates: &[CategoricalColumn<'_>],
) -> Result<()> {
    for c in covariates {
        if c.values.len() != data.sample_ids.len() {
            bail!(
                "Covariate '{}' has {} values for {} samples",
                c.name,
                c.values.len(),
                data.sample_ids.len()
            );
        }
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create phenotype file: {}", path.display()))?;
    let mut w = BufWriter::new(file);

    write!(w, "IID\t{}", pheno_col)?;
    for c in covariates {
        write!(w, "\t{}", c.name)?;
    }
    writeln!(w)?;

    for (i, id) in data.sample_ids.iter().enumerate() {
        let v = data.phenotype[i];
        if v.is_nan() {
            write!(w, "{}\tNA", id)?;
        } else {
            write!(w, "{}\t{}", id, v)?;
        }
        for c in covariates {
            write!(w, "\t{}", c.values[i].as_deref().unwrap_or("NA"))?;
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}
