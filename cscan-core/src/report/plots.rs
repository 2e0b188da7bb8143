//! Plot-ready data files and their manifest.
//!
//! Nothing is rendered here. Each plot gets a TSV of the points to draw and
//! a `PlotSpec` entry (title, axes, transform, breaks) in `plots.json`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::compare::ComparisonTable;
use crate::ols::OlsMarkerResult;
use crate::score_test::ScoreTestResult;
use crate::util::math::{neg_log10, sign};

use super::tables::fmt_value;

pub const SIGNED_LOG: &str = "signed_log";

/// sign(x) * ln(|x| + 1). Compresses both tails while keeping sign and 0.
pub fn signed_log(x: f64) -> f64 {
    sign(x) * x.abs().ln_1p()
}

/// Inverse of `signed_log`: sign(y) * (e^|y| - 1).
pub fn signed_log_inverse(y: f64) -> f64 {
    sign(y) * y.abs().exp_m1()
}

/// Break magnitudes 1, 3, 10, 30, 100, ...
fn break_magnitudes() -> impl Iterator<Item = f64> {
    (0..).flat_map(|k: i32| {
        let decade = 10f64.powi(k);
        [decade, 3.0 * decade]
    })
}

/// Axis breaks {0, ±1, ±3, ±10, ±30, ...} covering [lo, hi].
///
/// The outermost break on each side is the first one at or beyond the data.
pub fn signed_log_breaks(lo: f64, hi: f64) -> Vec<f64> {
    let cover = |v: f64| -> f64 {
        if !v.is_finite() || v <= 0.0 {
            return 0.0;
        }
        break_magnitudes().find(|&m| m >= v).unwrap_or(v)
    };
    let lower = cover(-lo);
    let upper = cover(hi);

    let mut breaks: Vec<f64> = break_magnitudes()
        .take_while(|&m| m <= lower)
        .map(|m| -m)
        .collect();
    breaks.reverse();
    breaks.push(0.0);
    breaks.extend(break_magnitudes().take_while(|&m| m <= upper));
    breaks
}

#[derive(Debug, Clone, Serialize)]
pub struct Axis {
    pub column: String,
    pub label: String,
    /// Transform applied before drawing; `None` for linear.
    pub transform: Option<String>,
    /// Break positions on the original (untransformed) scale.
    pub breaks: Vec<f64>,
}

impl Axis {
    fn linear(column: &str, label: &str) -> Self {
        Self {
            column: column.to_string(),
            label: label.to_string(),
            transform: None,
            breaks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlotSpec {
    pub name: String,
    /// Data file, relative to the manifest.
    pub file: String,
    pub kind: String,
    pub title: String,
    pub x: Axis,
    pub y: Axis,
    /// Column used to colour points.
    pub colour: Option<String>,
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create plot data: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One point per individual for the selected marker.
pub struct GenotypePhenotypePoints<'a> {
    pub sample_ids: &'a [String],
    pub dosages: &'a [f64],
    pub phenotype: &'a [f64],
    pub labels: &'a [Option<String>],
}

/// Title embedding both methods' estimate and p-value for one marker.
pub fn marker_title(
    marker_id: &str,
    score: Option<&ScoreTestResult>,
    ols: Option<&OlsMarkerResult>,
) -> String {
    let score_part = match score {
        Some(s) => format!("score beta = {:.3}, p = {:.3e}", s.beta, s.pvalue),
        None => "score: not tested".to_string(),
    };
    let ols_part = match ols {
        Some(o) if o.aliased => "OLS beta = NA".to_string(),
        Some(o) => format!("OLS beta = {:.3}, p = {:.3e}", o.estimate, o.pvalue),
        None => "OLS: not fitted".to_string(),
    };
    format!("{}: {}; {}", marker_id, score_part, ols_part)
}

/// Plot (a): phenotype by genotype, coloured by covariate label.
pub fn write_phenotype_by_genotype(
    path: &Path,
    points: &GenotypePhenotypePoints<'_>,
    title: String,
) -> Result<PlotSpec> {
    let n = points.sample_ids.len();
    if points.dosages.len() != n || points.phenotype.len() != n || points.labels.len() != n {
        bail!("Plot points are not aligned: {} samples", n);
    }
    let mut w = create(path)?;
    writeln!(w, "IID\tgenotype\tphenotype\tcovariate")?;
    for i in 0..n {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            points.sample_ids[i],
            fmt_value(points.dosages[i]),
            fmt_value(points.phenotype[i]),
            points.labels[i].as_deref().unwrap_or("NA"),
        )?;
    }
    w.flush()?;

    Ok(PlotSpec {
        name: "phenotype_by_genotype".into(),
        file: file_name(path),
        kind: "boxplot".into(),
        title,
        x: Axis::linear("genotype", "Genotype dosage"),
        y: Axis::linear("phenotype", "Phenotype"),
        colour: Some("covariate".into()),
    })
}

/// Plot (b): effect size (signed-log scale) against -log10 p, both methods.
pub fn write_effect_vs_significance(
    path: &Path,
    score_rows: &[ScoreTestResult],
    ols_rows: &[OlsMarkerResult],
    confounded_id: &str,
) -> Result<PlotSpec> {
    let mut w = create(path)?;
    writeln!(
        w,
        "SNPID\tmethod\testimate\tsigned_log_estimate\tneg_log10_p\tconfounded"
    )?;
    let mut lo = 0.0f64;
    let mut hi = 0.0f64;
    let mut row = |w: &mut BufWriter<File>, id: &str, method: &str, est: f64, p: f64| -> Result<()> {
        if est.is_finite() {
            lo = lo.min(est);
            hi = hi.max(est);
        }
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            id,
            method,
            fmt_value(est),
            fmt_value(signed_log(est)),
            fmt_value(neg_log10(p)),
            id == confounded_id,
        )?;
        Ok(())
    };
    for s in score_rows {
        row(&mut w, &s.marker_id, "score", s.beta, s.pvalue)?;
    }
    for o in ols_rows {
        row(&mut w, &o.marker_id, "ols", o.estimate, o.pvalue)?;
    }
    w.flush()?;

    Ok(PlotSpec {
        name: "effect_vs_significance".into(),
        file: file_name(path),
        kind: "scatter".into(),
        title: "Effect size vs significance".into(),
        x: Axis {
            column: "estimate".into(),
            label: "Effect estimate".into(),
            transform: Some(SIGNED_LOG.into()),
            breaks: signed_log_breaks(lo, hi),
        },
        y: Axis::linear("neg_log10_p", "-log10(p)"),
        colour: Some("method".into()),
    })
}

/// Plot (c): score vs OLS -log10 p, one point per marker.
pub fn write_method_comparison(
    path: &Path,
    table: &ComparisonTable,
    title: &str,
) -> Result<PlotSpec> {
    let mut w = create(path)?;
    writeln!(
        w,
        "SNPID\tscore_neg_log10_p\tols_neg_log10_p\tscore_estimate\tols_estimate\tconfounded"
    )?;
    for r in table.records() {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            r.marker_id,
            fmt_value(r.score_neg_log10_p),
            fmt_value(r.ols_neg_log10_p),
            fmt_value(r.score_estimate),
            fmt_value(r.ols_estimate),
            r.is_confounded,
        )?;
    }
    w.flush()?;

    Ok(PlotSpec {
        name: file_name(path).trim_end_matches(".tsv").to_string(),
        file: file_name(path),
        kind: "scatter".into(),
        title: title.to_string(),
        x: Axis::linear("ols_neg_log10_p", "OLS -log10(p)"),
        y: Axis::linear("score_neg_log10_p", "Score test -log10(p)"),
        colour: Some("confounded".into()),
    })
}

pub fn write_manifest(path: &Path, plots: &[PlotSpec]) -> Result<()> {
    let json = serde_json::to_string_pretty(plots)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write plot manifest: {}", path.display()))?;
    Ok(())
}
