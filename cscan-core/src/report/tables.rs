//! Tab-separated result tables, ranked by p-value ascending.
//!
//! Missing values (NaN) are written as `NA`. Ties and NaN p-values keep
//! marker order; NaN sorts last.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::compare::ComparisonTable;
use crate::ols::OlsMarkerResult;
use crate::score_test::ScoreTestResult;

pub fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NA".to_string()
    } else {
        format!("{}", v)
    }
}

/// Rows sorted by p-value ascending; stable, NaN last.
pub fn rank_by_pvalue<T>(rows: &[T], pvalue: impl Fn(&T) -> f64) -> Vec<&T> {
    let mut ranked: Vec<&T> = rows.iter().collect();
    ranked.sort_by(|a, b| {
        let (pa, pb) = (pvalue(*a), pvalue(*b));
        let pa = if pa.is_nan() { f64::INFINITY } else { pa };
        let pb = if pb.is_nan() { f64::INFINITY } else { pb };
        pa.total_cmp(&pb)
    });
    ranked
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn write_score_results(path: &Path, rows: &[ScoreTestResult]) -> Result<()> {
    let mut w = create(path)?;
    writeln!(
        w,
        "CHR\tPOS\tSNPID\tAllele1\tAllele2\tAC_Allele2\tAF_Allele2\tMAC\tN\tScore\tVar\tTstat\tBETA\tSE\tp.value"
    )?;
    for r in rank_by_pvalue(rows, |r| r.pvalue) {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.chrom,
            r.pos,
            r.marker_id,
            r.ref_allele,
            r.alt_allele,
            fmt_value(r.ac),
            fmt_value(r.af),
            fmt_value(r.mac),
            r.n,
            fmt_value(r.score),
            fmt_value(r.var),
            fmt_value(r.tstat),
            fmt_value(r.beta),
            fmt_value(r.se_beta),
            fmt_value(r.pvalue),
        )?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_ols_results(path: &Path, rows: &[OlsMarkerResult]) -> Result<()> {
    let mut w = create(path)?;
    writeln!(
        w,
        "CHR\tPOS\tSNPID\tN\tEstimate\tSE\tt\tp.value\tAliased\tCovariateAliased"
    )?;
    for r in rank_by_pvalue(rows, |r| r.pvalue) {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.chrom,
            r.pos,
            r.marker_id,
            r.n,
            fmt_value(r.estimate),
            fmt_value(r.se),
            fmt_value(r.t_stat),
            fmt_value(r.pvalue),
            r.aliased,
            r.covariate_aliased,
        )?;
    }
    w.flush()?;
    Ok(())
}

/// Comparison rows ranked by the score test's -log10 p, strongest first.
pub fn write_comparison(path: &Path, table: &ComparisonTable) -> Result<()> {
    let mut w = create(path)?;
    writeln!(
        w,
        "SNPID\tScoreEstimate\tOlsEstimate\tScoreNegLog10P\tOlsNegLog10P\tConfounded"
    )?;
    for r in rank_by_pvalue(table.records(), |r| -r.score_neg_log10_p) {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            r.marker_id,
            fmt_value(r.score_estimate),
            fmt_value(r.ols_estimate),
            fmt_value(r.score_neg_log10_p),
            fmt_value(r.ols_neg_log10_p),
            r.is_confounded,
        )?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ols(id: &str, pvalue: f64) -> OlsMarkerResult {
        OlsMarkerResult {
            marker_id: id.into(),
            chrom: "1".into(),
            pos: 10,
            estimate: if pvalue.is_nan() { f64::NAN } else { 0.5 },
            se: 0.1,
            t_stat: 5.0,
            pvalue,
            aliased: pvalue.is_nan(),
            covariate_aliased: false,
            n: 100,
        }
    }

    #[test]
    fn test_rank_nan_last_and_stable() {
        let rows = vec![ols("a", 0.5), ols("b", f64::NAN), ols("c", 0.01), ols("d", 0.5)];
        let ranked: Vec<&str> = rank_by_pvalue(&rows, |r| r.pvalue)
            .iter()
            .map(|r| r.marker_id.as_str())
            .collect();
        assert_eq!(ranked, vec!["c", "a", "d", "b"]);
    }

    #[test]
    fn test_ols_table_writes_na() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ols_results.tsv");
        write_ols_results(&path, &[ols("a", f64::NAN), ols("b", 0.2)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("CHR\tPOS\tSNPID"));
        assert!(lines[1].contains("\tb\t"));
        let aliased: Vec<&str> = lines[2].split('\t').collect();
        assert_eq!(aliased[2], "a");
        assert_eq!(aliased[4], "NA");
        assert_eq!(aliased[8], "true");
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(f64::NAN), "NA");
        assert_eq!(fmt_value(0.25), "0.25");
    }
}
