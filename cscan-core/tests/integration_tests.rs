//! Integration tests: PLINK round trip, end-to-end analysis and reports.
//!
//! The synthetic tests build a population fileset in a temp directory, or an
//! in-memory store when no file round trip is involved.
//! The reference scenario needs the reference PLINK fileset under
//! tests/fixtures/reference/ and is skipped when it is absent.

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use cscan_core::confound::selector::qualifying_levels;
use cscan_core::pipeline::{run_analysis, AnalysisConfig, AnalysisOutcome};
use cscan_core::simulate::subsample_individuals;
use cscan_geno::memory::InMemoryReader;
use cscan_geno::plink::{BimEntry, FamEntry, PlinkReader, PlinkWriter};
use cscan_geno::GenotypeReader;

/// Helper to get the path to test fixtures.
fn fixtures_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/fixtures")
}

/// Check if test fixtures exist (skip tests gracefully if not).
fn has_fixtures() -> bool {
    Path::new(fixtures_dir())
        .join("reference/population.bed")
        .exists()
}

/// Write `n_samples` x `n_markers` random genotypes. Marker 0 is a low
/// frequency 0/1 marker guaranteed to qualify for selection.
fn write_population(base: &Path, n_samples: usize, n_markers: usize, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let fam: Vec<FamEntry> = (1..=n_samples)
        .map(|i| FamEntry {
            fid: format!("F{}", i),
            iid: format!("I{}", i),
            father: "0".into(),
            mother: "0".into(),
            sex: 0,
            pheno: -9.0,
        })
        .collect();
    let mut writer = PlinkWriter::create(base, &fam).unwrap();
    for m in 0..n_markers {
        let entry = BimEntry {
            chrom: "1".into(),
            id: format!("rs{}", m + 1),
            cm: 0.0,
            pos: 10_000 + 500 * m as u64,
            allele1: "G".into(),
            allele2: "A".into(),
        };
        let dosages: Vec<f64> = if m == 0 {
            (0..n_samples).map(|i| if i % 4 == 0 { 1.0 } else { 0.0 }).collect()
        } else {
            let af = 0.1 + 0.4 * rng.gen::<f64>();
            (0..n_samples)
                .map(|_| {
                    if rng.gen::<f64>() < 0.01 {
                        f64::NAN
                    } else {
                        (rng.gen::<f64>() < af) as u8 as f64 + (rng.gen::<f64>() < af) as u8 as f64
                    }
                })
                .collect()
        };
        writer.write_marker(&entry, &dosages).unwrap();
    }
    writer.finish().unwrap();
}

/// Subsample, persist the subset, reopen it and run the analysis.
fn reproduce(population: &Path, work: &Path, n: usize, config: &AnalysisConfig) -> AnalysisOutcome {
    let mut reader = PlinkReader::new(population).unwrap();
    let ids = subsample_individuals(reader.sample_ids(), n, &mut ChaCha8Rng::seed_from_u64(32))
        .unwrap();
    reader.set_sample_subset(&ids).unwrap();
    let subset = work.join("subset");
    reader.write_subset(&subset).unwrap();
    drop(reader);

    let mut reader = PlinkReader::new(&subset).unwrap();
    assert_eq!(reader.n_samples(), n);
    run_analysis(&mut reader, config).unwrap()
}

mod synthetic_population {
    use super::*;

    #[test]
    fn test_end_to_end_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let population = dir.path().join("population");
        write_population(&population, 400, 60, 7);

        let outcome = reproduce(&population, dir.path(), 150, &AnalysisConfig::default());

        // Selection qualifies on the sampled individuals.
        assert!(qualifying_levels(&outcome.selection.marker.dosages).is_some());
        assert_eq!(outcome.selection.sample_ids.len(), 150);

        // Every tested marker is in both scans and the comparison.
        assert_eq!(outcome.score_results.len(), outcome.ols_results.len());
        assert_eq!(outcome.comparison.len(), outcome.score_results.len());
        assert_eq!(
            outcome.score_results.len() + outcome.n_skipped_monomorphic,
            60
        );

        let confounded = outcome.comparison.confounded().unwrap();
        assert_eq!(confounded.marker_id, outcome.confounded_id());
        assert!(outcome.confounded_ols().unwrap().covariate_aliased);
        for p in outcome.score_results.iter().map(|r| r.pvalue) {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_other_markers_agree() {
        let dir = tempfile::tempdir().unwrap();
        let population = dir.path().join("population");
        write_population(&population, 300, 40, 11);

        let outcome = reproduce(&population, dir.path(), 150, &AnalysisConfig::default());
        let others = outcome.comparison.without(outcome.confounded_id());
        assert_eq!(others.len() + 1, outcome.comparison.len());
        assert!(
            others.max_neg_log10_discrepancy() < 1.0,
            "max discrepancy {}",
            others.max_neg_log10_discrepancy()
        );
        for r in others.records() {
            assert!(!r.is_confounded);
        }
        let summary = others.summary();
        assert!(summary.neg_log10_correlation > 0.9);
    }

    #[test]
    fn test_same_seeds_reproduce() {
        let dir = tempfile::tempdir().unwrap();
        let population = dir.path().join("population");
        write_population(&population, 250, 25, 3);

        let config = AnalysisConfig::default();
        let a = reproduce(&population, dir.path(), 120, &config);
        let b = reproduce(&population, dir.path(), 120, &config);
        assert_eq!(a.confounded_id(), b.confounded_id());
        assert_eq!(a.phenotype.phenotype, b.phenotype.phenotype);
        let ea: Vec<f64> = a.ols_results.iter().map(|r| r.estimate).collect();
        let eb: Vec<f64> = b.ols_results.iter().map(|r| r.estimate).collect();
        assert_eq!(format!("{:?}", ea), format!("{:?}", eb));
    }
}

/// 150 x 30 in-memory store. Marker 0 is 1 in every 4th individual and 0
/// elsewhere; every other marker carries all three dosages so only marker 0
/// can be selected.
fn collinear_store(seed: u64) -> InMemoryReader {
    let n = 150;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = vec![(0..n).map(|i| if i % 4 == 0 { 1.0 } else { 0.0 }).collect::<Vec<f64>>()];
    for _ in 1..30 {
        let af = 0.2 + 0.3 * rng.gen::<f64>();
        let mut row: Vec<f64> = (0..n)
            .map(|_| (rng.gen::<f64>() < af) as u8 as f64 + (rng.gen::<f64>() < af) as u8 as f64)
            .collect();
        row[0] = 0.0;
        row[1] = 1.0;
        row[2] = 2.0;
        rows.push(row);
    }
    InMemoryReader::from_rows(rows).unwrap()
}

mod collinear_outlier {
    use super::*;

    fn run(pheno_seed: u64) -> AnalysisOutcome {
        let config = AnalysisConfig {
            pheno_seed,
            ..AnalysisConfig::default()
        };
        run_analysis(&mut collinear_store(5), &config).unwrap()
    }

    #[test]
    fn test_variance_collapses_for_every_phenotype() {
        for pheno_seed in 0..20 {
            let outcome = run(pheno_seed);
            assert_eq!(outcome.confounded_id(), "m0");
            let confounded = outcome.confounded_score().unwrap();
            assert!(confounded.var < 1e-12, "seed {}: var = {}", pheno_seed, confounded.var);
            assert!(outcome.confounded_ols().unwrap().covariate_aliased);

            let others = outcome
                .score_results
                .iter()
                .filter(|r| r.marker_id != "m0")
                .map(|r| r.var)
                .fold(f64::INFINITY, f64::min);
            assert!(others > 1e-3, "seed {}: smallest other var = {}", pheno_seed, others);
        }
    }

    /// Whether the collapsed variance turns into a tiny p-value depends on
    /// the rounding error left in the residuals, so the phenotype seed is
    /// searched and then pinned.
    #[test]
    fn test_confounded_marker_becomes_the_outlier() {
        let hit = (0..1000u64).find(|&seed| {
            let outcome = run(seed);
            let score_p = outcome.confounded_score().unwrap().pvalue;
            let ols_p = outcome.confounded_ols().unwrap().pvalue;
            score_p < ols_p * 1e-3
        });
        let pheno_seed = hit.expect("no phenotype seed in 0..1000 produced the outlier");

        let outcome = run(pheno_seed);
        let score_p = outcome.confounded_score().unwrap().pvalue;
        let ols_p = outcome.confounded_ols().unwrap().pvalue;
        assert!(
            score_p < ols_p * 1e-3,
            "seed {}: score p = {}, OLS p = {}",
            pheno_seed,
            score_p,
            ols_p
        );

        // Same seed, same numbers.
        let again = run(pheno_seed);
        assert_eq!(
            again.confounded_score().unwrap().pvalue.to_bits(),
            score_p.to_bits()
        );

        let full = outcome.comparison.max_neg_log10_discrepancy();
        let without = outcome
            .comparison
            .without(outcome.confounded_id())
            .max_neg_log10_discrepancy();
        assert!(full >= 3.0, "seed {}: full = {}", pheno_seed, full);
        assert!(
            full >= 10.0 * without,
            "seed {}: full = {}, without = {}",
            pheno_seed,
            full,
            without
        );
    }
}

mod reports {
    use super::*;
    use cscan_core::report::plots::{
        marker_title, write_effect_vs_significance, write_manifest, write_method_comparison,
        write_phenotype_by_genotype, GenotypePhenotypePoints,
    };
    use cscan_core::report::{write_comparison, write_ols_results, write_score_results};

    #[test]
    fn test_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let population = dir.path().join("population");
        write_population(&population, 200, 20, 5);
        let outcome = reproduce(&population, dir.path(), 100, &AnalysisConfig::default());
        let out = dir.path();

        write_score_results(&out.join("score_results.tsv"), &outcome.score_results).unwrap();
        write_ols_results(&out.join("ols_results.tsv"), &outcome.ols_results).unwrap();
        write_comparison(&out.join("comparison.tsv"), &outcome.comparison).unwrap();

        let ids = &outcome.null_model.sample_ids;
        let labels = outcome.covariate.labels_for(ids);
        let points = GenotypePhenotypePoints {
            sample_ids: ids,
            dosages: &outcome.confounded_marker.dosages,
            phenotype: &outcome.null_model.y,
            labels: &labels,
        };
        let title = marker_title(
            outcome.confounded_id(),
            outcome.confounded_score(),
            outcome.confounded_ols(),
        );
        let plots = vec![
            write_phenotype_by_genotype(&out.join("plot_phenotype_by_genotype.tsv"), &points, title)
                .unwrap(),
            write_effect_vs_significance(
                &out.join("plot_effect_vs_significance.tsv"),
                &outcome.score_results,
                &outcome.ols_results,
                outcome.confounded_id(),
            )
            .unwrap(),
            write_method_comparison(
                &out.join("plot_method_comparison.tsv"),
                &outcome.comparison,
                "all markers",
            )
            .unwrap(),
        ];
        write_manifest(&out.join("plots.json"), &plots).unwrap();

        let score = std::fs::read_to_string(out.join("score_results.tsv")).unwrap();
        assert_eq!(score.lines().count(), outcome.score_results.len() + 1);
        let pvalues: Vec<f64> = score
            .lines()
            .skip(1)
            .map(|l| l.split('\t').last().unwrap().parse().unwrap())
            .collect();
        assert!(pvalues.windows(2).all(|w| w[0] <= w[1]));

        let pheno_plot = std::fs::read_to_string(out.join("plot_phenotype_by_genotype.tsv")).unwrap();
        assert_eq!(pheno_plot.lines().count(), ids.len() + 1);

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("plots.json")).unwrap()).unwrap();
        assert_eq!(manifest.as_array().unwrap().len(), 3);
        assert_eq!(manifest[1]["x"]["transform"], "signed_log");
        assert!(manifest[0]["title"]
            .as_str()
            .unwrap()
            .starts_with(outcome.confounded_id()));
    }
}

mod reference_scenario {
    use super::*;

    #[test]
    #[ignore] // Needs the reference fileset. Run with `cargo test -- --ignored`
    fn test_confounded_marker_is_the_outlier() {
        if !has_fixtures() {
            eprintln!("Skipping: test fixtures not found");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let population = Path::new(fixtures_dir()).join("reference/population");
        let config = AnalysisConfig {
            marker_seed: 32,
            pheno_seed: 28,
            ..AnalysisConfig::default()
        };
        let outcome = reproduce(&population, dir.path(), 150, &config);

        let score_p = outcome.confounded_score().unwrap().pvalue;
        let ols_p = outcome.confounded_ols().unwrap().pvalue;
        assert!(
            score_p < ols_p * 1e-3,
            "score p = {}, OLS p = {}",
            score_p,
            ols_p
        );

        let full = outcome.comparison.max_neg_log10_discrepancy();
        let without = outcome
            .comparison
            .without(outcome.confounded_id())
            .max_neg_log10_discrepancy();
        assert!(full >= 10.0 * without, "full = {}, without = {}", full, without);
    }
}
