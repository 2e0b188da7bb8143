//! Property-based tests using proptest.
//!
//! These tests verify invariants that must hold for all valid inputs:
//!   - selected markers satisfy the qualification predicate
//!   - covariate labels are a pure function of dosage
//!   - the null model agrees with OLS on the covariate alone
//!   - p-values stay in [0, 1]
//!   - the simulated phenotype is independent of genotype

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use cscan_core::compare::{ComparisonRecord, ComparisonTable};
use cscan_core::confound::selector::{qualifying_levels, MIN_DOSAGE_SUM};
use cscan_core::confound::{select_confounded_marker, CovariateLabel, CovariateTable};
use cscan_core::model::null_model::{design_with_intercept, fit_null_model};
use cscan_core::ols;
use cscan_core::report::{signed_log, signed_log_inverse};
use cscan_core::score_test::ScoreTestEngine;
use cscan_core::simulate::simulate_phenotype;
use cscan_core::util::math::pearson_correlation;
use cscan_geno::memory::InMemoryReader;
use cscan_geno::{MarkerData, MarkerInfo};

fn ids(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("S{}", i)).collect()
}

/// Random dosage row: 0/1/2 by allele frequency, some missing.
fn random_row(rng: &mut ChaCha8Rng, n: usize, af: f64, missing: f64) -> Vec<f64> {
    (0..n)
        .map(|_| {
            if rng.gen::<f64>() < missing {
                f64::NAN
            } else {
                (rng.gen::<f64>() < af) as u8 as f64 + (rng.gen::<f64>() < af) as u8 as f64
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 1. Any returned selection has two levels and a dosage sum >= 10
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_selection_qualifies(
        n in 20usize..80,
        n_markers in 1usize..15,
        seed in 0u64..1000,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut rows: Vec<Vec<f64>> = (0..n_markers)
            .map(|_| {
                let af = rng.gen::<f64>() * 0.5;
                random_row(&mut rng, n, af, 0.05)
            })
            .collect();
        // One marker that always qualifies: 10 x dosage 1, rest 0.
        rows.push((0..n).map(|i| if i < 10 { 1.0 } else { 0.0 }).collect());
        let mut reader = InMemoryReader::from_rows(rows).unwrap();

        let selection = select_confounded_marker(&mut reader, &mut rng, 100_000).unwrap();
        let observed: Vec<f64> = selection
            .marker
            .dosages
            .iter()
            .copied()
            .filter(|d| !d.is_nan())
            .collect();
        let mut distinct = observed.clone();
        distinct.sort_by(|a, b| a.total_cmp(b));
        distinct.dedup();
        prop_assert_eq!(distinct.len(), 2);
        prop_assert!(observed.iter().sum::<f64>() >= MIN_DOSAGE_SUM);
        prop_assert_eq!(selection.levels, (distinct[0], distinct[1]));
    }

    #[test]
    fn prop_predicate_matches_definition(
        dosages in prop::collection::vec(prop_oneof![Just(0.0), Just(1.0), Just(2.0), Just(f64::NAN)], 0..40),
    ) {
        let observed: Vec<f64> = dosages.iter().copied().filter(|d| !d.is_nan()).collect();
        let mut distinct = observed.clone();
        distinct.sort_by(|a, b| a.total_cmp(b));
        distinct.dedup();
        let expected = distinct.len() == 2 && observed.iter().sum::<f64>() >= MIN_DOSAGE_SUM;
        prop_assert_eq!(qualifying_levels(&dosages).is_some(), expected);
    }
}

// ---------------------------------------------------------------------------
// 2. Covariate label is a pure function of dosage; lower level is "A"
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_covariate_is_function_of_dosage(
        levels in prop_oneof![Just((0.0, 1.0)), Just((0.0, 2.0)), Just((1.0, 2.0))],
        picks in prop::collection::vec(0u8..3, 2..60),
    ) {
        let mut dosages: Vec<f64> = picks
            .iter()
            .map(|&p| match p {
                0 => levels.0,
                1 => levels.1,
                _ => f64::NAN,
            })
            .collect();
        // Both levels present.
        dosages[0] = levels.0;
        dosages[1] = levels.1;
        let sample_ids = ids(dosages.len());
        let table = CovariateTable::from_dosages(&sample_ids, &dosages).unwrap();

        for (id, &d) in sample_ids.iter().zip(dosages.iter()) {
            let label = table.label(id);
            if d.is_nan() {
                prop_assert_eq!(label, None);
            } else if d == levels.0 {
                prop_assert_eq!(label, Some(CovariateLabel::A));
            } else {
                prop_assert_eq!(label, Some(CovariateLabel::B));
            }
        }
        prop_assert!(CovariateLabel::A < CovariateLabel::B);
    }
}

// ---------------------------------------------------------------------------
// 3. Null model covariate effect equals OLS on the covariate alone
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_null_model_matches_ols(
        n in 6usize..200,
        seed in 0u64..10_000,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut b: Vec<f64> = (0..n).map(|_| (rng.gen::<f64>() < 0.4) as u8 as f64).collect();
        b[0] = 0.0;
        b[1] = 1.0;
        let y = simulate_phenotype(&ids(n), 150.0, 50.0, &mut rng).unwrap().phenotype;

        let (x, terms) = design_with_intercept(&[("covar", b.as_slice())]);
        let model = fit_null_model(ids(n), y.clone(), &x, terms).unwrap();
        let fit = ols::fit(&y, &[("covar", b.as_slice())]).unwrap();

        for name in ["(Intercept)", "covar"] {
            let fe = model.fixed_effect(name).unwrap();
            let c = fit.coefficient(name).unwrap();
            prop_assert!((fe.estimate - c.estimate).abs() < 1e-8, "{}: {} vs {}", name, fe.estimate, c.estimate);
            prop_assert!((fe.se - c.se).abs() < 1e-8);
            prop_assert!((fe.pvalue - c.pvalue).abs() < 1e-8);
        }
        prop_assert!((model.sigma2 - fit.sigma2).abs() < 1e-8 * model.sigma2.max(1.0));
    }
}

// ---------------------------------------------------------------------------
// 4. Score test p-values must be in [0, 1]
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_score_test_pvalue_in_unit_interval(
        n in 10usize..100,
        af in 0.05f64..0.5,
        seed in 0u64..1000,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut b: Vec<f64> = (0..n).map(|_| (rng.gen::<f64>() < 0.5) as u8 as f64).collect();
        b[0] = 0.0;
        b[1] = 1.0;
        let y = simulate_phenotype(&ids(n), 150.0, 50.0, &mut rng).unwrap().phenotype;
        let (x, terms) = design_with_intercept(&[("covar", b.as_slice())]);
        let model = fit_null_model(ids(n), y, &x, terms).unwrap();
        let engine = ScoreTestEngine::from_null_model(&model);

        let info = MarkerInfo {
            chrom: "1".into(),
            pos: 1,
            id: "rs1".into(),
            ref_allele: "A".into(),
            alt_allele: "G".into(),
        };
        let g = random_row(&mut rng, n, af, 0.02);
        let result = engine.test_marker(&MarkerData::new(info, g)).unwrap();
        prop_assert!(result.pvalue >= 0.0 && result.pvalue <= 1.0, "p = {}", result.pvalue);
        prop_assert!(result.tstat >= 0.0);
    }
}

// ---------------------------------------------------------------------------
// 5. Signed-log transform is invertible and monotone
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_signed_log_roundtrip(x in -1e8f64..1e8, y in -1e8f64..1e8) {
        let back = signed_log_inverse(signed_log(x));
        prop_assert!((back - x).abs() <= 1e-9 * (1.0 + x.abs()));
        if x < y {
            prop_assert!(signed_log(x) <= signed_log(y));
        }
    }
}

// ---------------------------------------------------------------------------
// 6. Dropping the outlier shrinks the maximum discrepancy
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_exclusion_restores_agreement(
        n in 5usize..200,
        outlier in 20.0f64..300.0,
        seed in 0u64..1000,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut records: Vec<ComparisonRecord> = (0..n)
            .map(|i| {
                let p = rng.gen::<f64>() * 3.0;
                let b = rng.gen::<f64>() * 4.0 - 2.0;
                ComparisonRecord {
                    marker_id: format!("m{}", i),
                    score_estimate: b,
                    ols_estimate: b * (1.0 + 0.01 * (rng.gen::<f64>() - 0.5)),
                    score_neg_log10_p: p,
                    ols_neg_log10_p: p + 0.1 * (rng.gen::<f64>() - 0.5),
                    is_confounded: false,
                }
            })
            .collect();
        records.push(ComparisonRecord {
            marker_id: "conf".into(),
            score_estimate: 1e12,
            ols_estimate: 3.0,
            score_neg_log10_p: outlier,
            ols_neg_log10_p: 0.4,
            is_confounded: true,
        });
        let table = ComparisonTable::new(records);
        let without = table.without("conf");
        prop_assert_eq!(without.len(), n);
        prop_assert!(table.max_neg_log10_discrepancy() >= 10.0 * without.max_neg_log10_discrepancy());
    }
}

// ---------------------------------------------------------------------------
// Phenotype independence: mean correlation with a fixed marker is ~0
// ---------------------------------------------------------------------------
#[test]
fn test_phenotype_uncorrelated_with_fixed_marker() {
    let n = 150;
    let mut geno_rng = ChaCha8Rng::seed_from_u64(32);
    let g = random_row(&mut geno_rng, n, 0.3, 0.0);
    let sample_ids = ids(n);

    let reps = 200;
    let mut total = 0.0;
    for rep in 0..reps {
        let mut rng = ChaCha8Rng::seed_from_u64(28 + rep);
        let y = simulate_phenotype(&sample_ids, 150.0, 50.0, &mut rng)
            .unwrap()
            .phenotype;
        total += pearson_correlation(&g, &y);
    }
    let mean = total / reps as f64;
    // One replicate has sd ~ 1/sqrt(150); the mean over 200 has sd ~ 0.006.
    assert!(mean.abs() < 0.03, "mean correlation = {}", mean);
}
