//! Full reproduction run.
//!
//! cscan reproduce --plink-file ... --output-dir ... [--n-individuals 150]
//!     [--subset-seed 32] [--marker-seed 32] [--pheno-seed 28]

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use tracing::{info, warn};

use cscan_core::confound::selector::DEFAULT_MAX_ATTEMPTS;
use cscan_core::model::serialization::{model_summary, save_model_json};
use cscan_core::pipeline::{run_analysis, AnalysisConfig, AnalysisOutcome, COVARIATE_NAME, DEFAULT_BLOCK_SIZE};
use cscan_core::report::plots::{
    marker_title, write_effect_vs_significance, write_manifest, write_method_comparison,
    write_phenotype_by_genotype, GenotypePhenotypePoints,
};
use cscan_core::report::{write_comparison, write_ols_results, write_score_results};
use cscan_geno::phenotype::{write_phenotype_file, CategoricalColumn};
use cscan_geno::plink::PlinkReader;
use cscan_geno::GenotypeReader;

use super::subset::write_subsample;

#[derive(Args)]
pub struct ReproduceArgs {
    /// PLINK file prefix (bed/bim/fam) of the population
    #[arg(long)]
    plink_file: String,

    /// Output directory
    #[arg(long)]
    output_dir: String,

    /// Number of individuals to subsample
    #[arg(long, default_value = "150")]
    n_individuals: usize,

    /// Seed for individual subsampling
    #[arg(long, default_value = "32")]
    subset_seed: u64,

    /// Seed for confounded-marker selection
    #[arg(long, default_value = "32")]
    marker_seed: u64,

    /// Seed for phenotype simulation
    #[arg(long, default_value = "28")]
    pheno_seed: u64,

    /// Mean of the simulated phenotype
    #[arg(long, default_value = "150")]
    pheno_mean: f64,

    /// Standard deviation of the simulated phenotype
    #[arg(long, default_value = "50")]
    pheno_sd: f64,

    /// Maximum marker draws before selection gives up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: usize,

    /// Markers read and tested per batch
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,
}

pub fn run(args: ReproduceArgs) -> Result<()> {
    info!("=== cscan: Reproduce confounded-covariate association ===");
    info!("PLINK file: {}", args.plink_file);
    info!(
        "Seeds: subset {}, marker {}, phenotype {}",
        args.subset_seed, args.marker_seed, args.pheno_seed
    );

    let out = Path::new(&args.output_dir);
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory: {}", out.display()))?;

    // Subsample, persist, and reopen the subset as the analysis store.
    let subset_base = out.join("subset");
    write_subsample(&args.plink_file, args.n_individuals, args.subset_seed, &subset_base)?;
    let mut plink = PlinkReader::new(&subset_base)?;
    info!(
        "Analysis store: {} markers x {} samples",
        plink.n_markers(),
        plink.n_samples()
    );

    let config = AnalysisConfig {
        marker_seed: args.marker_seed,
        pheno_seed: args.pheno_seed,
        pheno_mean: args.pheno_mean,
        pheno_sd: args.pheno_sd,
        max_attempts: args.max_attempts,
        block_size: args.block_size,
    };
    let outcome = run_analysis(&mut plink, &config)?;
    info!("{}", model_summary(&outcome.null_model));

    write_outputs(&outcome, out)?;
    info!("Results written to {}", out.display());
    Ok(())
}

/// Write every table, plot file and sidecar for one analysis.
pub fn write_outputs(outcome: &AnalysisOutcome, out: &Path) -> Result<()> {
    let labels = outcome.covariate.labels_for(&outcome.phenotype.sample_ids);
    write_phenotype_file(
        &out.join("phenotype.tsv"),
        "pheno",
        &outcome.phenotype,
        &[CategoricalColumn {
            name: COVARIATE_NAME,
            values: &labels,
        }],
    )?;
    save_model_json(&outcome.null_model, &out.join("null_model.json"))?;

    write_score_results(&out.join("score_results.tsv"), &outcome.score_results)?;
    write_ols_results(&out.join("ols_results.tsv"), &outcome.ols_results)?;
    write_comparison(&out.join("comparison.tsv"), &outcome.comparison)?;

    let confounded_id = outcome.confounded_id();
    let model_ids = &outcome.null_model.sample_ids;
    let model_labels = outcome.covariate.labels_for(model_ids);
    let points = GenotypePhenotypePoints {
        sample_ids: model_ids,
        dosages: &outcome.confounded_marker.dosages,
        phenotype: &outcome.null_model.y,
        labels: &model_labels,
    };
    let title = marker_title(
        confounded_id,
        outcome.confounded_score(),
        outcome.confounded_ols(),
    );
    let without = outcome.comparison.without(confounded_id);
    let plots = vec![
        write_phenotype_by_genotype(&out.join("plot_phenotype_by_genotype.tsv"), &points, title)?,
        write_effect_vs_significance(
            &out.join("plot_effect_vs_significance.tsv"),
            &outcome.score_results,
            &outcome.ols_results,
            confounded_id,
        )?,
        write_method_comparison(
            &out.join("plot_method_comparison.tsv"),
            &outcome.comparison,
            "Score test vs OLS, all markers",
        )?,
        write_method_comparison(
            &out.join("plot_method_comparison_without_outlier.tsv"),
            &without,
            &format!("Score test vs OLS, without {}", confounded_id),
        )?,
    ];
    write_manifest(&out.join("plots.json"), &plots)?;

    let all = outcome.comparison.summary();
    let rest = without.summary();
    match outcome.comparison.confounded() {
        Some(r) => info!(
            "{}: score -log10 p = {:.2}, OLS -log10 p = {:.2}",
            confounded_id, r.score_neg_log10_p, r.ols_neg_log10_p
        ),
        None => warn!("{} was not tested", confounded_id),
    }
    info!(
        "Max -log10 p discrepancy: {:.3} with, {:.3} without the selected marker",
        all.max_neg_log10_discrepancy, rest.max_neg_log10_discrepancy
    );

    let agreement = json!({
        "confounded_marker": confounded_id,
        "selection_attempts": outcome.selection.attempts,
        "skipped_monomorphic": outcome.n_skipped_monomorphic,
        "confounded": outcome.comparison.confounded(),
        "all_markers": all,
        "without_confounded": rest,
    });
    let path = out.join("agreement.json");
    std::fs::write(&path, serde_json::to_string_pretty(&agreement)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
