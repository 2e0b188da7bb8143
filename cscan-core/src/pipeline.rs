//! End-to-end analysis on an open genotype store.
//!
//! select marker -> covariate -> phenotype -> ID join -> null model ->
//! score scan and OLS scan over every marker -> comparison.

use anyhow::{bail, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use cscan_geno::phenotype::PhenotypeData;
use cscan_geno::sample::intersect_samples;
use cscan_geno::{GenotypeReader, MarkerData};

use crate::compare::{compare, ComparisonTable};
use crate::confound::{select_confounded_marker, ConfoundedSelection, CovariateTable};
use crate::confound::selector::DEFAULT_MAX_ATTEMPTS;
use crate::model::null_model::design_with_intercept;
use crate::model::{fit_null_model, NullModel};
use crate::ols::{OlsMarkerResult, OlsScan};
use crate::score_test::{ScoreTestEngine, ScoreTestResult};
use crate::simulate::{simulate_phenotype, DEFAULT_PHENO_MEAN, DEFAULT_PHENO_SD};

/// Markers with a minor allele count below this are not tested.
pub const MIN_MAC: f64 = 0.5;

/// Term name of the synthesized covariate.
pub const COVARIATE_NAME: &str = "covar";

pub const DEFAULT_BLOCK_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub marker_seed: u64,
    pub pheno_seed: u64,
    pub pheno_mean: f64,
    pub pheno_sd: f64,
    pub max_attempts: usize,
    /// Markers read and tested per batch.
    pub block_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            marker_seed: 32,
            pheno_seed: 28,
            pheno_mean: DEFAULT_PHENO_MEAN,
            pheno_sd: DEFAULT_PHENO_SD,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

pub struct AnalysisOutcome {
    pub selection: ConfoundedSelection,
    pub covariate: CovariateTable,
    /// Phenotype for every individual in the store subset at selection time.
    pub phenotype: PhenotypeData,
    pub null_model: NullModel,
    /// Selected marker re-read on the analysis sample (null model order).
    pub confounded_marker: MarkerData,
    pub score_results: Vec<ScoreTestResult>,
    pub ols_results: Vec<OlsMarkerResult>,
    pub comparison: ComparisonTable,
    /// Markers skipped by both scans for MAC < `MIN_MAC`.
    pub n_skipped_monomorphic: usize,
}

impl AnalysisOutcome {
    pub fn confounded_id(&self) -> &str {
        self.selection.marker_id()
    }

    pub fn confounded_score(&self) -> Option<&ScoreTestResult> {
        let id = self.confounded_id();
        self.score_results.iter().find(|r| r.marker_id == id)
    }

    pub fn confounded_ols(&self) -> Option<&OlsMarkerResult> {
        let id = self.confounded_id();
        self.ols_results.iter().find(|r| r.marker_id == id)
    }
}

/// Run the full analysis with seeded marker selection and phenotype draws.
///
/// The reader's current sample subset is the population: selection and
/// phenotype simulation both see exactly those individuals.
pub fn run_analysis<G>(reader: &mut G, config: &AnalysisConfig) -> Result<AnalysisOutcome>
where
    G: GenotypeReader + ?Sized,
{
    let mut marker_rng = ChaCha8Rng::seed_from_u64(config.marker_seed);
    let selection = select_confounded_marker(reader, &mut marker_rng, config.max_attempts)?;
    let covariate = CovariateTable::from_selection(&selection)?;
    let (n_a, n_b) = covariate.counts();
    info!(
        "Covariate from {}: {} x A ({}), {} x B ({})",
        selection.marker_id(),
        n_a,
        selection.levels.0,
        n_b,
        selection.levels.1
    );

    let mut pheno_rng = ChaCha8Rng::seed_from_u64(config.pheno_seed);
    let phenotype = simulate_phenotype(
        reader.sample_ids(),
        config.pheno_mean,
        config.pheno_sd,
        &mut pheno_rng,
    )?;

    analyze(reader, selection, covariate, phenotype, config.block_size)
}

/// Fit the null model and run both scans for a given selection and phenotype.
pub fn analyze<G>(
    reader: &mut G,
    selection: ConfoundedSelection,
    covariate: CovariateTable,
    phenotype: PhenotypeData,
    block_size: usize,
) -> Result<AnalysisOutcome>
where
    G: GenotypeReader + ?Sized,
{
    // Inner join of store, phenotype and covariate on individual ID.
    let store_ids = reader.sample_ids().to_vec();
    let joined = intersect_samples(&[&store_ids, &phenotype.sample_ids, covariate.ids()]);
    let y_joined = joined.gather(1, &phenotype.phenotype);
    let (ids, y): (Vec<String>, Vec<f64>) = joined
        .ids
        .into_iter()
        .zip(y_joined)
        .filter(|(_, y)| !y.is_nan())
        .unzip();
    if ids.is_empty() {
        bail!("No individual has genotype, phenotype and covariate");
    }
    let dropped = store_ids.len() - ids.len();
    if dropped > 0 {
        debug!("Join dropped {} individuals", dropped);
    }

    reader.set_sample_subset(&ids)?;
    let (ids, indicator) = covariate.indicator_for(reader.sample_ids());
    if ids.len() != y.len() {
        bail!(
            "Store subset has {} individuals, expected {}",
            ids.len(),
            y.len()
        );
    }
    info!("Analysis sample: {} individuals", ids.len());

    let (x, terms) = design_with_intercept(&[(COVARIATE_NAME, indicator.as_slice())]);
    let null_model = fit_null_model(ids, y.clone(), &x, terms)?;
    info!(
        "Null model: sigma2 = {:.4}, df = {}",
        null_model.sigma2, null_model.df_resid
    );

    let engine = ScoreTestEngine::from_null_model(&null_model);
    let ols = OlsScan::new(y, indicator, COVARIATE_NAME);

    let n_markers = reader.n_markers() as u64;
    let block_size = block_size.max(1) as u64;
    let mut score_results = Vec::with_capacity(n_markers as usize);
    let mut ols_results = Vec::with_capacity(n_markers as usize);
    let mut n_skipped = 0usize;

    let mut start = 0u64;
    while start < n_markers {
        let end = (start + block_size).min(n_markers);
        let mut block = Vec::with_capacity((end - start) as usize);
        for index in start..end {
            let marker = reader.read_marker(index)?;
            if marker.mac < MIN_MAC {
                n_skipped += 1;
                continue;
            }
            block.push(marker);
        }
        score_results.extend(engine.test_block(&block)?);
        ols_results.extend(ols.fit_block(&block)?);
        debug!("Tested markers {}..{}", start, end);
        start = end;
    }
    info!(
        "Tested {} markers, skipped {} with MAC < {}",
        score_results.len(),
        n_skipped,
        MIN_MAC
    );

    let confounded_marker = reader.read_marker(selection.marker_index)?;
    let comparison = compare(&score_results, &ols_results, selection.marker_id());
    match comparison.confounded() {
        Some(r) => info!(
            "Selected marker {}: score -log10 p = {:.2}, OLS -log10 p = {:.2}",
            r.marker_id, r.score_neg_log10_p, r.ols_neg_log10_p
        ),
        None => warn!(
            "Selected marker {} is not in the comparison",
            selection.marker_id()
        ),
    }

    Ok(AnalysisOutcome {
        selection,
        covariate,
        phenotype,
        null_model,
        confounded_marker,
        score_results,
        ols_results,
        comparison,
        n_skipped_monomorphic: n_skipped,
    })
}
