//! Subsample individuals into a new PLINK fileset.
//!
//! cscan subset --plink-file ... --n-individuals 150 --seed 32 --output-prefix ...

use std::path::Path;

use anyhow::Result;
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use cscan_core::simulate::subsample_individuals;
use cscan_geno::plink::PlinkReader;
use cscan_geno::GenotypeReader;

#[derive(Args)]
pub struct SubsetArgs {
    /// PLINK file prefix (bed/bim/fam)
    #[arg(long)]
    plink_file: String,

    /// Number of individuals to draw
    #[arg(long, default_value = "150")]
    n_individuals: usize,

    /// Random seed for the draw
    #[arg(long, default_value = "32")]
    seed: u64,

    /// Output PLINK file prefix
    #[arg(long)]
    output_prefix: String,
}

/// Draw `n` individuals from `plink_file` and write them to `output_prefix`.
///
/// Returns the drawn IDs in store order.
pub fn write_subsample(plink_file: &str, n: usize, seed: u64, output_prefix: &Path) -> Result<Vec<String>> {
    let mut plink = PlinkReader::new(plink_file)?;
    info!(
        "Loaded {} markers x {} samples from PLINK files",
        plink.n_markers(),
        plink.n_samples()
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ids = subsample_individuals(plink.sample_ids(), n, &mut rng)?;
    plink.set_sample_subset(&ids)?;
    plink.write_subset(output_prefix)?;
    Ok(ids)
}

pub fn run(args: SubsetArgs) -> Result<()> {
    info!("=== cscan: Subsample individuals ===");
    info!("PLINK file: {}", args.plink_file);
    info!("Individuals: {}, seed: {}", args.n_individuals, args.seed);

    let ids = write_subsample(
        &args.plink_file,
        args.n_individuals,
        args.seed,
        Path::new(&args.output_prefix),
    )?;
    info!("Wrote {} individuals to {}", ids.len(), args.output_prefix);
    Ok(())
}
