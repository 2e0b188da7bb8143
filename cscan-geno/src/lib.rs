//! cscan-geno: Genotype store access for cscan
//!
//! Provides the `GenotypeReader` trait, a memory-mapped PLINK bed/bim/fam
//! reader with ID-keyed sample subsetting, an in-memory store, a PLINK
//! writer for persisting a subsampled fileset, sample-ID joins, and the
//! phenotype table format.

pub mod memory;
pub mod phenotype;
pub mod plink;
pub mod sample;
pub mod traits;

pub use traits::{GenotypeReader, MarkerData, MarkerInfo};
