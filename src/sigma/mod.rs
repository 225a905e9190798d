//! Application of one-particle excitation operators to CI vectors.
//!
//! The spin-summed excitation operator
//! ```math
//!     \hat{E}_{ij} = \sum_{\sigma} \hat{a}^{\dagger}_{i\sigma} \hat{a}_{j\sigma}
//! ```
//! is applied one spin sector at a time. Each application accumulates
//! $`\hat{E}^{\sigma}_{ij} |v\rangle`$ into slot $`i + n_{\mathrm{orb}} j`$ of a rank-2 CI vector
//! family, so that applying both sectors into the same family yields $`\hat{E}_{ij} |v\rangle`$.

use std::fmt;

use anyhow::{self, ensure};
use ndarray::{s, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::civec::{CiVector, CiVectorFamily};
use crate::determinant::DeterminantBasis;

#[cfg(test)]
mod sigma_tests;

/// An enumerated type for the two spin sectors of a determinant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpinSector {
    /// The spin-$`\alpha`$ sector.
    Alpha,

    /// The spin-$`\beta`$ sector.
    Beta,
}

impl fmt::Display for SpinSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinSector::Alpha => write!(f, "α"),
            SpinSector::Beta => write!(f, "β"),
        }
    }
}

/// Accumulates $`\hat{E}^{\sigma}_{ij} |v\rangle`$ into every slot $`(i, j)`$ of `destination`
/// for one spin sector $`\sigma`$.
///
/// # Arguments
///
/// * `source` - The CI vector $`|v\rangle`$.
/// * `sector` - The spin sector $`\sigma`$.
/// * `destination` - A rank-2 family bound to the same basis as `source`. Existing amplitudes are
///   added to, not overwritten.
///
/// # Errors
///
/// Errors if `source` and `destination` are bound to different determinant bases, or if
/// `destination` is not of rank 2.
pub fn apply_excitation_sector(
    source: &CiVector,
    sector: SpinSector,
    destination: &mut CiVectorFamily,
) -> Result<(), anyhow::Error> {
    apply_excitation_sector_view(source.basis(), source.coefficients().view(), sector, destination)
}

/// Accumulates $`\hat{E}_{ij} |v\rangle = \sum_\sigma \hat{E}^{\sigma}_{ij} |v\rangle`$ into every
/// slot $`(i, j)`$ of `destination` by applying both spin sectors in turn.
///
/// # Errors
///
/// As for [`apply_excitation_sector`].
pub fn apply_excitation(
    source: &CiVector,
    destination: &mut CiVectorFamily,
) -> Result<(), anyhow::Error> {
    apply_excitation_view(source.basis(), source.coefficients().view(), destination)
}

/// Same as [`apply_excitation`], but for raw amplitudes stated to be bound to `basis`. Used to
/// apply excitations directly to the slots of another family without copying them out.
pub fn apply_excitation_view(
    basis: &DeterminantBasis,
    source: ArrayView1<f64>,
    destination: &mut CiVectorFamily,
) -> Result<(), anyhow::Error> {
    apply_excitation_sector_view(basis, source.view(), SpinSector::Alpha, destination)?;
    apply_excitation_sector_view(basis, source, SpinSector::Beta, destination)
}

/// Same as [`apply_excitation_sector`], but for raw amplitudes stated to be bound to `basis`.
pub fn apply_excitation_sector_view(
    basis: &DeterminantBasis,
    source: ArrayView1<f64>,
    sector: SpinSector,
    destination: &mut CiVectorFamily,
) -> Result<(), anyhow::Error> {
    ensure!(
        basis == destination.basis(),
        "Source bound to {basis} but destination bound to {}.",
        destination.basis()
    );
    ensure!(
        destination.rank() == 2,
        "Excitations must be accumulated into a rank-2 family, but a rank-{} family was given.",
        destination.rank()
    );
    ensure!(
        source.len() == basis.n_det(),
        "Source vector length {} does not match the {} determinants of {basis}.",
        source.len(),
        basis.n_det()
    );

    let lenb = basis.lenb();
    let data = destination.data_mut();
    match sector {
        SpinSector::Alpha => {
            // Whole β-blocks move together.
            for ia in 0..basis.lena() {
                let source_block = source.slice(s![ia * lenb..(ia + 1) * lenb]);
                for exc in basis.alpha().excitations(ia) {
                    data.slice_mut(s![exc.ij, exc.target * lenb..(exc.target + 1) * lenb])
                        .scaled_add(exc.sign, &source_block);
                }
            }
        }
        SpinSector::Beta => {
            // Strided columns over all α-strings move together.
            for ib in 0..lenb {
                let source_column = source.slice(s![ib..;lenb]);
                for exc in basis.beta().excitations(ib) {
                    data.slice_mut(s![exc.ij, exc.target..;lenb])
                        .scaled_add(exc.sign, &source_column);
                }
            }
        }
    }
    Ok(())
}
