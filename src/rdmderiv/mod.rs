//! Derivatives of reduced density matrices with respect to CI coefficients.
//!
//! For a target state $`|0\rangle`$, the families built here are
//! ```math
//!     \begin{aligned}
//!         D^{(1)}_{ij} &= \hat{E}_{ij} |0\rangle, \\
//!         D^{(2)}_{klij} &= \hat{E}_{kl} D^{(1)}_{ij} - \delta_{li} D^{(1)}_{kj}
//!             = \hat{a}^{\dagger}_{k} \hat{a}^{\dagger}_{i} \hat{a}_{j} \hat{a}_{l} |0\rangle, \\
//!         D^{(3)}_{klijmn} &= \hat{E}_{mn} D^{(2)}_{klij}
//!             - \delta_{nk} D^{(2)}_{mlij} - \delta_{ni} D^{(2)}_{klmj}
//!             = \hat{a}^{\dagger}_{m} \hat{a}^{\dagger}_{k} \hat{a}^{\dagger}_{i}
//!               \hat{a}_{j} \hat{a}_{l} \hat{a}_{n} |0\rangle,
//!     \end{aligned}
//! ```
//! with spin summations implied over each creation/annihilation pair. Projecting these onto a bra
//! $`\langle I |`$ gives the CI derivatives of the one-, two- and three-particle RDMs. The
//! correction terms arise from commuting each new annihilation operator to the right through the
//! creation operators that are already present, so there is one $`\delta`$ term per existing
//! creation operator.
//!
//! Slot multi-indices are flattened with the first index least significant: $`(k, l, i, j)`$ maps
//! to $`k + n(l + n(i + nj))`$ and $`(k, l, i, j, m, n)`$ to $`klij + n^4 (m + n \cdot n)`$.

use anyhow::{self, ensure};
use log;
use ndarray::{s, ArrayView2};

use crate::civec::{CiVector, CiVectorFamily};
use crate::determinant::DeterminantBasis;
use crate::sigma::apply_excitation_view;
use crate::space::{HexIndex, PairIndex, QuadIndex};

pub mod contraction;
pub mod wavefunction;

pub use contraction::{contract_operator, extend_rdm4f_deriv};
pub use wavefunction::{CiExpansion, CiExpansionBuilder, CiWavefunction};


// =================
// Rank-building steps
// =================

/// Builds the rank-2 family $`D^{(1)}_{ij} = \hat{E}_{ij} |0\rangle`$ from a target vector.
pub fn build_rdm1_deriv<'a>(cbra: &CiVector<'a>) -> Result<CiVectorFamily<'a>, anyhow::Error> {
    let mut dbra = CiVectorFamily::zeros(cbra.basis(), 2)?;
    apply_excitation_view(cbra.basis(), cbra.coefficients().view(), &mut dbra)?;
    log::debug!("First RDM derivative: {dbra}.");
    Ok(dbra)
}

/// Builds the rank-4 family $`D^{(2)}`$ from the rank-2 family $`D^{(1)}`$.
///
/// # Errors
///
/// Errors if `dbra` is not of rank 2.
pub fn extend_rdm2_deriv<'a>(
    dbra: &CiVectorFamily<'a>,
) -> Result<CiVectorFamily<'a>, anyhow::Error> {
    ensure!(
        dbra.rank() == 2,
        "The second RDM derivative must be built from a rank-2 family, not a {dbra}."
    );
    let basis = dbra.basis();
    let norb = basis.norb();
    let norb2 = norb * norb;

    let mut ebra = CiVectorFamily::zeros(basis, 4)?;
    let mut tmp = CiVectorFamily::zeros(basis, 2)?;
    for ij in PairIndex::iter_all(norb) {
        let [i, j] = ij.0;
        let ij_flat = ij.flatten(norb);
        tmp.data_mut().fill(0.0);
        apply_excitation_view(basis, dbra.slot(ij_flat), &mut tmp)?;

        // All (k, l) for this (i, j) form one contiguous block.
        ebra.data_mut()
            .slice_mut(s![ij_flat * norb2..(ij_flat + 1) * norb2, ..])
            .assign(tmp.data());

        // δ(l, i) correction.
        for k in 0..norb {
            let klij = QuadIndex::new([k, i, i, j]).flatten(norb);
            let kj = PairIndex::new([k, j]).flatten(norb);
            ebra.slot_mut(klij).scaled_add(-1.0, &dbra.slot(kj));
        }
    }
    log::debug!("Second RDM derivative: {ebra}.");
    Ok(ebra)
}

/// Builds the rank-6 family $`D^{(3)}`$ from the rank-4 family $`D^{(2)}`$.
///
/// # Errors
///
/// Errors if `ebra` is not of rank 4.
pub fn extend_rdm3_deriv<'a>(
    ebra: &CiVectorFamily<'a>,
) -> Result<CiVectorFamily<'a>, anyhow::Error> {
    ensure!(
        ebra.rank() == 4,
        "The third RDM derivative must be built from a rank-4 family, not a {ebra}."
    );
    let basis = ebra.basis();
    let norb = basis.norb();
    let norb4 = norb.pow(4);

    let mut fbra = CiVectorFamily::zeros(basis, 6)?;
    let mut tmp = CiVectorFamily::zeros(basis, 2)?;
    for klij in QuadIndex::iter_all(norb) {
        let [k, l, i, j] = klij.0;
        let klij_flat = klij.flatten(norb);
        tmp.data_mut().fill(0.0);
        apply_excitation_view(basis, ebra.slot(klij_flat), &mut tmp)?;

        // Slots (k, l, i, j, m, n) for all (m, n) are strided by norb^4.
        fbra.data_mut()
            .slice_mut(s![klij_flat..;norb4, ..])
            .assign(tmp.data());

        for m in 0..norb {
            // δ(n, k) correction.
            let klijmk = HexIndex::new([k, l, i, j, m, k]).flatten(norb);
            let mlij = QuadIndex::new([m, l, i, j]).flatten(norb);
            fbra.slot_mut(klijmk).scaled_add(-1.0, &ebra.slot(mlij));

            // δ(n, i) correction.
            let klijmi = HexIndex::new([k, l, i, j, m, i]).flatten(norb);
            let klmj = QuadIndex::new([k, l, m, j]).flatten(norb);
            fbra.slot_mut(klijmi).scaled_add(-1.0, &ebra.slot(klmj));
        }
    }
    log::debug!("Third RDM derivative: {fbra}.");
    Ok(fbra)
}

// ===========
// Entry points
// ===========

/// Calculates the first RDM derivative $`\langle I | \hat{E}_{ij} | \mathrm{target} \rangle`$.
///
/// # Arguments
///
/// * `basis` - The determinant basis to which the target vector is bound.
/// * `wfn` - The CI wavefunction.
/// * `target` - The index of the target root.
///
/// # Returns
///
/// The rank-2 family $`D^{(1)}`$.
pub fn rdm1_deriv<'a, W>(
    basis: &'a DeterminantBasis,
    wfn: &W,
    target: usize,
) -> Result<CiVectorFamily<'a>, anyhow::Error>
where
    W: CiWavefunction + ?Sized,
{
    let cbra = wfn.bind(basis, target)?;
    build_rdm1_deriv(&cbra)
}

/// Calculates the second RDM derivative
/// $`\langle J | \hat{E}_{kl} \hat{E}_{ij} | \mathrm{target} \rangle
/// - \delta_{li} \langle J | \hat{E}_{kj} | \mathrm{target} \rangle`$.
///
/// # Returns
///
/// The rank-4 family $`D^{(2)}`$.
pub fn rdm2_deriv<'a, W>(
    basis: &'a DeterminantBasis,
    wfn: &W,
    target: usize,
) -> Result<CiVectorFamily<'a>, anyhow::Error>
where
    W: CiWavefunction + ?Sized,
{
    let dbra = rdm1_deriv(basis, wfn, target)?;
    extend_rdm2_deriv(&dbra)
}

/// Calculates the third RDM derivative $`D^{(3)}`$ and its contraction with a one-particle
/// operator $`F`$ into the operator-weighted fourth RDM derivative
/// ```math
///     G_{klijop} = \sum_{mn} F_{mn}
///         \hat{a}^{\dagger}_{o} \hat{a}^{\dagger}_{m} \hat{a}^{\dagger}_{k}
///         \hat{a}^{\dagger}_{i} \hat{a}_{j} \hat{a}_{l} \hat{a}_{n} \hat{a}_{p}
///         | \mathrm{target} \rangle.
/// ```
///
/// # Arguments
///
/// * `basis` - The determinant basis to which the target vector is bound.
/// * `wfn` - The CI wavefunction.
/// * `target` - The index of the target root.
/// * `fock` - The operator matrix $`F`$ of shape $`(n_{\mathrm{orb}}, n_{\mathrm{orb}})`$, with
///   element $`(m, n)`$ multiplying $`\hat{a}^{\dagger}_m \hat{a}_n`$.
///
/// # Returns
///
/// The pair $`(D^{(3)}, G)`$ of rank-6 families.
///
/// # Errors
///
/// Errors if the shape of `fock` is wrong, before anything is allocated.
pub fn rdm34_deriv<'a, W>(
    basis: &'a DeterminantBasis,
    wfn: &W,
    target: usize,
    fock: &ArrayView2<f64>,
) -> Result<(CiVectorFamily<'a>, CiVectorFamily<'a>), anyhow::Error>
where
    W: CiWavefunction + ?Sized,
{
    contraction::check_operator(basis, fock)?;
    let dbra = rdm1_deriv(basis, wfn, target)?;
    let ebra = extend_rdm2_deriv(&dbra)?;
    drop(dbra);
    let fbra = extend_rdm3_deriv(&ebra)?;
    drop(ebra);
    let gbra = extend_rdm4f_deriv(&fbra, fock)?;
    Ok((fbra, gbra))
}
