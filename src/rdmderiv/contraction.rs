//! Contraction of the third RDM derivative with a one-particle operator.

use anyhow::{self, ensure};
use log;
use ndarray::linalg::general_mat_mul;
use ndarray::{s, Array1, ArrayView2};

use crate::civec::CiVectorFamily;
use crate::determinant::DeterminantBasis;
use crate::sigma::apply_excitation_view;
use crate::space::{HexIndex, QuadIndex};

#[cfg(test)]
#[path = "contraction_tests.rs"]
mod contraction_tests;

/// Ensures that an operator matrix is square over the orbitals of `basis`.
pub(crate) fn check_operator(
    basis: &DeterminantBasis,
    fock: &ArrayView2<f64>,
) -> Result<(), anyhow::Error> {
    let norb = basis.norb();
    ensure!(
        fock.dim() == (norb, norb),
        "Operator matrix has shape {:?}, but {basis} requires ({norb}, {norb}).",
        fock.dim()
    );
    Ok(())
}

/// Contracts the third RDM derivative with an operator over its last orbital pair,
/// ```math
///     \mathrm{FD}_{klij} = \sum_{mn} F_{mn} D^{(3)}_{klijmn}.
/// ```
///
/// # Arguments
///
/// * `fbra` - The rank-6 family $`D^{(3)}`$.
/// * `fock` - The operator matrix $`F`$.
///
/// # Returns
///
/// The rank-4 family $`\mathrm{FD}`$.
///
/// # Errors
///
/// Errors if `fbra` is not of rank 6 or if the shape of `fock` is wrong.
pub fn contract_operator<'a>(
    fbra: &CiVectorFamily<'a>,
    fock: &ArrayView2<f64>,
) -> Result<CiVectorFamily<'a>, anyhow::Error> {
    ensure!(
        fbra.rank() == 6,
        "Operator contraction requires a rank-6 family, not a {fbra}."
    );
    let basis = fbra.basis();
    check_operator(basis, fock)?;
    let norb2 = basis.norb() * basis.norb();

    // Row m + norb * n of the reshaped D3 pairs with F[m, n].
    let f_row = Array1::from_iter(fock.t().iter().copied()).into_shape((1, norb2))?;
    let mut fd = CiVectorFamily::zeros(basis, 4)?;
    general_mat_mul(
        1.0,
        &f_row,
        &fbra.as_matrix(norb2)?,
        0.0,
        &mut fd.as_matrix_mut(1)?,
    );
    log::debug!("Operator-contracted third RDM derivative: {fd}.");
    Ok(fd)
}

/// Builds the operator-weighted fourth RDM derivative from the third RDM derivative,
/// ```math
///     G_{klijop} = \hat{E}_{op} \mathrm{FD}_{klij}
///         - \delta_{pk} \mathrm{FD}_{olij}
///         - \delta_{pi} \mathrm{FD}_{kloj}
///         - \sum_{q} F_{pq} D^{(3)}_{klijoq},
/// ```
/// which equals
/// $`\sum_{mn} F_{mn} \hat{a}^{\dagger}_{o} \hat{a}^{\dagger}_{m} \hat{a}^{\dagger}_{k}
/// \hat{a}^{\dagger}_{i} \hat{a}_{j} \hat{a}_{l} \hat{a}_{n} \hat{a}_{p} | 0 \rangle`$.
///
/// The slot $`(k, l, i, j, o, p)`$ of the result has flat index
/// $`klij + n_{\mathrm{orb}}^4 (o + n_{\mathrm{orb}} p)`$.
///
/// The last term pairs the row of $`F`$ with $`p`$. BAGEL's `FCI::rdm34deriv` subtracts
/// $`\sum_{q} D^{(3)}_{klijoq} F_{qp}`$ instead, which gives the same $`G`$ only when $`F`$ is
/// symmetric. For a non-symmetric $`F`$, results differ from BAGEL's and agree with the
/// operator string above.
///
/// # Errors
///
/// Errors if `fbra` is not of rank 6 or if the shape of `fock` is wrong.
pub fn extend_rdm4f_deriv<'a>(
    fbra: &CiVectorFamily<'a>,
    fock: &ArrayView2<f64>,
) -> Result<CiVectorFamily<'a>, anyhow::Error> {
    let fd = contract_operator(fbra, fock)?;
    let basis = fbra.basis();
    let norb = basis.norb();
    let norb4 = norb.pow(4);

    let mut gbra = CiVectorFamily::zeros(basis, 6)?;
    let mut tmp = CiVectorFamily::zeros(basis, 2)?;
    for klij in QuadIndex::iter_all(norb) {
        let [k, l, i, j] = klij.0;
        let klij_flat = klij.flatten(norb);
        tmp.data_mut().fill(0.0);
        apply_excitation_view(basis, fd.slot(klij_flat), &mut tmp)?;
        gbra.data_mut()
            .slice_mut(s![klij_flat..;norb4, ..])
            .assign(tmp.data());

        for o in 0..norb {
            // δ(p, k) correction.
            let klijok = HexIndex::new([k, l, i, j, o, k]).flatten(norb);
            let olij = QuadIndex::new([o, l, i, j]).flatten(norb);
            gbra.slot_mut(klijok).scaled_add(-1.0, &fd.slot(olij));

            // δ(p, i) correction.
            let klijoi = HexIndex::new([k, l, i, j, o, i]).flatten(norb);
            let kloj = QuadIndex::new([k, l, o, j]).flatten(norb);
            gbra.slot_mut(klijoi).scaled_add(-1.0, &fd.slot(kloj));
        }
    }
    drop(fd);

    // Row p of the reshaped G pairs with row q of the reshaped D3 through F[p, q].
    general_mat_mul(
        -1.0,
        fock,
        &fbra.as_matrix(norb)?,
        1.0,
        &mut gbra.as_matrix_mut(norb)?,
    );
    log::debug!("Operator-weighted fourth RDM derivative: {gbra}.");
    Ok(gbra)
}
