//! Reference evaluation of operator strings by explicit determinant manipulation.
//!
//! Everything here works on individual spin-orbital ladder operators acting on occupation bit
//! masks and makes no use of the excitation connectivity tables, which makes it a slow but
//! independent check of the recursive RDM-derivative construction for small orbital spaces.

use std::fmt;

use anyhow::{self, ensure, format_err};
use itertools::Itertools;
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::civec::{CiVector, CiVectorFamily};
use crate::determinant::{parity, DeterminantBasis};
use crate::sigma::SpinSector;
use crate::space::MultiIndex;

#[cfg(test)]
mod reference_tests;

/// An enumerated type for spin-orbital ladder operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LadderOperator {
    /// The creation operator $`\hat{a}^{\dagger}_{p\sigma}`$.
    Create(usize, SpinSector),

    /// The annihilation operator $`\hat{a}_{p\sigma}`$.
    Annihilate(usize, SpinSector),
}

impl fmt::Display for LadderOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LadderOperator::Create(p, spin) => write!(f, "a†({p}{spin})"),
            LadderOperator::Annihilate(p, spin) => write!(f, "a({p}{spin})"),
        }
    }
}

/// Applies one ladder operator to a determinant given as an $`(\alpha, \beta)`$ string pair.
///
/// $`\alpha`$ operators are ordered before $`\beta`$ operators in every determinant, so a
/// $`\beta`$ operator picks up an extra phase from all occupied $`\alpha`$ spin-orbitals.
///
/// # Returns
///
/// The resulting string pair and phase, or `None` if the determinant is annihilated.
pub fn apply_ladder_operator(op: LadderOperator, alpha: u64, beta: u64) -> Option<(u64, u64, f64)> {
    let (p, spin, create) = match op {
        LadderOperator::Create(p, spin) => (p, spin, true),
        LadderOperator::Annihilate(p, spin) => (p, spin, false),
    };
    let bit = 1u64 << p;
    let (string, offset) = match spin {
        SpinSector::Alpha => (alpha, 1.0),
        SpinSector::Beta => (beta, if alpha.count_ones() % 2 == 0 { 1.0 } else { -1.0 }),
    };
    let occupied = string & bit != 0;
    if occupied == create {
        return None;
    }
    let sign = offset * parity(string, p);
    let new_string = string ^ bit;
    match spin {
        SpinSector::Alpha => Some((new_string, beta, sign)),
        SpinSector::Beta => Some((alpha, new_string, sign)),
    }
}

/// Applies a product of ladder operators, written left to right, to a CI vector. The rightmost
/// operator acts first.
///
/// # Errors
///
/// Errors if the vector length does not match the basis, or if the operator string takes a
/// determinant with a non-zero amplitude out of the basis.
pub fn apply_operator_string(
    basis: &DeterminantBasis,
    ops: &[LadderOperator],
    v: ArrayView1<f64>,
) -> Result<Array1<f64>, anyhow::Error> {
    ensure!(
        v.len() == basis.n_det(),
        "Vector length {} does not match the {} determinants of {basis}.",
        v.len(),
        basis.n_det()
    );
    let mut result = Array1::<f64>::zeros(basis.n_det());
    for (index, &amplitude) in v.iter().enumerate() {
        if amplitude == 0.0 {
            continue;
        }
        let (alpha, beta) = basis
            .determinant(index)
            .ok_or_else(|| format_err!("Determinant {index} not found in {basis}."))?;
        let image = ops.iter().rev().try_fold((alpha, beta, 1.0), |(a, b, sign), &op| {
            apply_ladder_operator(op, a, b).map(|(a2, b2, s2)| (a2, b2, sign * s2))
        });
        if let Some((a, b, sign)) = image {
            let target = basis.index_of(a, b).ok_or_else(|| {
                format_err!(
                    "Operator string {} does not preserve the electron counts of {basis}.",
                    ops.iter().map(|op| op.to_string()).join(" ")
                )
            })?;
            result[target] += sign * amplitude;
        }
    }
    Ok(result)
}

/// Applies the spin-summed normal-ordered product of excitations
/// ```math
///     \sum_{\sigma_1 \ldots \sigma_r}
///         \hat{a}^{\dagger}_{c_1\sigma_1} \ldots \hat{a}^{\dagger}_{c_r\sigma_r}
///         \hat{a}_{d_r\sigma_r} \ldots \hat{a}_{d_1\sigma_1}
/// ```
/// to a CI vector, where `pairs` is $`[(c_1, d_1), \ldots, (c_r, d_r)]`$.
pub fn apply_normal_ordered_excitations(
    basis: &DeterminantBasis,
    pairs: &[(usize, usize)],
    v: ArrayView1<f64>,
) -> Result<Array1<f64>, anyhow::Error> {
    let mut result = Array1::<f64>::zeros(basis.n_det());
    for spins in (0..pairs.len())
        .map(|_| [SpinSector::Alpha, SpinSector::Beta])
        .multi_cartesian_product()
    {
        let creators = pairs
            .iter()
            .zip(spins.iter())
            .map(|(&(c, _), &spin)| LadderOperator::Create(c, spin));
        let annihilators = pairs
            .iter()
            .zip(spins.iter())
            .rev()
            .map(|(&(_, d), &spin)| LadderOperator::Annihilate(d, spin));
        let ops = creators.chain(annihilators).collect_vec();
        result += &apply_operator_string(basis, &ops, v.view())?;
    }
    if pairs.is_empty() {
        result.assign(&v);
    }
    Ok(result)
}

/// Builds $`\hat{E}_{ij} |v\rangle`$ for all $`(i, j)`$ by explicit enumeration.
pub fn reference_rdm1_deriv<'a>(v: &CiVector<'a>) -> Result<CiVectorFamily<'a>, anyhow::Error> {
    let basis = v.basis();
    let mut family = CiVectorFamily::zeros(basis, 2)?;
    for ij in MultiIndex::<2>::iter_all(basis.norb()) {
        let [i, j] = ij.0;
        let image = apply_normal_ordered_excitations(basis, &[(i, j)], v.coefficients().view())?;
        family.slot_at_mut(&ij)?.assign(&image);
    }
    Ok(family)
}

/// Builds
/// $`\sum_{\sigma\tau} \hat{a}^{\dagger}_{k\sigma} \hat{a}^{\dagger}_{i\tau}
/// \hat{a}_{j\tau} \hat{a}_{l\sigma} |v\rangle`$ in slot $`(k, l, i, j)`$ by explicit enumeration.
pub fn reference_rdm2_deriv<'a>(v: &CiVector<'a>) -> Result<CiVectorFamily<'a>, anyhow::Error> {
    let basis = v.basis();
    let mut family = CiVectorFamily::zeros(basis, 4)?;
    for klij in MultiIndex::<4>::iter_all(basis.norb()) {
        let [k, l, i, j] = klij.0;
        let image =
            apply_normal_ordered_excitations(basis, &[(k, l), (i, j)], v.coefficients().view())?;
        family.slot_at_mut(&klij)?.assign(&image);
    }
    Ok(family)
}

/// Builds
/// $`\hat{a}^{\dagger}_{m} \hat{a}^{\dagger}_{k} \hat{a}^{\dagger}_{i}
/// \hat{a}_{j} \hat{a}_{l} \hat{a}_{n} |v\rangle`$, spin-summed, in slot
/// $`(k, l, i, j, m, n)`$ by explicit enumeration.
pub fn reference_rdm3_deriv<'a>(v: &CiVector<'a>) -> Result<CiVectorFamily<'a>, anyhow::Error> {
    let basis = v.basis();
    let mut family = CiVectorFamily::zeros(basis, 6)?;
    for klijmn in MultiIndex::<6>::iter_all(basis.norb()) {
        let [k, l, i, j, m, n] = klijmn.0;
        let image = apply_normal_ordered_excitations(
            basis,
            &[(m, n), (k, l), (i, j)],
            v.coefficients().view(),
        )?;
        family.slot_at_mut(&klijmn)?.assign(&image);
    }
    Ok(family)
}

/// Builds
/// $`\sum_{mn} F_{mn} \hat{a}^{\dagger}_{o} \hat{a}^{\dagger}_{m} \hat{a}^{\dagger}_{k}
/// \hat{a}^{\dagger}_{i} \hat{a}_{j} \hat{a}_{l} \hat{a}_{n} \hat{a}_{p} |v\rangle`$,
/// spin-summed, in slot $`(k, l, i, j, o, p)`$ by explicit enumeration.
pub fn reference_rdm4f_deriv<'a>(
    v: &CiVector<'a>,
    fock: &ArrayView2<f64>,
) -> Result<CiVectorFamily<'a>, anyhow::Error> {
    let basis = v.basis();
    let norb = basis.norb();
    ensure!(
        fock.dim() == (norb, norb),
        "Operator matrix shape {:?} does not match {norb} orbitals.",
        fock.dim()
    );
    let mut family = CiVectorFamily::zeros(basis, 6)?;
    for klijop in MultiIndex::<6>::iter_all(norb) {
        let [k, l, i, j, o, p] = klijop.0;
        let mut slot = family.slot_at_mut(&klijop)?;
        for (m, n) in (0..norb).cartesian_product(0..norb) {
            let f_mn = fock[(m, n)];
            if f_mn == 0.0 {
                continue;
            }
            let image = apply_normal_ordered_excitations(
                basis,
                &[(o, p), (m, n), (k, l), (i, j)],
                v.coefficients().view(),
            )?;
            slot.scaled_add(f_mn, &image);
        }
    }
    Ok(family)
}
