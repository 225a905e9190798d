use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::civec::{CiVector, CiVectorFamily};
use crate::determinant::DeterminantBasis;
use crate::rdmderiv::{
    build_rdm1_deriv, contract_operator, extend_rdm2_deriv, extend_rdm3_deriv,
    extend_rdm4f_deriv, rdm34_deriv, CiExpansion,
};
use crate::reference::reference_rdm4f_deriv;
use crate::space::{HexIndex, OrbitalSpace, PairIndex, QuadIndex};

fn random_target(basis: &DeterminantBasis, seed: u64) -> CiVector {
    let mut rng = StdRng::seed_from_u64(seed);
    let v = Array1::from_shape_fn(basis.n_det(), |_| rng.gen_range(-1.0f64..1.0));
    let norm = v.dot(&v).sqrt();
    CiVector::new(basis, v / norm).unwrap()
}

fn random_operator(norb: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((norb, norb), |_| rng.gen_range(-1.0f64..1.0))
}

fn build_d2_d3<'a>(cbra: &CiVector<'a>) -> (CiVectorFamily<'a>, CiVectorFamily<'a>) {
    let d1 = build_rdm1_deriv(cbra).unwrap();
    let d2 = extend_rdm2_deriv(&d1).unwrap();
    let d3 = extend_rdm3_deriv(&d2).unwrap();
    (d2, d3)
}

#[test]
fn test_contract_operator_explicit_sum() {
    let basis = DeterminantBasis::new(OrbitalSpace::new(3, 2, 1).unwrap()).unwrap();
    let norb = basis.norb();
    let cbra = random_target(&basis, 41);
    let (_, d3) = build_d2_d3(&cbra);
    let fock = random_operator(norb, 42);

    let fd = contract_operator(&d3, &fock.view()).unwrap();
    assert_eq!(fd.rank(), 4);
    for klij in QuadIndex::iter_all(norb) {
        let [k, l, i, j] = klij.0;
        let mut expected = Array1::<f64>::zeros(basis.n_det());
        for mn in PairIndex::iter_all(norb) {
            let [m, n] = mn.0;
            expected.scaled_add(
                fock[(m, n)],
                &d3.slot_at(&HexIndex::new([k, l, i, j, m, n])).unwrap(),
            );
        }
        assert_abs_diff_eq!(fd.slot_at(&klij).unwrap(), expected.view(), epsilon = 1e-12);
    }
}

#[test]
fn test_rdm4f_deriv_matches_reference() {
    for (norb, na, nb, seed) in [(2, 1, 1, 51), (3, 2, 1, 52), (3, 2, 2, 53)] {
        let basis = DeterminantBasis::new(OrbitalSpace::new(norb, na, nb).unwrap()).unwrap();
        let cbra = random_target(&basis, seed);
        let (_, d3) = build_d2_d3(&cbra);

        // A non-symmetric operator distinguishes F[p, q] from F[q, p].
        let fock = random_operator(norb, seed + 100);
        let g = extend_rdm4f_deriv(&d3, &fock.view()).unwrap();
        let reference = reference_rdm4f_deriv(&cbra, &fock.view()).unwrap();
        assert_abs_diff_eq!(g.data(), reference.data(), epsilon = 1e-11);
    }
}

#[test]
fn test_rdm4f_deriv_identity_round_trip() {
    // Four electrons: contraction with the identity gives back D3 exactly.
    let basis = DeterminantBasis::new(OrbitalSpace::new(3, 2, 2).unwrap()).unwrap();
    let cbra = random_target(&basis, 61);
    let (d2, d3) = build_d2_d3(&cbra);
    let identity = Array2::<f64>::eye(3);
    let fd = contract_operator(&d3, &identity.view()).unwrap();
    assert_abs_diff_eq!(fd.data(), &(d2.data() * 2.0), epsilon = 1e-12);
    let g = extend_rdm4f_deriv(&d3, &identity.view()).unwrap();
    assert_abs_diff_eq!(g.data(), d3.data(), epsilon = 1e-12);

    // In general the identity scales D3 by N - 3 and D2 by N - 2.
    for (norb, na, nb, seed) in [(3, 1, 2, 62), (4, 3, 2, 63), (4, 3, 3, 64)] {
        let basis = DeterminantBasis::new(OrbitalSpace::new(norb, na, nb).unwrap()).unwrap();
        let n = (na + nb) as f64;
        let cbra = random_target(&basis, seed);
        let (d2, d3) = build_d2_d3(&cbra);
        let identity = Array2::<f64>::eye(norb);
        let fd = contract_operator(&d3, &identity.view()).unwrap();
        assert_abs_diff_eq!(fd.data(), &(d2.data() * (n - 2.0)), epsilon = 1e-11);
        let g = extend_rdm4f_deriv(&d3, &identity.view()).unwrap();
        assert_abs_diff_eq!(g.data(), &(d3.data() * (n - 3.0)), epsilon = 1e-11);
    }
}

#[test]
fn test_rdm34_deriv_entry_point() {
    let space = OrbitalSpace::new(3, 2, 1).unwrap();
    let basis = DeterminantBasis::new(space).unwrap();
    let cbra = random_target(&basis, 71);
    let fock = random_operator(3, 72);
    let wfn = CiExpansion::builder()
        .space(space)
        .coefficients(
            cbra.coefficients()
                .clone()
                .into_shape((1, basis.n_det()))
                .unwrap(),
        )
        .build()
        .unwrap();

    let (d3, g) = rdm34_deriv(&basis, &wfn, 0, &fock.view()).unwrap();
    let (_, d3_steps) = build_d2_d3(&cbra);
    let g_steps = extend_rdm4f_deriv(&d3_steps, &fock.view()).unwrap();
    assert_eq!(d3.data(), d3_steps.data());
    assert_eq!(g.data(), g_steps.data());
}

#[test]
fn test_contraction_preconditions() {
    let basis = DeterminantBasis::new(OrbitalSpace::new(3, 1, 1).unwrap()).unwrap();
    let cbra = random_target(&basis, 81);
    let (d2, d3) = build_d2_d3(&cbra);

    let wrong_shape = Array2::<f64>::eye(4);
    assert!(contract_operator(&d3, &wrong_shape.view()).is_err());
    assert!(extend_rdm4f_deriv(&d3, &wrong_shape.view()).is_err());

    let fock = Array2::<f64>::eye(3);
    assert!(contract_operator(&d2, &fock.view()).is_err());
    assert!(extend_rdm4f_deriv(&d2, &fock.view()).is_err());
}
