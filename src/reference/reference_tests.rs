use approx::assert_abs_diff_eq;
use ndarray::{array, Array1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::civec::{CiVector, CiVectorFamily};
use crate::determinant::DeterminantBasis;
use crate::reference::{
    apply_ladder_operator, apply_normal_ordered_excitations, apply_operator_string,
    reference_rdm1_deriv, LadderOperator,
};
use crate::sigma::{apply_excitation, SpinSector};
use crate::space::OrbitalSpace;

use LadderOperator::{Annihilate, Create};
use SpinSector::{Alpha, Beta};

fn random_vector(basis: &DeterminantBasis, seed: u64) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array1::from_shape_fn(basis.n_det(), |_| rng.gen_range(-1.0f64..1.0))
}

#[test]
fn test_ladder_operator_phases() {
    // a†_1α |0α 2α⟩ = -|0α 1α 2α⟩
    assert_eq!(
        apply_ladder_operator(Create(1, Alpha), 0b101, 0b0),
        Some((0b111, 0b0, -1.0))
    );
    // a_2α |0α 2α⟩ = -|0α⟩
    assert_eq!(
        apply_ladder_operator(Annihilate(2, Alpha), 0b101, 0b0),
        Some((0b001, 0b0, -1.0))
    );
    // a†_0β |1α ; 1β⟩ = -|1α ; 0β 1β⟩, the phase coming from the α electron.
    assert_eq!(
        apply_ladder_operator(Create(0, Beta), 0b10, 0b10),
        Some((0b10, 0b11, -1.0))
    );
    // a_1β |0α 1α ; 1β⟩ = |0α 1α⟩
    assert_eq!(
        apply_ladder_operator(Annihilate(1, Beta), 0b11, 0b10),
        Some((0b11, 0b00, 1.0))
    );
    assert_eq!(apply_ladder_operator(Create(0, Alpha), 0b1, 0b0), None);
    assert_eq!(apply_ladder_operator(Annihilate(1, Beta), 0b1, 0b1), None);
}

#[test]
fn test_operator_string_anticommutation() {
    let basis = DeterminantBasis::new(OrbitalSpace::new(3, 1, 1).unwrap()).unwrap();
    let v = random_vector(&basis, 3);
    for spin in [Alpha, Beta] {
        for (p, q) in [(0, 0), (0, 2), (1, 2), (2, 2)] {
            // a†_p a_q + a_q a†_p = δ_pq within the fixed-particle-number space.
            let pq = apply_operator_string(&basis, &[Create(p, spin), Annihilate(q, spin)], v.view())
                .unwrap();
            let qp = apply_operator_string(&basis, &[Annihilate(q, spin), Create(p, spin)], v.view())
                .unwrap();
            let expected = if p == q { v.clone() } else { Array1::zeros(v.len()) };
            assert_abs_diff_eq!(pq + qp, expected, epsilon = 1e-14);
        }
    }

    // Excitations in different spin sectors commute.
    let ab = apply_operator_string(
        &basis,
        &[Create(1, Alpha), Annihilate(0, Alpha), Create(2, Beta), Annihilate(0, Beta)],
        v.view(),
    )
    .unwrap();
    let ba = apply_operator_string(
        &basis,
        &[Create(2, Beta), Annihilate(0, Beta), Create(1, Alpha), Annihilate(0, Alpha)],
        v.view(),
    )
    .unwrap();
    assert_abs_diff_eq!(ab, ba, epsilon = 1e-14);
}

#[test]
fn test_operator_string_preconditions() {
    let basis = DeterminantBasis::new(OrbitalSpace::new(2, 1, 1).unwrap()).unwrap();
    let v = array![1.0, 0.0, 0.0, 0.0];
    assert!(apply_operator_string(&basis, &[Annihilate(0, Alpha)], v.view()).is_err());
    assert!(apply_operator_string(&basis, &[], array![1.0, 0.0].view()).is_err());

    // Annihilated determinants do not need to be addressable.
    let zero = apply_operator_string(&basis, &[Annihilate(1, Alpha)], v.view()).unwrap();
    assert_eq!(zero, Array1::<f64>::zeros(4));
    assert_eq!(
        apply_operator_string(&basis, &[], v.view()).unwrap(),
        v
    );
}

#[test]
fn test_normal_ordered_excitations() {
    let basis = DeterminantBasis::new(OrbitalSpace::new(4, 2, 1).unwrap()).unwrap();
    let v = random_vector(&basis, 5);
    assert_eq!(
        apply_normal_ordered_excitations(&basis, &[], v.view()).unwrap(),
        v
    );

    // Only the opposite-spin terms survive a double creation in orbital 2.
    let pp = apply_normal_ordered_excitations(&basis, &[(2, 0), (2, 1)], v.view()).unwrap();
    let pp_os = apply_operator_string(
        &basis,
        &[Create(2, Alpha), Create(2, Beta), Annihilate(1, Beta), Annihilate(0, Alpha)],
        v.view(),
    )
    .unwrap()
        + apply_operator_string(
            &basis,
            &[Create(2, Beta), Create(2, Alpha), Annihilate(1, Alpha), Annihilate(0, Beta)],
            v.view(),
        )
        .unwrap();
    assert_abs_diff_eq!(pp, pp_os, epsilon = 1e-14);
}

#[test]
fn test_reference_rdm1_deriv_matches_excitation_tables() {
    for (norb, na, nb) in [(2, 1, 1), (3, 2, 1), (4, 1, 3)] {
        let basis = DeterminantBasis::new(OrbitalSpace::new(norb, na, nb).unwrap()).unwrap();
        let v = CiVector::new(&basis, random_vector(&basis, 17)).unwrap();
        let reference = reference_rdm1_deriv(&v).unwrap();
        let mut tabulated = CiVectorFamily::zeros(&basis, 2).unwrap();
        apply_excitation(&v, &mut tabulated).unwrap();
        assert_abs_diff_eq!(reference.data(), tabulated.data(), epsilon = 1e-13);
    }
}

#[test]
fn test_ladder_operator_display() {
    assert_eq!(Create(3, Alpha).to_string(), "a†(3α)");
    assert_eq!(Annihilate(0, Beta).to_string(), "a(0β)");
}
