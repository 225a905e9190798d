use approx::assert_abs_diff_eq;
use ndarray::{array, Array1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::civec::{CiVector, CiVectorFamily};
use crate::determinant::DeterminantBasis;
use crate::sigma::{apply_excitation, apply_excitation_sector, SpinSector};
use crate::space::{OrbitalSpace, PairIndex};

#[test]
fn test_excitation_single_determinant() {
    // Determinants: |0α 0β⟩, |0α 1β⟩, |1α 0β⟩, |1α 1β⟩.
    let basis = DeterminantBasis::new(OrbitalSpace::new(2, 1, 1).unwrap()).unwrap();
    let phi = CiVector::new(&basis, array![1.0, 0.0, 0.0, 0.0]).unwrap();

    let mut alpha = CiVectorFamily::zeros(&basis, 2).unwrap();
    apply_excitation_sector(&phi, SpinSector::Alpha, &mut alpha).unwrap();
    assert_eq!(alpha.slot_at(&PairIndex::new([0, 0])).unwrap(), array![1.0, 0.0, 0.0, 0.0]);
    assert_eq!(alpha.slot_at(&PairIndex::new([1, 0])).unwrap(), array![0.0, 0.0, 1.0, 0.0]);
    assert_eq!(alpha.slot_at(&PairIndex::new([0, 1])).unwrap(), Array1::<f64>::zeros(4));
    assert_eq!(alpha.slot_at(&PairIndex::new([1, 1])).unwrap(), Array1::<f64>::zeros(4));

    let mut beta = CiVectorFamily::zeros(&basis, 2).unwrap();
    apply_excitation_sector(&phi, SpinSector::Beta, &mut beta).unwrap();
    assert_eq!(beta.slot_at(&PairIndex::new([0, 0])).unwrap(), array![1.0, 0.0, 0.0, 0.0]);
    assert_eq!(beta.slot_at(&PairIndex::new([1, 0])).unwrap(), array![0.0, 1.0, 0.0, 0.0]);

    let mut both = CiVectorFamily::zeros(&basis, 2).unwrap();
    apply_excitation(&phi, &mut both).unwrap();
    assert_eq!(both.slot(0), array![2.0, 0.0, 0.0, 0.0]);
    assert_eq!(both.slot(1), array![0.0, 1.0, 1.0, 0.0]);
    assert_eq!(both.slot(2), Array1::<f64>::zeros(4));
    assert_eq!(both.slot(3), Array1::<f64>::zeros(4));
}

#[test]
fn test_excitation_accumulates() {
    let basis = DeterminantBasis::new(OrbitalSpace::new(3, 1, 2).unwrap()).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let v = CiVector::new(
        &basis,
        Array1::from_shape_fn(basis.n_det(), |_| rng.gen_range(-1.0f64..1.0)),
    )
    .unwrap();

    let mut once = CiVectorFamily::zeros(&basis, 2).unwrap();
    apply_excitation(&v, &mut once).unwrap();
    let mut twice = CiVectorFamily::zeros(&basis, 2).unwrap();
    apply_excitation(&v, &mut twice).unwrap();
    apply_excitation(&v, &mut twice).unwrap();
    assert_abs_diff_eq!(twice.data(), &(once.data() * 2.0), epsilon = 1e-14);

    let mut split = CiVectorFamily::zeros(&basis, 2).unwrap();
    apply_excitation_sector(&v, SpinSector::Beta, &mut split).unwrap();
    apply_excitation_sector(&v, SpinSector::Alpha, &mut split).unwrap();
    assert_abs_diff_eq!(split.data(), once.data(), epsilon = 1e-14);
}

#[test]
fn test_excitation_number_operator() {
    // Σ_i E_ii is the particle-number operator.
    for (norb, na, nb) in [(3, 1, 2), (4, 2, 2), (4, 3, 0), (5, 2, 3)] {
        let space = OrbitalSpace::new(norb, na, nb).unwrap();
        let basis = DeterminantBasis::new(space).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let v = CiVector::new(
            &basis,
            Array1::from_shape_fn(basis.n_det(), |_| rng.gen_range(-1.0f64..1.0)),
        )
        .unwrap();
        let mut family = CiVectorFamily::zeros(&basis, 2).unwrap();
        apply_excitation(&v, &mut family).unwrap();
        let number = (0..norb)
            .map(|i| family.slot_at(&PairIndex::new([i, i])).unwrap().to_owned())
            .fold(Array1::<f64>::zeros(basis.n_det()), |acc, x| acc + x);
        assert_abs_diff_eq!(
            number,
            v.coefficients() * space.n_electrons() as f64,
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_excitation_preconditions() {
    let basis = DeterminantBasis::new(OrbitalSpace::new(2, 1, 1).unwrap()).unwrap();
    let other_basis = DeterminantBasis::new(OrbitalSpace::new(2, 1, 0).unwrap()).unwrap();
    let v = CiVector::new(&basis, array![1.0, 0.0, 0.0, 0.0]).unwrap();

    let mut wrong_rank = CiVectorFamily::zeros(&basis, 4).unwrap();
    assert!(apply_excitation(&v, &mut wrong_rank).is_err());

    let mut wrong_basis = CiVectorFamily::zeros(&other_basis, 2).unwrap();
    assert!(apply_excitation(&v, &mut wrong_basis).is_err());
    assert!(wrong_basis.as_slice().unwrap().iter().all(|&x| x == 0.0));
}

#[test]
fn test_spin_sector_display() {
    assert_eq!(SpinSector::Alpha.to_string(), "α");
    assert_eq!(SpinSector::Beta.to_string(), "β");
}
