//! CI vectors and families of CI vectors labelled by orbital multi-indices.

use std::fmt;

use anyhow::{self, ensure, format_err};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};

use crate::determinant::DeterminantBasis;
use crate::space::MultiIndex;


// ==================
// Struct definitions
// ==================

/// A structure to manage the amplitudes of a CI wavefunction (or of a derivative thereof) over a
/// determinant basis.
#[derive(Clone, Debug)]
pub struct CiVector<'a> {
    /// The determinant basis to which this vector is bound.
    basis: &'a DeterminantBasis,

    /// The amplitudes, one per determinant.
    coefficients: Array1<f64>,
}

impl<'a> CiVector<'a> {
    /// Binds a set of amplitudes to a determinant basis.
    ///
    /// # Errors
    ///
    /// Errors if the number of amplitudes does not match the number of determinants.
    pub fn new(
        basis: &'a DeterminantBasis,
        coefficients: Array1<f64>,
    ) -> Result<Self, anyhow::Error> {
        ensure!(
            coefficients.len() == basis.n_det(),
            "CI vector length mismatched: {} amplitudes != {} determinants in {basis}.",
            coefficients.len(),
            basis.n_det()
        );
        Ok(Self {
            basis,
            coefficients,
        })
    }

    /// Returns a zero vector bound to a determinant basis.
    pub fn zeros(basis: &'a DeterminantBasis) -> Self {
        Self {
            basis,
            coefficients: Array1::zeros(basis.n_det()),
        }
    }

    /// Returns the bound determinant basis.
    pub fn basis(&self) -> &'a DeterminantBasis {
        self.basis
    }

    /// Returns the amplitudes.
    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// Returns the amplitudes mutably.
    pub fn coefficients_mut(&mut self) -> &mut Array1<f64> {
        &mut self.coefficients
    }

    /// Returns the number of amplitudes.
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Returns `true` if the vector holds no amplitudes.
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Calculates $`\langle \mathrm{self} | \mathrm{other} \rangle`$.
    pub fn dot(&self, other: &CiVector) -> Result<f64, anyhow::Error> {
        ensure!(
            self.basis == other.basis,
            "Cannot take the inner product of CI vectors bound to different determinant bases."
        );
        Ok(self.coefficients.dot(&other.coefficients))
    }
}

/// A structure to manage an ordered collection of $`n_{\mathrm{orb}}^k`$ CI vectors over one
/// determinant basis, each labelled by a rank-$`k`$ multi-index of orbitals.
///
/// The vectors are stored as the rows of one contiguous row-major buffer of shape
/// $`(n_{\mathrm{orb}}^k, n_{\mathrm{det}})`$, so that slot $`s`$ starts at element
/// $`s n_{\mathrm{det}}`$ of the flat buffer.
#[derive(Clone, Debug)]
pub struct CiVectorFamily<'a> {
    /// The determinant basis to which all vectors in this family are bound.
    basis: &'a DeterminantBasis,

    /// The number of orbital indices labelling each slot.
    rank: usize,

    /// The amplitudes, one row per slot.
    data: Array2<f64>,
}

impl<'a> CiVectorFamily<'a> {
    /// Allocates a zero family of a given rank.
    ///
    /// # Errors
    ///
    /// Errors if the number of elements overflows or if the buffer cannot be allocated.
    pub fn zeros(basis: &'a DeterminantBasis, rank: usize) -> Result<Self, anyhow::Error> {
        let n_slots = basis.space().n_slots(rank)?;
        let n_det = basis.n_det();
        let n_elements = n_slots.checked_mul(n_det).ok_or_else(|| {
            format_err!("A rank-{rank} family of {n_slots} slots × {n_det} determinants overflows.")
        })?;
        let mut buffer = Vec::<f64>::new();
        buffer.try_reserve_exact(n_elements).map_err(|err| {
            format_err!(
                "Unable to allocate a rank-{rank} family of {n_elements} elements ({} bytes): {err}",
                n_elements.saturating_mul(std::mem::size_of::<f64>())
            )
        })?;
        buffer.resize(n_elements, 0.0);
        let data = Array2::from_shape_vec((n_slots, n_det), buffer)?;
        Ok(Self { basis, rank, data })
    }

    /// Allocates a zero family with the same basis and rank as `self`.
    pub fn zeros_like(&self) -> Result<Self, anyhow::Error> {
        Self::zeros(self.basis, self.rank)
    }

    /// Returns the bound determinant basis.
    pub fn basis(&self) -> &'a DeterminantBasis {
        self.basis
    }

    /// Returns the number of orbital indices labelling each slot.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the number of slots, $`n_{\mathrm{orb}}^k`$.
    pub fn n_slots(&self) -> usize {
        self.data.nrows()
    }

    /// Returns the number of determinants in each slot.
    pub fn n_det(&self) -> usize {
        self.data.ncols()
    }

    /// Returns the amplitudes of all slots, one row per slot.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Returns the amplitudes of all slots mutably.
    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Returns the flat buffer of all amplitudes in slot-major order.
    pub fn as_slice(&self) -> Option<&[f64]> {
        self.data.as_slice()
    }

    /// Returns the vector in slot `flat`.
    ///
    /// # Panics
    ///
    /// Panics if `flat` is out of range.
    pub fn slot(&self, flat: usize) -> ArrayView1<f64> {
        self.data.row(flat)
    }

    /// Returns the vector in slot `flat` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `flat` is out of range.
    pub fn slot_mut(&mut self, flat: usize) -> ArrayViewMut1<f64> {
        self.data.row_mut(flat)
    }

    /// Returns the vector labelled by a multi-index.
    pub fn slot_at<const R: usize>(
        &self,
        index: &MultiIndex<R>,
    ) -> Result<ArrayView1<f64>, anyhow::Error> {
        self.check_multi_index(index)?;
        Ok(self.slot(index.flatten(self.basis.norb())))
    }

    /// Returns the vector labelled by a multi-index mutably.
    pub fn slot_at_mut<const R: usize>(
        &mut self,
        index: &MultiIndex<R>,
    ) -> Result<ArrayViewMut1<f64>, anyhow::Error> {
        self.check_multi_index(index)?;
        let flat = index.flatten(self.basis.norb());
        Ok(self.slot_mut(flat))
    }

    /// Returns an owned copy of one slot as a CI vector.
    pub fn to_ci_vector(&self, flat: usize) -> Result<CiVector<'a>, anyhow::Error> {
        ensure!(
            flat < self.n_slots(),
            "Slot {flat} is out of range for a family of {} slots.",
            self.n_slots()
        );
        CiVector::new(self.basis, self.slot(flat).to_owned())
    }

    /// Reinterprets the flat buffer as a row-major matrix with `nrows` rows.
    ///
    /// # Errors
    ///
    /// Errors if `nrows` does not divide the number of elements.
    pub fn as_matrix(&self, nrows: usize) -> Result<ArrayView2<f64>, anyhow::Error> {
        let ncols = self.matrix_ncols(nrows)?;
        self.data
            .view()
            .into_shape((nrows, ncols))
            .map_err(|err| format_err!(err))
    }

    /// Reinterprets the flat buffer as a mutable row-major matrix with `nrows` rows.
    pub fn as_matrix_mut(&mut self, nrows: usize) -> Result<ArrayViewMut2<f64>, anyhow::Error> {
        let ncols = self.matrix_ncols(nrows)?;
        self.data
            .view_mut()
            .into_shape((nrows, ncols))
            .map_err(|err| format_err!(err))
    }

    /// Calculates $`\langle \mathrm{bra} | \mathrm{slot} \rangle`$ for every slot, giving the
    /// (transition) reduced density matrix associated with this family, flattened in slot order.
    pub fn project_onto(&self, bra: &CiVector) -> Result<Array1<f64>, anyhow::Error> {
        self.check_vector(bra)?;
        Ok(self.data.dot(bra.coefficients()))
    }

    /// Ensures that a CI vector is bound to the same basis as this family.
    pub fn check_vector(&self, v: &CiVector) -> Result<(), anyhow::Error> {
        ensure!(
            self.basis == v.basis(),
            "CI vector bound to {} but family bound to {}.",
            v.basis(),
            self.basis
        );
        Ok(())
    }

    /// Ensures that another family is bound to the same basis and has a given rank.
    pub fn check_family(&self, other: &CiVectorFamily, rank: usize) -> Result<(), anyhow::Error> {
        ensure!(
            self.basis == other.basis,
            "CI vector families bound to different determinant bases: {} != {}.",
            self.basis,
            other.basis
        );
        ensure!(
            other.rank == rank,
            "Expected a rank-{rank} family, but found one of rank {}.",
            other.rank
        );
        Ok(())
    }

    fn check_multi_index<const R: usize>(&self, index: &MultiIndex<R>) -> Result<(), anyhow::Error> {
        ensure!(
            R == self.rank,
            "A rank-{R} multi-index cannot label a slot in a rank-{} family.",
            self.rank
        );
        index.check(self.basis.norb())
    }

    fn matrix_ncols(&self, nrows: usize) -> Result<usize, anyhow::Error> {
        let n_elements = self.data.len();
        ensure!(
            nrows > 0 && n_elements % nrows == 0,
            "Cannot view {n_elements} elements as a matrix with {nrows} rows."
        );
        Ok(n_elements / nrows)
    }
}

impl<'a> fmt::Display for CiVectorFamily<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rank-{} CI vector family ({} slots × {} determinants)",
            self.rank,
            self.n_slots(),
            self.n_det()
        )
    }
}
