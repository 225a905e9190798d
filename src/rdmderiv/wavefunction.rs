//! CI wavefunctions from which RDM derivatives are built.

use anyhow::{self, ensure, format_err};
use derive_builder::Builder;
use ndarray::{Array2, ArrayView1};

use crate::civec::CiVector;
use crate::determinant::DeterminantBasis;
use crate::space::OrbitalSpace;

/// Trait defining the behaviours of a CI wavefunction that the RDM-derivative builders consume.
pub trait CiWavefunction {
    /// Returns the orbital space of the wavefunction.
    fn orbital_space(&self) -> OrbitalSpace;

    /// Returns the number of states (roots) in the wavefunction.
    fn n_states(&self) -> usize;

    /// Returns the CI amplitudes of one root, ordered as in the [`DeterminantBasis`] of
    /// [`Self::orbital_space`].
    fn ci_vector(&self, root: usize) -> Result<ArrayView1<f64>, anyhow::Error>;

    /// Fetches the amplitudes of one root and binds a copy of them to `basis`.
    ///
    /// # Errors
    ///
    /// Errors if the orbital space of the wavefunction differs from that of `basis`, or if the
    /// root does not exist.
    fn bind<'a>(
        &self,
        basis: &'a DeterminantBasis,
        root: usize,
    ) -> Result<CiVector<'a>, anyhow::Error> {
        ensure!(
            self.orbital_space() == *basis.space(),
            "Wavefunction orbital space {} does not match the determinant basis space {}.",
            self.orbital_space(),
            basis.space()
        );
        ensure!(
            root < self.n_states(),
            "Root {root} requested, but the wavefunction only has {} states.",
            self.n_states()
        );
        CiVector::new(basis, self.ci_vector(root)?.to_owned())
    }
}

/// A structure to hold the CI amplitudes of several states over one orbital space.
#[derive(Builder, Clone, Debug)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct CiExpansion {
    /// The orbital space of the expansion.
    space: OrbitalSpace,

    /// The amplitudes, one row per state, with determinants ordered as in
    /// [`DeterminantBasis`].
    coefficients: Array2<f64>,
}

impl CiExpansionBuilder {
    fn validate(&self) -> Result<(), String> {
        let space = self.space.ok_or("No orbital space found.".to_string())?;
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or("No CI coefficients found.".to_string())?;
        let n_det = space.n_det();
        if coefficients.ncols() != n_det {
            Err(format!(
                "The CI coefficient matrix has {} columns, but {space} spans {n_det} determinants.",
                coefficients.ncols()
            ))
        } else {
            Ok(())
        }
    }
}

impl CiExpansion {
    /// Returns a builder to construct a new [`CiExpansion`].
    pub fn builder() -> CiExpansionBuilder {
        CiExpansionBuilder::default()
    }

    /// Returns the amplitudes of all states.
    pub fn coefficients(&self) -> &Array2<f64> {
        &self.coefficients
    }
}

impl CiWavefunction for CiExpansion {
    fn orbital_space(&self) -> OrbitalSpace {
        self.space
    }

    fn n_states(&self) -> usize {
        self.coefficients.nrows()
    }

    fn ci_vector(&self, root: usize) -> Result<ArrayView1<f64>, anyhow::Error> {
        (root < self.n_states())
            .then(|| self.coefficients.row(root))
            .ok_or_else(|| {
                format_err!(
                    "Root {root} not found in a CI expansion of {} states.",
                    self.n_states()
                )
            })
    }
}
