//! # rdmderiv: Derivatives of Reduced Density Matrices with respect to CI Coefficients
//!
//! `rdmderiv` constructs, for a target configuration-interaction (CI) state
//! $`|0\rangle`$ expanded over a determinant basis, the families of CI vectors
//! - $`D^{(1)}_{ij} = \hat{E}_{ij} |0\rangle`$,
//! - $`D^{(2)}_{klij} = \hat{E}_{kl} \hat{E}_{ij} |0\rangle - \delta_{li} \hat{E}_{kj} |0\rangle`$,
//! - $`D^{(3)}_{klijmn}`$, the normal-ordered three-body analogue, and
//! - $`G_{klijop}`$, the contraction of the four-body analogue with a one-particle operator
//!   $`F`$,
//!
//! whose projections onto a determinant $`\langle I |`$ are the derivatives of the one-, two-,
//! three-particle and operator-weighted four-particle reduced density matrices with respect to the
//! CI coefficient $`c_I`$. These are the ingredients of CI response and CASPT2 gradient equations.
//!
//! The crate is organised as follows:
//! - [`space`]: orbital spaces and orbital multi-indices,
//! - [`determinant`]: occupation strings and determinant bases with excitation tables,
//! - [`civec`]: CI vectors and families of CI vectors,
//! - [`sigma`]: application of spin-summed excitation operators,
//! - [`rdmderiv`]: the recursive construction of the derivative families and the operator
//!   contraction,
//! - [`reference`]: an explicit determinant-by-determinant evaluator for validation, and
//! - [`drivers`]: a driver to construct derivatives for one or more roots of a wavefunction.
//!
//! ## Examples and usage
//!
//! For most items (structs, enums, functions, and traits), their usages are illustrated in test
//! functions.
//!
//! ## License
//!
//! GNU Lesser General Public License v3.0.

pub mod civec;
pub mod determinant;
pub mod drivers;
pub(crate) mod io;
pub mod rdmderiv;
pub mod reference;
pub mod sigma;
pub mod space;
