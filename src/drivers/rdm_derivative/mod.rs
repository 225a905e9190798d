//! Driver for the construction of RDM derivatives for one or more CI roots.

use std::fmt;

use anyhow::{self, format_err};
use derive_builder::Builder;
use itertools::Itertools;
use log;
use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::civec::CiVectorFamily;
use crate::determinant::DeterminantBasis;
use crate::drivers::RdmDerivDriver;
use crate::io::format::{
    log_stage, log_title, rdmderiv_output, write_subtitle, write_title, RdmDerivOutput,
};
use crate::rdmderiv::contraction::check_operator;
use crate::rdmderiv::wavefunction::CiWavefunction;
use crate::rdmderiv::{build_rdm1_deriv, extend_rdm2_deriv, extend_rdm3_deriv, extend_rdm4f_deriv};
use crate::space::PairIndex;


// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

/// An enumerated type for the highest RDM-derivative order to construct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RdmDerivativeOrder {
    /// Variant for the first RDM derivative only.
    First,

    /// Variant for the first and second RDM derivatives.
    #[default]
    Second,

    /// Variant for all derivatives up to the third, together with the operator-weighted fourth
    /// RDM derivative. This requires a one-particle operator.
    ThirdAndFourth,
}

impl fmt::Display for RdmDerivativeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdmDerivativeOrder::First => write!(f, "first"),
            RdmDerivativeOrder::Second => write!(f, "second"),
            RdmDerivativeOrder::ThirdAndFourth => write!(f, "third and operator-weighted fourth"),
        }
    }
}

/// A structure containing control parameters for RDM-derivative construction.
#[derive(Clone, Builder, Debug, PartialEq, Serialize, Deserialize)]
pub struct RdmDerivativeParams {
    /// The index of the target root.
    #[builder(default = "0")]
    #[serde(default)]
    pub target_root: usize,

    /// The highest derivative order to construct.
    #[builder(default)]
    #[serde(default)]
    pub max_order: RdmDerivativeOrder,

    /// Further roots for which the same derivatives are constructed alongside
    /// [`Self::target_root`]. Duplicates are ignored.
    #[builder(default = "None")]
    #[serde(default)]
    pub roots: Option<Vec<usize>>,
}

impl RdmDerivativeParams {
    /// Returns a builder to construct a [`RdmDerivativeParams`] structure.
    pub fn builder() -> RdmDerivativeParamsBuilder {
        RdmDerivativeParamsBuilder::default()
    }

    /// Returns the roots to be evaluated, starting with the target root, without duplicates.
    pub fn requested_roots(&self) -> Vec<usize> {
        std::iter::once(self.target_root)
            .chain(self.roots.iter().flatten().copied())
            .unique()
            .collect_vec()
    }
}

impl Default for RdmDerivativeParams {
    fn default() -> Self {
        Self {
            target_root: 0,
            max_order: RdmDerivativeOrder::default(),
            roots: None,
        }
    }
}

impl fmt::Display for RdmDerivativeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Target root: {}", self.target_root)?;
        writeln!(f, "Highest derivative order: {}", self.max_order)?;
        if let Some(roots) = self.roots.as_ref() {
            writeln!(
                f,
                "Additional roots: {}",
                roots.iter().map(|root| root.to_string()).join(", ")
            )?;
        }
        writeln!(f)?;
        Ok(())
    }
}

// ------
// Result
// ------

/// A structure to hold the RDM-derivative families of one root.
#[derive(Clone, Debug)]
pub struct RdmDerivatives<'a> {
    /// The root from which the families were built.
    root: usize,

    /// The trace $`\sum_i \langle \mathrm{root} | \hat{E}_{ii} | \mathrm{root} \rangle`$, which
    /// equals the electron count for a normalised root.
    rdm1_trace: f64,

    /// The rank-2 family $`D^{(1)}`$.
    rdm1: CiVectorFamily<'a>,

    /// The rank-4 family $`D^{(2)}`$.
    rdm2: Option<CiVectorFamily<'a>>,

    /// The rank-6 family $`D^{(3)}`$.
    rdm3: Option<CiVectorFamily<'a>>,

    /// The rank-6 operator-weighted family $`G`$.
    rdm4f: Option<CiVectorFamily<'a>>,
}

impl<'a> RdmDerivatives<'a> {
    /// Returns the root from which the families were built.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Returns the trace of the one-particle RDM of the root.
    pub fn rdm1_trace(&self) -> f64 {
        self.rdm1_trace
    }

    /// Returns the first RDM derivative.
    pub fn rdm1(&self) -> &CiVectorFamily<'a> {
        &self.rdm1
    }

    /// Returns the second RDM derivative, if constructed.
    pub fn rdm2(&self) -> Option<&CiVectorFamily<'a>> {
        self.rdm2.as_ref()
    }

    /// Returns the third RDM derivative, if constructed.
    pub fn rdm3(&self) -> Option<&CiVectorFamily<'a>> {
        self.rdm3.as_ref()
    }

    /// Returns the operator-weighted fourth RDM derivative, if constructed.
    pub fn rdm4f(&self) -> Option<&CiVectorFamily<'a>> {
        self.rdm4f.as_ref()
    }
}

impl<'a> fmt::Display for RdmDerivatives<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Root {}:", self.root)?;
        writeln!(f, "  Trace of 1-RDM: {:.8}", self.rdm1_trace)?;
        writeln!(f, "  D1: {}", self.rdm1)?;
        if let Some(rdm2) = self.rdm2.as_ref() {
            writeln!(f, "  D2: {rdm2}")?;
        }
        if let Some(rdm3) = self.rdm3.as_ref() {
            writeln!(f, "  D3: {rdm3}")?;
        }
        if let Some(rdm4f) = self.rdm4f.as_ref() {
            writeln!(f, "  G : {rdm4f}")?;
        }
        Ok(())
    }
}

/// A structure to contain RDM-derivative construction results.
#[derive(Clone, Builder, Debug)]
#[builder(pattern = "owned")]
pub struct RdmDerivativeResult<'a> {
    /// The control parameters used to obtain this set of results.
    parameters: &'a RdmDerivativeParams,

    /// The derivative families, one entry per requested root in the order given by
    /// [`RdmDerivativeParams::requested_roots`].
    derivatives: Vec<RdmDerivatives<'a>>,
}

impl<'a> RdmDerivativeResult<'a> {
    fn builder() -> RdmDerivativeResultBuilder<'a> {
        RdmDerivativeResultBuilder::default()
    }

    /// Returns the control parameters used.
    pub fn parameters(&self) -> &RdmDerivativeParams {
        self.parameters
    }

    /// Returns the derivative families of all requested roots.
    pub fn derivatives(&self) -> &[RdmDerivatives<'a>] {
        &self.derivatives
    }

    /// Returns the derivative families of the target root.
    pub fn target(&self) -> Result<&RdmDerivatives<'a>, anyhow::Error> {
        self.root(self.parameters.target_root)
    }

    /// Returns the derivative families of a given root.
    pub fn root(&self, root: usize) -> Result<&RdmDerivatives<'a>, anyhow::Error> {
        self.derivatives
            .iter()
            .find(|derivs| derivs.root == root)
            .ok_or_else(|| format_err!("No RDM derivatives found for root {root}."))
    }
}

impl<'a> fmt::Display for RdmDerivativeResult<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_subtitle(f, "RDM derivative summary")?;
        for derivs in self.derivatives.iter() {
            write!(f, "{derivs}")?;
        }
        Ok(())
    }
}

// ------
// Driver
// ------

/// A driver for the construction of RDM derivatives.
#[derive(Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct RdmDerivativeDriver<'a, W>
where
    W: CiWavefunction + Clone + Sync,
{
    /// The control parameters for RDM-derivative construction.
    parameters: &'a RdmDerivativeParams,

    /// The CI wavefunction providing the roots.
    wavefunction: &'a W,

    /// The determinant basis over which all families are built.
    basis: &'a DeterminantBasis,

    /// The one-particle operator $`F`$ for the operator-weighted fourth RDM derivative.
    #[builder(default = "None")]
    operator: Option<ArrayView2<'a, f64>>,

    #[builder(setter(skip), default = "None")]
    result: Option<RdmDerivativeResult<'a>>,
}

impl<'a, W> RdmDerivativeDriverBuilder<'a, W>
where
    W: CiWavefunction + Clone + Sync,
{
    fn validate(&self) -> Result<(), String> {
        let params = self
            .parameters
            .ok_or("No RDM-derivative parameters found.".to_string())?;
        let wfn = self
            .wavefunction
            .ok_or("No CI wavefunction found.".to_string())?;
        let basis = self
            .basis
            .ok_or("No determinant basis found.".to_string())?;
        let operator = self.operator.as_ref().cloned().flatten();

        let n_states = wfn.n_states();
        let norb = basis.norb();
        if wfn.orbital_space() != *basis.space() {
            Err(format!(
                "The wavefunction orbital space {} does not match the basis space {}.",
                wfn.orbital_space(),
                basis.space()
            ))
        } else if let Some(root) = params
            .requested_roots()
            .into_iter()
            .find(|&root| root >= n_states)
        {
            Err(format!(
                "Root {root} requested, but the wavefunction only has {n_states} states."
            ))
        } else if params.max_order == RdmDerivativeOrder::ThirdAndFourth && operator.is_none() {
            Err("The operator-weighted fourth RDM derivative requires an operator.".to_string())
        } else if let Some(op) = operator.filter(|op| op.dim() != (norb, norb)) {
            Err(format!(
                "The operator has shape {:?}, but {norb} orbitals require ({norb}, {norb}).",
                op.dim()
            ))
        } else {
            Ok(())
        }
    }
}

impl<'a, W> RdmDerivativeDriver<'a, W>
where
    W: CiWavefunction + Clone + Sync,
{
    /// Returns a builder to construct a [`RdmDerivativeDriver`] structure.
    pub fn builder() -> RdmDerivativeDriverBuilder<'a, W> {
        RdmDerivativeDriverBuilder::default()
    }

    fn construct_derivatives(&mut self) -> Result<(), anyhow::Error> {
        log_title("RDM Derivative Construction");
        rdmderiv_output!("");
        let params = self.parameters;
        params.log_output_display();
        rdmderiv_output!("Determinant basis: {}", self.basis);
        rdmderiv_output!("");

        let roots = params.requested_roots();
        let derivatives = log_stage("Derivative construction", || {
            rdm_derivatives_for_roots(
                self.basis,
                self.wavefunction,
                &roots,
                params.max_order,
                self.operator.as_ref(),
            )
        })?;
        rdmderiv_output!("");

        let result = RdmDerivativeResult::builder()
            .parameters(params)
            .derivatives(derivatives)
            .build()?;
        result.log_output_display();
        self.result = Some(result);
        Ok(())
    }
}

impl<'a, W> fmt::Display for RdmDerivativeDriver<'a, W>
where
    W: CiWavefunction + Clone + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_title(f, "RDM Derivative Construction")?;
        writeln!(f)?;
        write!(f, "{}", self.parameters)?;
        writeln!(f, "Determinant basis: {}", self.basis)?;
        Ok(())
    }
}

impl<'a, W> RdmDerivDriver for RdmDerivativeDriver<'a, W>
where
    W: CiWavefunction + Clone + Sync,
{
    type Params = RdmDerivativeParams;

    type Outcome = RdmDerivativeResult<'a>;

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No RDM-derivative results found."))
    }

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.construct_derivatives()
    }
}

// =========
// Functions
// =========

/// Constructs the RDM derivatives of one root up to a given order.
///
/// # Errors
///
/// Errors if the root cannot be bound to `basis`, or if the operator is missing or of the wrong
/// shape when the operator-weighted fourth derivative is requested.
pub fn rdm_derivatives_for_root<'a, W>(
    basis: &'a DeterminantBasis,
    wfn: &W,
    root: usize,
    max_order: RdmDerivativeOrder,
    operator: Option<&ArrayView2<f64>>,
) -> Result<RdmDerivatives<'a>, anyhow::Error>
where
    W: CiWavefunction + ?Sized,
{
    let fock = match max_order {
        RdmDerivativeOrder::ThirdAndFourth => {
            let fock = operator.ok_or_else(|| {
                format_err!("The operator-weighted fourth RDM derivative requires an operator.")
            })?;
            check_operator(basis, fock)?;
            Some(fock)
        }
        _ => None,
    };

    let cbra = wfn.bind(basis, root)?;
    let rdm1 = build_rdm1_deriv(&cbra)?;
    let rdm1_proj = rdm1.project_onto(&cbra)?;
    let rdm1_trace = PairIndex::iter_all(basis.norb())
        .filter(|ij| ij[0] == ij[1])
        .map(|ii| rdm1_proj[ii.flatten(basis.norb())])
        .sum::<f64>();

    let rdm2 = if max_order >= RdmDerivativeOrder::Second {
        Some(extend_rdm2_deriv(&rdm1)?)
    } else {
        None
    };
    let (rdm3, rdm4f) = match (fock, rdm2.as_ref()) {
        (Some(fock), Some(rdm2)) => {
            let rdm3 = extend_rdm3_deriv(rdm2)?;
            let rdm4f = extend_rdm4f_deriv(&rdm3, fock)?;
            (Some(rdm3), Some(rdm4f))
        }
        _ => (None, None),
    };
    log::debug!("RDM derivatives for root {root} up to the {max_order} order constructed.");

    Ok(RdmDerivatives {
        root,
        rdm1_trace,
        rdm1,
        rdm2,
        rdm3,
        rdm4f,
    })
}

/// Constructs the RDM derivatives of several roots concurrently over one shared determinant
/// basis.
///
/// # Returns
///
/// The derivatives of each root, in the order of `roots`.
///
/// # Errors
///
/// Errors if the construction for any root fails.
pub fn rdm_derivatives_for_roots<'a, W>(
    basis: &'a DeterminantBasis,
    wfn: &W,
    roots: &[usize],
    max_order: RdmDerivativeOrder,
    operator: Option<&ArrayView2<f64>>,
) -> Result<Vec<RdmDerivatives<'a>>, anyhow::Error>
where
    W: CiWavefunction + Sync + ?Sized,
{
    roots
        .par_iter()
        .map(|&root| rdm_derivatives_for_root(basis, wfn, root, max_order, operator))
        .collect::<Result<Vec<_>, _>>()
}
