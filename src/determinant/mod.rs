//! Determinant bases built from spin-resolved occupation strings.

use std::fmt;

use anyhow::{self, ensure, format_err};
use itertools::Itertools;
use log;
use ndarray::Array2;

use crate::space::{binomial, OrbitalSpace};


// ==================
// Struct definitions
// ==================

/// One entry of the single-excitation connectivity table of a string space.
///
/// For a source string $`|s\rangle`$, the entry records that
/// $`\hat{a}^{\dagger}_i \hat{a}_j |s\rangle = \mathrm{sign} \, |t\rangle`$.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StringExcitation {
    /// The flat orbital-pair index $`i + n_{\mathrm{orb}} j`$.
    pub ij: usize,

    /// The address of the target string $`|t\rangle`$.
    pub target: usize,

    /// The phase factor, $`\pm 1`$.
    pub sign: f64,
}

/// A structure to manage all occupation strings of a fixed number of same-spin electrons in a
/// fixed number of orbitals.
///
/// Strings are `u64` bit masks in which bit $`p`$ is set iff orbital $`p`$ is occupied. They are
/// stored in increasing integer order, which is the colexicographic order of their occupied
/// orbitals, so that the address of a string with occupied orbitals
/// $`o_0 < o_1 < \ldots < o_{n-1}`$ is given by the combinatorial number system as
/// ```math
///     \sum_{k=0}^{n-1} \binom{o_k}{k+1}.
/// ```
#[derive(Clone, Debug)]
pub struct StringSpace {
    norb: usize,

    nele: usize,

    strings: Vec<u64>,

    /// Binomial coefficients $`\binom{p}{q}`$ indexed by $`(p, q)`$.
    binomials: Array2<usize>,

    /// Single-excitation lists indexed by source-string address.
    excitations: Vec<Vec<StringExcitation>>,
}

impl StringSpace {
    /// Enumerates all strings of `nele` electrons in `norb` orbitals together with their
    /// single-excitation connectivity.
    pub fn new(norb: usize, nele: usize) -> Result<Self, anyhow::Error> {
        ensure!(
            nele <= norb,
            "Cannot place {nele} electrons in {norb} orbitals."
        );
        let binomials = Array2::from_shape_fn((norb + 1, nele + 2), |(p, q)| {
            usize::try_from(binomial(p, q)).unwrap_or(usize::MAX)
        });
        let mut strings = (0..norb)
            .combinations(nele)
            .map(|occ| occ.iter().fold(0u64, |acc, &p| acc | (1u64 << p)))
            .collect_vec();
        strings.sort_unstable();

        let mut space = Self {
            norb,
            nele,
            strings,
            binomials,
            excitations: vec![],
        };
        space.excitations = space
            .strings
            .iter()
            .map(|&source| space.calc_excitations(source))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(space)
    }

    fn calc_excitations(&self, source: u64) -> Result<Vec<StringExcitation>, anyhow::Error> {
        let norb = self.norb;
        let mut excitations = Vec::with_capacity(self.nele * (norb - self.nele + 1));
        for j in occupied_orbitals(source) {
            let removed = source & !(1u64 << j);
            let sign_j = parity(source, j);
            for i in (0..norb).filter(|&i| i == j || removed & (1u64 << i) == 0) {
                let target = removed | (1u64 << i);
                let target_address = self.address(target).ok_or_else(|| {
                    format_err!("Target string {target:#b} not found in the string space.")
                })?;
                excitations.push(StringExcitation {
                    ij: i + norb * j,
                    target: target_address,
                    sign: sign_j * parity(removed, i),
                });
            }
        }
        Ok(excitations)
    }

    /// Returns the number of orbitals.
    pub fn norb(&self) -> usize {
        self.norb
    }

    /// Returns the number of electrons in each string.
    pub fn nele(&self) -> usize {
        self.nele
    }

    /// Returns the number of strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns `true` if there are no strings. This never happens for a validated space, since
    /// even zero electrons give one empty string.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Returns all strings in address order.
    pub fn strings(&self) -> &[u64] {
        &self.strings
    }

    /// Returns the string at a given address.
    pub fn string(&self, address: usize) -> Option<u64> {
        self.strings.get(address).copied()
    }

    /// Returns the address of a string, or `None` if the string does not belong to this space.
    pub fn address(&self, string: u64) -> Option<usize> {
        if string.count_ones() as usize != self.nele
            || (self.norb < 64 && string >> self.norb != 0)
        {
            return None;
        }
        Some(
            occupied_orbitals(string)
                .enumerate()
                .map(|(k, p)| self.binomials[(p, k + 1)])
                .sum(),
        )
    }

    /// Returns the single-excitation list of the string at address `source`.
    pub fn excitations(&self, source: usize) -> &[StringExcitation] {
        &self.excitations[source]
    }
}

/// A structure to manage the determinant basis of a fixed orbital space.
///
/// Determinant $`(I_\alpha, I_\beta)`$ is a product of an $`\alpha`$-string and a
/// $`\beta`$-string, with all $`\alpha`$ creation operators to the left of all $`\beta`$ creation
/// operators. Its linear index is $`I_\alpha n_\beta + I_\beta`$ where $`n_\beta`$ is the number
/// of $`\beta`$-strings. The basis is immutable after construction and may be shared freely
/// between threads.
#[derive(Clone, Debug)]
pub struct DeterminantBasis {
    space: OrbitalSpace,

    alpha: StringSpace,

    beta: StringSpace,
}

impl DeterminantBasis {
    /// Builds the determinant basis for an orbital space.
    pub fn new(space: OrbitalSpace) -> Result<Self, anyhow::Error> {
        let space = OrbitalSpace::new(space.norb(), space.n_alpha(), space.n_beta())?;
        let alpha = StringSpace::new(space.norb(), space.n_alpha())?;
        let beta = StringSpace::new(space.norb(), space.n_beta())?;
        log::debug!(
            "Determinant basis for {space}: {} α-strings × {} β-strings = {} determinants.",
            alpha.len(),
            beta.len(),
            alpha.len() * beta.len()
        );
        Ok(Self { space, alpha, beta })
    }

    /// Returns the orbital space of this basis.
    pub fn space(&self) -> &OrbitalSpace {
        &self.space
    }

    /// Returns the number of orbitals.
    pub fn norb(&self) -> usize {
        self.space.norb()
    }

    /// Returns the $`\alpha`$-string space.
    pub fn alpha(&self) -> &StringSpace {
        &self.alpha
    }

    /// Returns the $`\beta`$-string space.
    pub fn beta(&self) -> &StringSpace {
        &self.beta
    }

    /// Returns the number of $`\alpha`$-strings.
    pub fn lena(&self) -> usize {
        self.alpha.len()
    }

    /// Returns the number of $`\beta`$-strings.
    pub fn lenb(&self) -> usize {
        self.beta.len()
    }

    /// Returns the number of determinants.
    pub fn n_det(&self) -> usize {
        self.lena() * self.lenb()
    }

    /// Returns the linear index of the determinant made of the strings at the given addresses.
    pub fn det_index(&self, ia: usize, ib: usize) -> usize {
        ia * self.lenb() + ib
    }

    /// Returns the $`(\alpha, \beta)`$ string pair of a determinant.
    pub fn determinant(&self, index: usize) -> Option<(u64, u64)> {
        if index >= self.n_det() {
            return None;
        }
        let ia = index / self.lenb();
        let ib = index % self.lenb();
        Some((self.alpha.strings[ia], self.beta.strings[ib]))
    }

    /// Returns the linear index of a determinant given its strings.
    pub fn index_of(&self, alpha: u64, beta: u64) -> Option<usize> {
        Some(self.det_index(self.alpha.address(alpha)?, self.beta.address(beta)?))
    }
}

impl PartialEq for DeterminantBasis {
    fn eq(&self, other: &Self) -> bool {
        self.space == other.space
    }
}

impl Eq for DeterminantBasis {}

impl fmt::Display for DeterminantBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeterminantBasis{} with {} determinants",
            self.space,
            self.n_det()
        )
    }
}

// =========
// Functions
// =========

/// Iterates over the occupied orbitals of a string in increasing order.
pub fn occupied_orbitals(string: u64) -> impl Iterator<Item = usize> {
    (0..64usize).filter(move |&p| string & (1u64 << p) != 0)
}

/// Returns $`(-1)^{m}`$ where $`m`$ is the number of occupied orbitals below orbital `p`.
pub fn parity(string: u64, p: usize) -> f64 {
    let below = string & ((1u64 << p) - 1);
    if below.count_ones() % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}
