//! Orbital spaces and multi-indices over orbitals.

use std::fmt;

use anyhow::{self, ensure, format_err};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};


/// The largest number of orbitals that can be handled, since occupation strings are stored as
/// `u64` bit masks.
pub const MAX_NORB: usize = 64;

// ==================
// Struct definitions
// ==================

/// A structure describing the orbital space in which a CI wavefunction lives.
#[derive(Builder, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
#[serde(try_from = "RawOrbitalSpace")]
pub struct OrbitalSpace {
    /// The number of active orbitals.
    norb: usize,

    /// The number of spin-$`\alpha`$ electrons.
    n_alpha: usize,

    /// The number of spin-$`\beta`$ electrons.
    n_beta: usize,
}

/// Unvalidated orbital-space fields as read from a configuration file.
#[derive(Deserialize)]
struct RawOrbitalSpace {
    norb: usize,
    n_alpha: usize,
    n_beta: usize,
}

impl TryFrom<RawOrbitalSpace> for OrbitalSpace {
    type Error = anyhow::Error;

    fn try_from(raw: RawOrbitalSpace) -> Result<Self, Self::Error> {
        Self::new(raw.norb, raw.n_alpha, raw.n_beta)
    }
}

impl OrbitalSpaceBuilder {
    fn validate(&self) -> Result<(), String> {
        let norb = self.norb.ok_or("No orbital count found.".to_string())?;
        let n_alpha = self.n_alpha.ok_or("No α-electron count found.".to_string())?;
        let n_beta = self.n_beta.ok_or("No β-electron count found.".to_string())?;
        if norb == 0 {
            Err("The orbital space must contain at least one orbital.".to_string())
        } else if norb > MAX_NORB {
            Err(format!(
                "At most {MAX_NORB} orbitals are supported, but {norb} were requested."
            ))
        } else if n_alpha > norb || n_beta > norb {
            Err(format!(
                "Electron counts (α: {n_alpha}, β: {n_beta}) exceed the number of orbitals ({norb})."
            ))
        } else {
            Ok(())
        }
    }
}

impl OrbitalSpace {
    /// Returns a builder to construct a new [`OrbitalSpace`].
    pub fn builder() -> OrbitalSpaceBuilder {
        OrbitalSpaceBuilder::default()
    }

    /// Constructs a validated orbital space directly.
    pub fn new(norb: usize, n_alpha: usize, n_beta: usize) -> Result<Self, anyhow::Error> {
        Ok(Self::builder()
            .norb(norb)
            .n_alpha(n_alpha)
            .n_beta(n_beta)
            .build()?)
    }

    /// Returns the number of orbitals.
    pub fn norb(&self) -> usize {
        self.norb
    }

    /// Returns the number of spin-$`\alpha`$ electrons.
    pub fn n_alpha(&self) -> usize {
        self.n_alpha
    }

    /// Returns the number of spin-$`\beta`$ electrons.
    pub fn n_beta(&self) -> usize {
        self.n_beta
    }

    /// Returns the total number of electrons.
    pub fn n_electrons(&self) -> usize {
        self.n_alpha + self.n_beta
    }

    /// Returns the number of determinants spanned by this space,
    /// $`\binom{n_{\mathrm{orb}}}{n_\alpha} \binom{n_{\mathrm{orb}}}{n_\beta}`$, saturating at
    /// `usize::MAX`.
    pub fn n_det(&self) -> usize {
        let lena = binomial(self.norb, self.n_alpha);
        let lenb = binomial(self.norb, self.n_beta);
        usize::try_from(lena.saturating_mul(lenb)).unwrap_or(usize::MAX)
    }

    /// Returns $`n_{\mathrm{orb}}^{k}`$, the number of slots in a rank-$`k`$ family over this
    /// space.
    ///
    /// # Errors
    ///
    /// Errors if the power overflows `usize`.
    pub fn n_slots(&self, rank: usize) -> Result<usize, anyhow::Error> {
        let rank_u32 = u32::try_from(rank)
            .map_err(|_| format_err!("Rank `{rank}` cannot be converted to `u32`."))?;
        self.norb.checked_pow(rank_u32).ok_or_else(|| {
            format_err!(
                "The number of slots norb^{rank} with norb = {} overflows `usize`.",
                self.norb
            )
        })
    }
}

impl fmt::Display for OrbitalSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} orbitals, {}α + {}β electrons)",
            self.norb, self.n_alpha, self.n_beta
        )
    }
}

/// Returns $`\binom{p}{q}`$, saturating at `u128::MAX`.
pub(crate) fn binomial(p: usize, q: usize) -> u128 {
    if q > p {
        0
    } else {
        (0..q.min(p - q))
            .try_fold(1u128, |acc, r| {
                acc.checked_mul((p - r) as u128)
                    .map(|num| num / (r + 1) as u128)
            })
            .unwrap_or(u128::MAX)
    }
}

// -------------
// Multi-indices
// -------------

/// A fixed-size tuple of orbital indices labelling one slot of a CI vector family.
///
/// The flat index of $`(i_0, i_1, \ldots, i_{R-1})`$ is
/// ```math
///     i_0 + n_{\mathrm{orb}} (i_1 + n_{\mathrm{orb}} (i_2 + \ldots)),
/// ```
/// *i.e.* the first index is the least significant one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MultiIndex<const R: usize>(pub [usize; R]);

impl<const R: usize> MultiIndex<R> {
    /// Constructs a multi-index from its components.
    pub fn new(indices: [usize; R]) -> Self {
        Self(indices)
    }

    /// Flattens the multi-index with stride `norb`.
    pub fn flatten(&self, norb: usize) -> usize {
        self.0.iter().rev().fold(0, |acc, &i| acc * norb + i)
    }

    /// Recovers a multi-index from its flat index with stride `norb`.
    pub fn unflatten(flat: usize, norb: usize) -> Self {
        let mut indices = [0; R];
        let mut rest = flat;
        for index in indices.iter_mut() {
            *index = rest % norb;
            rest /= norb;
        }
        Self(indices)
    }

    /// Checks that every index lies in `[0, norb)`.
    pub fn check(&self, norb: usize) -> Result<(), anyhow::Error> {
        ensure!(
            self.0.iter().all(|&i| i < norb),
            "Multi-index {:?} is out of range for {norb} orbitals.",
            self.0
        );
        Ok(())
    }

    /// Iterates over all multi-indices with stride `norb` in increasing flat order.
    pub fn iter_all(norb: usize) -> impl Iterator<Item = Self> {
        let n = norb.pow(R as u32);
        (0..n).map(move |flat| Self::unflatten(flat, norb))
    }
}

impl<const R: usize> std::ops::Index<usize> for MultiIndex<R> {
    type Output = usize;

    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

/// Index of a pair of orbitals $`(i, j)`$.
pub type PairIndex = MultiIndex<2>;

/// Index of two pairs of orbitals $`(k, l, i, j)`$.
pub type QuadIndex = MultiIndex<4>;

/// Index of three pairs of orbitals.
pub type HexIndex = MultiIndex<6>;
