//! Drivers to carry out RDM-derivative constructions.

use anyhow;

pub mod rdm_derivative;

// =================
// Trait definitions
// =================

/// Trait defining behaviours of RDM-derivative drivers.
pub trait RdmDerivDriver {
    /// The type of the parameter structure controlling the driver.
    type Params;

    /// The type of the successful outcome when executing the driver.
    type Outcome;

    /// Executes the driver and stores the result internally.
    fn run(&mut self) -> Result<(), anyhow::Error>;

    /// Returns the result of the driver execution.
    fn result(&self) -> Result<&Self::Outcome, anyhow::Error>;
}
