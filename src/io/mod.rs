//! Input and output helpers.

pub(crate) mod format;
