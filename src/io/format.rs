//! Formatting of human-readable output.

use std::fmt;
use std::time::Instant;

use log;

#[cfg(test)]
#[path = "format_tests.rs"]
mod format_tests;

const BANNER_WIDTH: usize = 83;

/// Logs a main output line to the `rdmderiv-output` logger.
macro_rules! rdmderiv_output {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::info!(target: "rdmderiv-output", $fmt, $($($arg)*)?) }
}

pub(crate) use rdmderiv_output;

/// Returns the three lines of a boxed title.
fn title_banner(title: &str) -> [String; 3] {
    let width = title.chars().count().max(BANNER_WIDTH);
    let bar = "─".repeat(width);
    [
        format!("┌──{bar}──┐"),
        format!("│§ {title:^width$} §│"),
        format!("└──{bar}──┘"),
    ]
}

/// Writes a boxed section title.
pub(crate) fn write_title(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    title_banner(title)
        .iter()
        .try_for_each(|line| writeln!(f, "{line}"))
}

/// Logs a boxed section title to the `rdmderiv-output` logger.
pub(crate) fn log_title(title: &str) {
    title_banner(title)
        .iter()
        .for_each(|line| rdmderiv_output!("{line}"));
}

/// Writes a subtitle underlined to its own width.
pub(crate) fn write_subtitle(f: &mut fmt::Formatter<'_>, subtitle: &str) -> fmt::Result {
    writeln!(f, "{subtitle}")?;
    writeln!(f, "{}", "═".repeat(subtitle.chars().count()))
}

/// Runs one construction stage between begin and end markers on the `rdmderiv-output` logger,
/// reporting its wall time.
pub(crate) fn log_stage<T>(stage: &str, run: impl FnOnce() -> T) -> T {
    rdmderiv_output!("‹‹‹‹‹ [Begin] {stage}");
    let start = Instant::now();
    let outcome = run();
    rdmderiv_output!(
        "››››› [ End ] {stage} ({:.3} s)",
        start.elapsed().as_secs_f64()
    );
    outcome
}

/// Line-by-line logging of displayable outputs.
pub(crate) trait RdmDerivOutput: fmt::Display {
    /// Logs each line of the display output to the `rdmderiv-output` logger.
    fn log_output_display(&self) {
        self.to_string()
            .lines()
            .for_each(|line| rdmderiv_output!("{line}"));
    }
}

impl<T> RdmDerivOutput for T where T: fmt::Display {}
