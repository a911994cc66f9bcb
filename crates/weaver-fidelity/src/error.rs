use miette::Diagnostic;
use thiserror::Error;

/// Errors from applying a transaction to a document.
///
/// A failed transaction leaves the document untouched.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum FidelityError {
    #[error("step {index} touches {start}..{end}, past the document end ({len})")]
    #[diagnostic(
        code(fidelity::step_out_of_bounds),
        help("step positions are relative to the document after all previous steps")
    )]
    StepOutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("step {index} has an inverted range {start}..{end}")]
    #[diagnostic(code(fidelity::inverted_range))]
    InvertedRange {
        index: usize,
        start: usize,
        end: usize,
    },
}
